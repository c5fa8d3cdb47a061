use crate::ir::{PersistedPositions, Position};
use crate::layout::Layout;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutDump {
    pub width: f32,
    pub height: f32,
    pub used_persisted_positions: bool,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
    pub lanes: Vec<LaneDump>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDump {
    pub index: u32,
    pub occupied: bool,
    pub connection: Option<u64>,
    pub port_type: Option<String>,
    pub speed: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDump {
    pub id: u64,
    pub name: String,
    pub device_type: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
    pub connection_count: usize,
    pub lane: Option<usize>,
    pub ports: Vec<PortDump>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeDump {
    pub from: u64,
    pub to: u64,
    pub kind: String,
    pub ha: bool,
    pub connections: Vec<u64>,
    pub multiplicity: usize,
    pub port_pairs: Vec<String>,
    pub label: String,
    pub source_anchor: String,
    pub target_anchor: String,
    pub points: Vec<[f32; 2]>,
    pub pair_index: usize,
    pub color: String,
    pub width: f32,
    pub dasharray: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LaneDump {
    pub index: usize,
    pub label: String,
    pub x: f32,
    pub devices: Vec<u64>,
}

impl LayoutDump {
    pub fn from_layout(layout: &Layout) -> Self {
        let nodes = layout
            .nodes
            .values()
            .map(|node| NodeDump {
                id: node.id.0,
                name: node.name.clone(),
                device_type: node.device_type.tag().to_string(),
                x: node.x,
                y: node.y,
                width: node.width,
                height: node.height,
                color: node.color.clone(),
                connection_count: node.connection_count,
                lane: node.lane,
                ports: node
                    .ports
                    .iter()
                    .map(|port| PortDump {
                        index: port.index,
                        occupied: port.occupied,
                        connection: port.connection.map(|c| c.0),
                        port_type: port.port_type.clone(),
                        speed: port.speed.clone(),
                        label: port.label.clone(),
                    })
                    .collect(),
            })
            .collect();

        let edges = layout
            .edges
            .iter()
            .map(|edge| EdgeDump {
                from: edge.from.0,
                to: edge.to.0,
                kind: edge.kind.as_str().to_string(),
                ha: edge.ha,
                connections: edge.connections.iter().map(|c| c.0).collect(),
                multiplicity: edge.multiplicity,
                port_pairs: edge.port_pairs.iter().map(ToString::to_string).collect(),
                label: edge.label.clone(),
                source_anchor: edge.anchors.source.as_str().to_string(),
                target_anchor: edge.anchors.target.as_str().to_string(),
                points: edge.points.iter().map(|(x, y)| [*x, *y]).collect(),
                pair_index: edge.pair_index,
                color: edge.style.color.clone(),
                width: edge.style.width,
                dasharray: edge.style.dasharray.clone(),
            })
            .collect();

        let lanes = layout
            .lanes
            .iter()
            .enumerate()
            .map(|(idx, lane)| LaneDump {
                index: idx,
                label: lane.key.label().to_string(),
                x: lane.x,
                devices: lane.devices.iter().map(|d| d.0).collect(),
            })
            .collect();

        LayoutDump {
            width: layout.width,
            height: layout.height,
            used_persisted_positions: layout.used_persisted_positions,
            nodes,
            edges,
            lanes,
            diagnostics: layout.diagnostics.iter().map(ToString::to_string).collect(),
        }
    }
}

pub fn layout_json(layout: &Layout) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&LayoutDump::from_layout(layout))?)
}

pub fn write_layout_dump(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let writer = BufWriter::new(file);
    let dump = LayoutDump::from_layout(layout);
    serde_json::to_writer_pretty(writer, &dump)?;
    Ok(())
}

/// Current node positions in the format read back by
/// [`crate::ir::load_positions`].
pub fn positions_of(layout: &Layout) -> PersistedPositions {
    layout
        .nodes
        .values()
        .map(|node| (node.id, node.position()))
        .collect()
}

pub fn write_positions(path: &Path, layout: &Layout) -> anyhow::Result<()> {
    let keyed: BTreeMap<String, Position> = positions_of(layout)
        .into_iter()
        .map(|(id, position)| (id.to_string(), position))
        .collect();
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &keyed)?;
    Ok(())
}
