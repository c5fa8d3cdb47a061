pub mod edges;
pub mod filter;
pub mod lanes;
pub mod ports;
pub mod routing;
pub(crate) mod types;
pub use types::*;

use crate::config::LayoutConfig;
use crate::ir::{
    Connection, ConnectionId, Device, DeviceId, DeviceType, Filters, PersistedPositions, Snapshot,
};
use crate::theme::{Theme, device_color};
use std::collections::{BTreeMap, BTreeSet};

pub(crate) fn report(diagnostics: &mut Vec<Diagnostic>, diagnostic: Diagnostic) {
    tracing::warn!("{diagnostic}");
    diagnostics.push(diagnostic);
}

/// Runs one full layout pass over `snapshot`.
///
/// Inconsistent data never fails the pass: the offending device, port or
/// connection is left out and a [`Diagnostic`] is recorded instead.
pub fn compute_layout(
    snapshot: &Snapshot,
    filters: &Filters,
    persisted: &PersistedPositions,
    theme: &Theme,
    config: &LayoutConfig,
) -> Layout {
    let mut diagnostics = Vec::new();

    let device_index = index_devices(&snapshot.devices, &mut diagnostics);
    let (resolved, rejected) =
        resolve_connections(&snapshot.connections, &device_index, &mut diagnostics);

    let visible: Vec<&Device> = snapshot
        .devices
        .iter()
        .filter(|d| {
            device_index
                .get(&d.id)
                .is_some_and(|first| std::ptr::eq(*first, *d))
        })
        .filter(|d| filter::device_matches(d, filters))
        .collect();
    let visible_ids: BTreeSet<DeviceId> = visible.iter().map(|d| d.id).collect();

    let shown: Vec<&Connection> = resolved
        .iter()
        .copied()
        .filter(|c| visible_ids.contains(&c.source_device) && visible_ids.contains(&c.target_device))
        .collect();

    let counts = connection_counts(&shown);
    let placement = lanes::assign_positions(&visible, &counts, persisted, config);

    // Occupancy sees every cable, including ones dropped from the drawing.
    let mut by_device: BTreeMap<DeviceId, Vec<&Connection>> = BTreeMap::new();
    for conn in &snapshot.connections {
        if device_index.contains_key(&conn.source_device) {
            by_device.entry(conn.source_device).or_default().push(conn);
        }
        if conn.target_device != conn.source_device
            && device_index.contains_key(&conn.target_device)
        {
            by_device.entry(conn.target_device).or_default().push(conn);
        }
    }

    let mut nodes = BTreeMap::new();
    for device in &visible {
        let Some(position) = placement.positions.get(&device.id) else {
            continue;
        };
        let attached = by_device.get(&device.id).map(Vec::as_slice).unwrap_or(&[]);
        let ports =
            ports::derive_port_states(device, attached.iter().copied(), &rejected, &mut diagnostics);
        nodes.insert(
            device.id,
            NodeLayout {
                id: device.id,
                name: device.name.clone(),
                device_type: device.device_type.clone(),
                x: position.x,
                y: position.y,
                width: config.node_width,
                height: config.node_height,
                color: device_color(&device.device_type, theme).to_string(),
                ports,
                connection_count: counts.get(&device.id).copied().unwrap_or(0),
                lane: placement.lane_of.get(&device.id).copied(),
            },
        );
    }

    let types: BTreeMap<DeviceId, &DeviceType> =
        visible.iter().map(|d| (d.id, &d.device_type)).collect();
    let groups = edges::group_edges(&shown, &types);
    let edges = routing::route_edges(groups, &nodes, theme, config);

    let (width, height) = bounds(&nodes, config);
    tracing::debug!(
        nodes = nodes.len(),
        edges = edges.len(),
        lanes = placement.lanes.len(),
        diagnostics = diagnostics.len(),
        "layout pass complete"
    );

    Layout {
        nodes,
        edges,
        lanes: placement.lanes,
        width,
        height,
        used_persisted_positions: placement.persisted,
        diagnostics,
    }
}

/// First device wins when an id repeats.
fn index_devices<'a>(
    devices: &'a [Device],
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<DeviceId, &'a Device> {
    let mut index = BTreeMap::new();
    for device in devices {
        if index.contains_key(&device.id) {
            report(diagnostics, Diagnostic::DuplicateDevice { device: device.id });
            continue;
        }
        index.insert(device.id, device);
    }
    index
}

/// Keeps connections whose devices exist and whose ports are in range.
/// Each rejected connection yields exactly one diagnostic and its id is
/// returned alongside the kept ones.
fn resolve_connections<'a>(
    connections: &'a [Connection],
    devices: &BTreeMap<DeviceId, &Device>,
    diagnostics: &mut Vec<Diagnostic>,
) -> (Vec<&'a Connection>, BTreeSet<ConnectionId>) {
    let mut resolved = Vec::with_capacity(connections.len());
    let mut rejected = BTreeSet::new();
    for conn in connections {
        let endpoints = [
            (conn.source_device, conn.source_port),
            (conn.target_device, conn.target_port),
        ];
        let mut reason = None;
        for (device_id, port) in endpoints {
            match devices.get(&device_id) {
                None => {
                    reason = Some(Diagnostic::MissingDevice {
                        connection: conn.id,
                        device: device_id,
                    });
                }
                Some(device) if !ports::port_in_range(device, port) => {
                    reason = Some(Diagnostic::PortOutOfRange {
                        connection: conn.id,
                        device: device_id,
                        port,
                        port_count: device.port_count,
                    });
                }
                Some(_) => continue,
            }
            break;
        }
        match reason {
            Some(diagnostic) => {
                report(diagnostics, diagnostic);
                rejected.insert(conn.id);
            }
            None => resolved.push(conn),
        }
    }
    (resolved, rejected)
}

fn connection_counts(connections: &[&Connection]) -> BTreeMap<DeviceId, usize> {
    let mut counts = BTreeMap::new();
    for conn in connections {
        *counts.entry(conn.source_device).or_insert(0) += 1;
        if conn.target_device != conn.source_device {
            *counts.entry(conn.target_device).or_insert(0) += 1;
        }
    }
    counts
}

fn bounds(nodes: &BTreeMap<DeviceId, NodeLayout>, config: &LayoutConfig) -> (f32, f32) {
    if nodes.is_empty() {
        return (0.0, 0.0);
    }
    let mut max_x = f32::MIN;
    let mut max_y = f32::MIN;
    for node in nodes.values() {
        max_x = max_x.max(node.x + node.width);
        max_y = max_y.max(node.y + node.height);
    }
    (max_x + config.margin, max_y + config.margin)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Position;
    use proptest::prelude::*;

    fn run(snapshot: &Snapshot) -> Layout {
        compute_layout(
            snapshot,
            &Filters::default(),
            &PersistedPositions::new(),
            &Theme::light(),
            &LayoutConfig::default(),
        )
    }

    fn two_switches(connections: Vec<Connection>) -> Snapshot {
        Snapshot::new(
            vec![
                Device::new(1, "sw1", DeviceType::Switch, 2),
                Device::new(2, "sw2", DeviceType::Switch, 2),
            ],
            connections,
        )
    }

    #[test]
    fn empty_snapshot_gives_empty_layout() {
        let layout = run(&Snapshot::default());
        assert!(layout.nodes.is_empty());
        assert!(layout.edges.is_empty());
        assert!(layout.diagnostics.is_empty());
        assert_eq!((layout.width, layout.height), (0.0, 0.0));
    }

    #[test]
    fn nodes_without_connections_still_render() {
        let layout = run(&two_switches(Vec::new()));
        assert_eq!(layout.nodes.len(), 2);
        assert!(layout.edges.is_empty());
        assert!(layout.width > 0.0);
    }

    #[test]
    fn switch_pair_collapses_to_one_stack_edge() {
        let layout = run(&two_switches(vec![
            Connection::new(1, (1, 1), (2, 1)),
            Connection::new(2, (1, 2), (2, 2)),
        ]));
        assert_eq!(layout.edges.len(), 1);
        let edge = &layout.edges[0];
        assert_eq!(edge.kind, EdgeKind::Stack);
        assert_eq!(edge.multiplicity, 2);
        assert_eq!(edge.label, "[STACK 2x] 1⟷1, 2⟷2");
        assert_eq!(edge.connections, vec![ConnectionId(1), ConnectionId(2)]);
    }

    #[test]
    fn stack_label_is_independent_of_declared_direction() {
        let forward = run(&two_switches(vec![
            Connection::new(1, (1, 1), (2, 1)),
            Connection::new(2, (1, 2), (2, 2)),
        ]));
        let mixed = run(&two_switches(vec![
            Connection::new(1, (2, 1), (1, 1)),
            Connection::new(2, (1, 2), (2, 2)),
        ]));
        assert_eq!(forward.edges[0].label, mixed.edges[0].label);
        assert_eq!(forward.edges[0].port_pairs, mixed.edges[0].port_pairs);
    }

    #[test]
    fn unknown_device_is_dropped_with_one_diagnostic() {
        let layout = run(&two_switches(vec![Connection::new(5, (1, 1), (99, 1))]));
        assert!(layout.edges.is_empty());
        assert_eq!(
            layout.diagnostics,
            vec![Diagnostic::MissingDevice {
                connection: ConnectionId(5),
                device: DeviceId(99),
            }]
        );
        // The cable is still plugged into sw1 even though it is not drawn.
        assert!(layout.nodes[&DeviceId(1)].ports[0].occupied);
    }

    #[test]
    fn dropped_connections_still_occupy_their_valid_ports() {
        let layout = run(&two_switches(vec![
            Connection::new(5, (1, 1), (99, 1)),
            Connection::new(6, (1, 2), (2, 7)),
        ]));
        assert!(layout.edges.is_empty());
        assert_eq!(layout.diagnostics.len(), 2);
        let sw1: Vec<bool> = layout.nodes[&DeviceId(1)].ports.iter().map(|p| p.occupied).collect();
        assert_eq!(sw1, vec![true, true]);
        assert_eq!(
            layout.nodes[&DeviceId(1)].ports[1].connection,
            Some(ConnectionId(6))
        );
        assert!(layout.nodes[&DeviceId(2)].ports.iter().all(|p| !p.occupied));
        assert_eq!(layout.nodes[&DeviceId(1)].connection_count, 0);
    }

    #[test]
    fn out_of_range_port_is_dropped_once() {
        let layout = run(&two_switches(vec![Connection::new(5, (1, 1), (2, 7))]));
        assert!(layout.edges.is_empty());
        assert_eq!(layout.diagnostics.len(), 1);
        assert!(matches!(
            layout.diagnostics[0],
            Diagnostic::PortOutOfRange { port: 7, port_count: 2, .. }
        ));
    }

    #[test]
    fn duplicate_device_ids_keep_the_first() {
        let mut snapshot = two_switches(Vec::new());
        snapshot
            .devices
            .push(Device::new(1, "ghost", DeviceType::Router, 1));
        let layout = run(&snapshot);
        assert_eq!(layout.nodes.len(), 2);
        assert_eq!(layout.nodes[&DeviceId(1)].name, "sw1");
        assert_eq!(
            layout.diagnostics,
            vec![Diagnostic::DuplicateDevice { device: DeviceId(1) }]
        );
    }

    #[test]
    fn filtered_out_endpoints_drop_edges_silently() {
        let snapshot = Snapshot::new(
            vec![
                Device::new(1, "r1", DeviceType::Router, 2),
                Device::new(2, "sw1", DeviceType::Switch, 2),
            ],
            vec![Connection::new(1, (1, 1), (2, 1))],
        );
        let filters = Filters {
            device_type: Some("switch".to_string()),
            ..Default::default()
        };
        let layout = compute_layout(
            &snapshot,
            &filters,
            &PersistedPositions::new(),
            &Theme::light(),
            &LayoutConfig::default(),
        );
        assert_eq!(layout.nodes.len(), 1);
        assert!(layout.edges.is_empty());
        assert!(layout.diagnostics.is_empty());
        // The cable still occupies the port even though its far end is hidden.
        assert!(layout.nodes[&DeviceId(2)].ports[0].occupied);
        assert_eq!(layout.nodes[&DeviceId(2)].connection_count, 0);
    }

    #[test]
    fn persisted_positions_are_returned_verbatim() {
        let snapshot = two_switches(vec![Connection::new(1, (1, 1), (2, 1))]);
        let mut persisted = PersistedPositions::new();
        persisted.insert(DeviceId(1), Position::new(12.5, -40.0));
        persisted.insert(DeviceId(2), Position::new(900.0, 13.0));
        let layout = compute_layout(
            &snapshot,
            &Filters::default(),
            &persisted,
            &Theme::light(),
            &LayoutConfig::default(),
        );
        assert!(layout.used_persisted_positions);
        assert!(layout.lanes.is_empty());
        assert_eq!(layout.nodes[&DeviceId(1)].position(), Position::new(12.5, -40.0));
        assert_eq!(layout.nodes[&DeviceId(2)].position(), Position::new(900.0, 13.0));
        assert_eq!(layout.nodes[&DeviceId(1)].lane, None);
    }

    #[test]
    fn layout_is_idempotent() {
        let snapshot = Snapshot::new(
            vec![
                Device::new(1, "fw", DeviceType::Firewall, 4),
                Device::new(2, "sw1", DeviceType::Switch, 8),
                Device::new(3, "sw2", DeviceType::Switch, 8),
                Device::new(4, "plc", DeviceType::Plc, 2),
            ],
            vec![
                Connection::new(1, (1, 1), (2, 1)),
                Connection::new(2, (2, 2), (3, 2)),
                Connection::new(3, (3, 3), (4, 1)),
            ],
        );
        let first = run(&snapshot);
        let second = run(&snapshot);
        for (id, node) in &first.nodes {
            assert_eq!(node.position(), second.nodes[id].position());
        }
        let first_anchors: Vec<AnchorPair> = first.edges.iter().map(|e| e.anchors).collect();
        let second_anchors: Vec<AnchorPair> = second.edges.iter().map(|e| e.anchors).collect();
        assert_eq!(first_anchors, second_anchors);
    }

    #[test]
    fn parallel_normal_links_fan_out() {
        let snapshot = Snapshot::new(
            vec![
                Device::new(1, "r1", DeviceType::Router, 4),
                Device::new(2, "srv", DeviceType::Server, 4),
            ],
            vec![
                Connection::new(1, (1, 1), (2, 1)),
                Connection::new(2, (1, 2), (2, 2)),
            ],
        );
        let layout = run(&snapshot);
        assert_eq!(layout.edges.len(), 2);
        assert_eq!(layout.edges[0].pair_index, 0);
        assert_eq!(layout.edges[1].pair_index, 1);
        assert_eq!(layout.edges[0].pair_total, 2);
        assert_ne!(layout.edges[0].points, layout.edges[1].points);
    }

    #[test]
    fn label_lists_left_node_first() {
        // The server lane sits right of the router lane, so the declared
        // server -> router direction is flipped for reading.
        let snapshot = Snapshot::new(
            vec![
                Device::new(1, "r1", DeviceType::Router, 4),
                Device::new(2, "srv", DeviceType::Server, 4),
            ],
            vec![Connection::new(1, (2, 3), (1, 4))],
        );
        let layout = run(&snapshot);
        assert_eq!(layout.edges[0].label, "4 ⟷ 3");
        assert_eq!(layout.edges[0].from, DeviceId(2));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        #[test]
        fn prop_edge_count_conserves_connections(
            kinds in proptest::collection::vec(0u8..4, 1..8),
            links in proptest::collection::vec((0u64..10, 1u32..6, 0u64..10, 1u32..6), 0..30),
        ) {
            let palette = [DeviceType::Switch, DeviceType::Firewall, DeviceType::Router, DeviceType::Sensor];
            let devices: Vec<Device> = kinds
                .iter()
                .enumerate()
                .map(|(i, k)| Device::new(i as u64, &format!("d{i}"), palette[*k as usize].clone(), 4))
                .collect();
            let connections: Vec<Connection> = links
                .iter()
                .enumerate()
                .map(|(i, (s, sp, t, tp))| Connection::new(i as u64, (*s, *sp), (*t, *tp)))
                .collect();
            let snapshot = Snapshot::new(devices, connections);
            let layout = run(&snapshot);

            let dropped = layout
                .diagnostics
                .iter()
                .filter(|d| matches!(d, Diagnostic::MissingDevice { .. } | Diagnostic::PortOutOfRange { .. }))
                .count();
            let single = layout.edges.iter().filter(|e| e.kind != EdgeKind::Stack).count();
            let stacks: BTreeSet<_> = layout
                .edges
                .iter()
                .filter(|e| e.kind == EdgeKind::Stack)
                .map(|e| e.pair_key())
                .collect();
            let stacked: usize = layout
                .edges
                .iter()
                .filter(|e| e.kind == EdgeKind::Stack)
                .map(|e| e.multiplicity)
                .sum();

            prop_assert_eq!(stacks.len(), layout.edges.len() - single);
            prop_assert_eq!(single + stacked, snapshot.connections.len() - dropped);
        }
    }
}
