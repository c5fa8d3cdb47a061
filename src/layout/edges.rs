use std::collections::{BTreeMap, HashMap};

use crate::config::EdgeStyleConfig;
use crate::ir::{Connection, DeviceId, DeviceType, PairKey};
use crate::theme::{Theme, cable_color};

use super::{EdgeKind, EdgeStyle, PortPair};

/// One visual edge before anchors are chosen.
#[derive(Debug, Clone)]
pub struct EdgeGroup<'a> {
    pub from: DeviceId,
    pub to: DeviceId,
    pub kind: EdgeKind,
    pub ha: bool,
    pub connections: Vec<&'a Connection>,
    /// Distinct port pairs, oriented `from -> to`, in first-seen order.
    pub port_pairs: Vec<PortPair>,
}

impl EdgeGroup<'_> {
    pub fn multiplicity(&self) -> usize {
        self.connections.len()
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.from, self.to)
    }
}

/// Switch-Switch links are stack links; Firewall-Firewall links are HA.
/// The stack rule wins if a pair ever qualifies for both.
pub fn classify(source: &DeviceType, target: &DeviceType) -> (EdgeKind, bool) {
    let stack = *source == DeviceType::Switch && *target == DeviceType::Switch;
    let ha = *source == DeviceType::Firewall && *target == DeviceType::Firewall;
    let kind = if stack {
        EdgeKind::Stack
    } else if ha {
        EdgeKind::HighAvailability
    } else {
        EdgeKind::Normal
    };
    (kind, ha)
}

/// Collapses stack links per unordered device pair and passes every other
/// connection through as its own edge.
///
/// Output order follows the first connection of each edge in `connections`.
/// Connections whose endpoints are missing from `types` are skipped; callers
/// resolve endpoints before grouping.
pub fn group_edges<'a>(
    connections: &[&'a Connection],
    types: &BTreeMap<DeviceId, &DeviceType>,
) -> Vec<EdgeGroup<'a>> {
    let mut groups: Vec<EdgeGroup<'a>> = Vec::new();
    let mut stack_slots: HashMap<PairKey, usize> = HashMap::new();

    for conn in connections {
        let (Some(source_type), Some(target_type)) = (
            types.get(&conn.source_device),
            types.get(&conn.target_device),
        ) else {
            continue;
        };
        let (kind, ha) = classify(source_type, target_type);
        let declared = PortPair {
            from_port: conn.source_port,
            to_port: conn.target_port,
        };

        if kind != EdgeKind::Stack {
            groups.push(EdgeGroup {
                from: conn.source_device,
                to: conn.target_device,
                kind,
                ha,
                connections: vec![*conn],
                port_pairs: vec![declared],
            });
            continue;
        }

        let key = conn.pair_key();
        let oriented = if conn.source_device == key.low {
            declared
        } else {
            declared.swapped()
        };
        match stack_slots.get(&key) {
            Some(&slot) => {
                let group = &mut groups[slot];
                group.connections.push(*conn);
                if !group.port_pairs.contains(&oriented) {
                    group.port_pairs.push(oriented);
                }
            }
            None => {
                stack_slots.insert(key, groups.len());
                groups.push(EdgeGroup {
                    from: key.low,
                    to: key.high,
                    kind,
                    ha,
                    connections: vec![*conn],
                    port_pairs: vec![oriented],
                });
            }
        }
    }

    tracing::debug!(
        connections = connections.len(),
        edges = groups.len(),
        stacks = stack_slots.len(),
        "grouped connections into edges"
    );
    groups
}

/// Edge label, with `pairs` already in reading order.
pub fn edge_label(kind: EdgeKind, pairs: &[PortPair], multiplicity: usize) -> String {
    match kind {
        EdgeKind::Stack => {
            let joined = pairs
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            if multiplicity > 1 {
                format!("[STACK {multiplicity}x] {joined}")
            } else {
                format!("[STACK] {joined}")
            }
        }
        EdgeKind::HighAvailability => match pairs.first() {
            Some(pair) => format!("[HA] {} ⟷ {}", pair.from_port, pair.to_port),
            None => "[HA]".to_string(),
        },
        EdgeKind::Normal => match pairs.first() {
            Some(pair) => format!("{} ⟷ {}", pair.from_port, pair.to_port),
            None => String::new(),
        },
    }
}

pub fn edge_style(
    kind: EdgeKind,
    multiplicity: usize,
    color_name: Option<&str>,
    theme: &Theme,
    config: &EdgeStyleConfig,
) -> EdgeStyle {
    match kind {
        EdgeKind::Normal => EdgeStyle {
            color: color_name
                .map(|name| cable_color(name, theme))
                .unwrap_or_else(|| theme.line_color.clone()),
            width: config.normal_width,
            dasharray: None,
        },
        EdgeKind::HighAvailability => EdgeStyle {
            color: theme.ha_line_color.clone(),
            width: config.ha_width,
            dasharray: Some(config.ha_dasharray.clone()),
        },
        EdgeKind::Stack => {
            let extra = multiplicity.saturating_sub(1) as f32 * config.stack_width_step;
            EdgeStyle {
                color: theme.stack_line_color.clone(),
                width: (config.stack_base_width + extra).min(config.stack_max_width),
                dasharray: Some(config.stack_dasharray.clone()),
            }
        }
    }
}
