use std::collections::{BTreeMap, HashMap};

use crate::config::{LayoutConfig, RoutingConfig};
use crate::ir::{DeviceId, PairKey};
use crate::theme::Theme;

use super::edges::{EdgeGroup, edge_label, edge_style};
use super::{Anchor, AnchorPair, EdgeKind, EdgeLayout, NodeLayout, PortPair};

/// Sides tried in turn for short edges so parallel links spread out.
const CLOSE_ANCHOR_CYCLE: [AnchorPair; 4] = [
    AnchorPair::new(Anchor::Right, Anchor::Left),
    AnchorPair::new(Anchor::Bottom, Anchor::Top),
    AnchorPair::new(Anchor::Left, Anchor::Right),
    AnchorPair::new(Anchor::Top, Anchor::Bottom),
];

/// Keeps fanned-out anchors this far from a box corner.
const ANCHOR_CORNER_PAD: f32 = 6.0;

/// Per device pair edge counter. Built fresh for every layout pass.
#[derive(Debug, Default)]
pub struct PairCounters {
    counts: HashMap<PairKey, usize>,
}

impl PairCounters {
    /// Returns the number of edges already seen for `key`, then bumps it.
    pub fn next(&mut self, key: PairKey) -> usize {
        let slot = self.counts.entry(key).or_insert(0);
        let current = *slot;
        *slot += 1;
        current
    }
}

/// Chooses the box sides an edge leaves and enters.
///
/// `dx`/`dy` run from source to target with y growing downwards. HA links
/// that are nearly vertically aligned always use top/bottom. Short edges
/// rotate through [`CLOSE_ANCHOR_CYCLE`] by `pair_index`. Everything else is
/// bucketed by angle into four 90 degree sectors; the ±45° and ±135°
/// boundaries belong to the horizontal sectors.
pub fn select_anchors(
    kind: EdgeKind,
    dx: f32,
    dy: f32,
    pair_index: usize,
    config: &RoutingConfig,
) -> AnchorPair {
    if kind == EdgeKind::HighAvailability && dx.abs() < config.ha_vertical_threshold {
        return if dy >= 0.0 {
            AnchorPair::new(Anchor::Bottom, Anchor::Top)
        } else {
            AnchorPair::new(Anchor::Top, Anchor::Bottom)
        };
    }

    let distance = (dx * dx + dy * dy).sqrt();
    if distance < config.close_distance {
        return CLOSE_ANCHOR_CYCLE[pair_index % CLOSE_ANCHOR_CYCLE.len()];
    }

    let angle = dy.atan2(dx).to_degrees();
    if (-45.0..=45.0).contains(&angle) {
        AnchorPair::new(Anchor::Right, Anchor::Left)
    } else if angle > 45.0 && angle < 135.0 {
        AnchorPair::new(Anchor::Bottom, Anchor::Top)
    } else if angle < -45.0 && angle > -135.0 {
        AnchorPair::new(Anchor::Top, Anchor::Bottom)
    } else {
        AnchorPair::new(Anchor::Left, Anchor::Right)
    }
}

/// True when the label should list the `to` end first: the left node
/// reads first for mostly horizontal edges, the top node for vertical ones.
pub fn reads_backwards(dx: f32, dy: f32) -> bool {
    if dx.abs() >= dy.abs() { dx < 0.0 } else { dy < 0.0 }
}

/// Point on `node`'s `anchor` side, shifted along the side by `offset`.
pub fn anchor_point(node: &NodeLayout, anchor: Anchor, offset: f32) -> (f32, f32) {
    let half_w = (node.width / 2.0 - ANCHOR_CORNER_PAD).max(0.0);
    let half_h = (node.height / 2.0 - ANCHOR_CORNER_PAD).max(0.0);
    let (cx, cy) = node.center();
    match anchor {
        Anchor::Top => (cx + offset.clamp(-half_w, half_w), node.y),
        Anchor::Bottom => (cx + offset.clamp(-half_w, half_w), node.y + node.height),
        Anchor::Left => (node.x, cy + offset.clamp(-half_h, half_h)),
        Anchor::Right => (node.x + node.width, cy + offset.clamp(-half_h, half_h)),
    }
}

fn fan_offset(index: usize, total: usize, gap: f32) -> f32 {
    if total <= 1 {
        return 0.0;
    }
    (index as f32 - (total as f32 - 1.0) / 2.0) * gap
}

/// Turns grouped edges into positioned, styled edges.
pub fn route_edges(
    groups: Vec<EdgeGroup<'_>>,
    nodes: &BTreeMap<DeviceId, NodeLayout>,
    theme: &Theme,
    config: &LayoutConfig,
) -> Vec<EdgeLayout> {
    let mut totals: HashMap<PairKey, usize> = HashMap::new();
    for group in &groups {
        *totals.entry(group.pair_key()).or_insert(0) += 1;
    }

    let mut counters = PairCounters::default();
    let mut edges = Vec::with_capacity(groups.len());

    for group in groups {
        let (Some(from), Some(to)) = (nodes.get(&group.from), nodes.get(&group.to)) else {
            tracing::debug!(from = %group.from, to = %group.to, "edge endpoint has no node");
            continue;
        };
        let key = group.pair_key();
        let pair_index = counters.next(key);
        let pair_total = totals.get(&key).copied().unwrap_or(1);

        let dx = to.x - from.x;
        let dy = to.y - from.y;
        let anchors = select_anchors(group.kind, dx, dy, pair_index, &config.routing);

        let offset = fan_offset(pair_index, pair_total, config.routing.parallel_edge_gap);
        let points = vec![
            anchor_point(from, anchors.source, offset),
            anchor_point(to, anchors.target, offset),
        ];

        let reading: Vec<PortPair> = if reads_backwards(dx, dy) {
            group.port_pairs.iter().map(|p| p.swapped()).collect()
        } else {
            group.port_pairs.clone()
        };
        let multiplicity = group.multiplicity();
        let label = edge_label(group.kind, &reading, multiplicity);

        let first = group.connections.first();
        let color_name = first.and_then(|c| c.cable_color.as_deref());
        let style = edge_style(group.kind, multiplicity, color_name, theme, &config.edge);
        let cable_type = first
            .map(|c| c.cable_type.clone())
            .filter(|t| !t.is_empty());

        edges.push(EdgeLayout {
            from: group.from,
            to: group.to,
            kind: group.kind,
            ha: group.ha,
            connections: group.connections.iter().map(|c| c.id).collect(),
            multiplicity,
            port_pairs: group.port_pairs,
            label,
            anchors,
            points,
            pair_index,
            pair_total,
            style,
            cable_type,
        });
    }

    edges
}
