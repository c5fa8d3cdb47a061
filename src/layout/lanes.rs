use std::collections::BTreeMap;

use crate::config::LayoutConfig;
use crate::ir::{Device, DeviceId, PersistedPositions, Position};

use super::{LaneKey, LaneLayout};

/// Device placement produced by [`assign_positions`].
#[derive(Debug, Clone)]
pub struct Placement {
    pub positions: BTreeMap<DeviceId, Position>,
    pub lane_of: BTreeMap<DeviceId, usize>,
    pub lanes: Vec<LaneLayout>,
    pub persisted: bool,
}

/// Groups devices into lanes following `config.lane_order`.
///
/// Listed types keep the configured order and empty lanes are skipped. Every
/// type missing from the order lands in one trailing [`LaneKey::Unlisted`]
/// lane. Inside a lane devices are sorted by descending connection count,
/// ties keeping input order.
pub fn group_lanes<'a>(
    devices: &[&'a Device],
    connection_counts: &BTreeMap<DeviceId, usize>,
    config: &LayoutConfig,
) -> Vec<(LaneKey, Vec<&'a Device>)> {
    let mut listed: Vec<Vec<&'a Device>> = vec![Vec::new(); config.lane_order.len()];
    let mut unlisted: Vec<&'a Device> = Vec::new();

    for device in devices {
        match config
            .lane_order
            .iter()
            .position(|t| t.tag().eq_ignore_ascii_case(device.device_type.tag()))
        {
            Some(idx) => listed[idx].push(*device),
            None => unlisted.push(*device),
        }
    }

    let count_of = |device: &Device| connection_counts.get(&device.id).copied().unwrap_or(0);

    let mut lanes = Vec::new();
    for (idx, mut members) in listed.into_iter().enumerate() {
        if members.is_empty() {
            continue;
        }
        // sort_by_key is stable, so equal counts keep input order.
        members.sort_by_key(|d| std::cmp::Reverse(count_of(*d)));
        lanes.push((LaneKey::Type(config.lane_order[idx].clone()), members));
    }
    if !unlisted.is_empty() {
        unlisted.sort_by_key(|d| std::cmp::Reverse(count_of(*d)));
        lanes.push((LaneKey::Unlisted, unlisted));
    }
    lanes
}

/// Lane placement: lane index drives x, devices are spread vertically and
/// centred on `baseline_y`.
pub fn lane_layout(
    devices: &[&Device],
    connection_counts: &BTreeMap<DeviceId, usize>,
    config: &LayoutConfig,
) -> Placement {
    let groups = group_lanes(devices, connection_counts, config);
    let mut positions = BTreeMap::new();
    let mut lane_of = BTreeMap::new();
    let mut lanes = Vec::with_capacity(groups.len());

    for (lane_idx, (key, members)) in groups.into_iter().enumerate() {
        let x = config.origin_x + lane_idx as f32 * config.lane_spacing;
        let center = (members.len() as f32 - 1.0) / 2.0;
        for (row, device) in members.iter().enumerate() {
            let y = config.baseline_y + (row as f32 - center) * config.node_spacing;
            positions.insert(device.id, Position::new(x, y));
            lane_of.insert(device.id, lane_idx);
        }
        lanes.push(LaneLayout {
            key,
            x,
            devices: members.iter().map(|d| d.id).collect(),
        });
    }

    Placement {
        positions,
        lane_of,
        lanes,
        persisted: false,
    }
}

/// Uses persisted positions only when every device has one; otherwise the
/// whole set is laid out automatically.
pub fn assign_positions(
    devices: &[&Device],
    connection_counts: &BTreeMap<DeviceId, usize>,
    persisted: &PersistedPositions,
    config: &LayoutConfig,
) -> Placement {
    let all_persisted =
        !devices.is_empty() && devices.iter().all(|d| persisted.contains_key(&d.id));
    if all_persisted {
        tracing::debug!(devices = devices.len(), "using persisted positions");
        let positions = devices
            .iter()
            .filter_map(|d| persisted.get(&d.id).map(|p| (d.id, *p)))
            .collect();
        return Placement {
            positions,
            lane_of: BTreeMap::new(),
            lanes: Vec::new(),
            persisted: true,
        };
    }
    if !persisted.is_empty() {
        tracing::debug!(
            persisted = persisted.len(),
            devices = devices.len(),
            "persisted positions incomplete, running lane layout"
        );
    }
    lane_layout(devices, connection_counts, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::DeviceType;

    fn device(id: u64, device_type: DeviceType) -> Device {
        Device::new(id, &format!("d{id}"), device_type, 8)
    }

    fn counts(pairs: &[(u64, usize)]) -> BTreeMap<DeviceId, usize> {
        pairs.iter().map(|(id, c)| (DeviceId(*id), *c)).collect()
    }

    #[test]
    fn lanes_follow_priority_and_skip_empty_types() {
        let devices = [
            device(1, DeviceType::Sensor),
            device(2, DeviceType::Switch),
            device(3, DeviceType::Router),
        ];
        let refs: Vec<&Device> = devices.iter().collect();
        let lanes = group_lanes(&refs, &BTreeMap::new(), &LayoutConfig::default());
        let keys: Vec<&str> = lanes.iter().map(|(k, _)| k.label()).collect();
        assert_eq!(keys, vec!["Router", "Switch", "Sensor"]);
    }

    #[test]
    fn unknown_types_share_a_trailing_lane() {
        let devices = [
            device(1, DeviceType::Unrecognized("Teleporter".into())),
            device(2, DeviceType::Other),
            device(3, DeviceType::Unrecognized("Quantum".into())),
            device(4, DeviceType::Router),
        ];
        let refs: Vec<&Device> = devices.iter().collect();
        let lanes = group_lanes(&refs, &BTreeMap::new(), &LayoutConfig::default());
        assert_eq!(lanes.len(), 3);
        assert_eq!(lanes[1].0, LaneKey::Type(DeviceType::Other));
        assert_eq!(lanes[2].0, LaneKey::Unlisted);
        let ids: Vec<u64> = lanes[2].1.iter().map(|d| d.id.0).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn injected_order_replaces_default() {
        let mut config = LayoutConfig::default();
        config.lane_order = vec![DeviceType::Switch];
        let devices = [device(1, DeviceType::Router), device(2, DeviceType::Switch)];
        let refs: Vec<&Device> = devices.iter().collect();
        let lanes = group_lanes(&refs, &BTreeMap::new(), &config);
        assert_eq!(lanes[0].0, LaneKey::Type(DeviceType::Switch));
        assert_eq!(lanes[1].0, LaneKey::Unlisted);
    }

    #[test]
    fn configured_tags_match_case_insensitively() {
        let mut config = LayoutConfig::default();
        config.lane_order = vec![DeviceType::Unrecognized("Teleporter".into())];
        let devices = [
            device(1, DeviceType::Unrecognized("teleporter".into())),
            device(2, DeviceType::Unrecognized("TELEPORTER".into())),
        ];
        let refs: Vec<&Device> = devices.iter().collect();
        let lanes = group_lanes(&refs, &BTreeMap::new(), &config);
        assert_eq!(lanes.len(), 1);
        assert_eq!(lanes[0].0.label(), "Teleporter");
        assert_eq!(lanes[0].1.len(), 2);
    }

    #[test]
    fn lane_members_sorted_by_connection_count_then_input_order() {
        let devices = [
            device(1, DeviceType::Switch),
            device(2, DeviceType::Switch),
            device(3, DeviceType::Switch),
            device(4, DeviceType::Switch),
        ];
        let refs: Vec<&Device> = devices.iter().collect();
        let lanes = group_lanes(
            &refs,
            &counts(&[(1, 1), (2, 5), (3, 1), (4, 5)]),
            &LayoutConfig::default(),
        );
        let ids: Vec<u64> = lanes[0].1.iter().map(|d| d.id.0).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[test]
    fn lane_positions_are_symmetric_about_baseline() {
        let config = LayoutConfig::default();
        let devices = [
            device(1, DeviceType::Router),
            device(2, DeviceType::Switch),
            device(3, DeviceType::Switch),
            device(4, DeviceType::Switch),
        ];
        let refs: Vec<&Device> = devices.iter().collect();
        let placement = lane_layout(&refs, &BTreeMap::new(), &config);

        let router = placement.positions[&DeviceId(1)];
        assert_eq!(router.x, config.origin_x);
        assert_eq!(router.y, config.baseline_y);

        let ys: Vec<f32> = [2, 3, 4]
            .iter()
            .map(|id| placement.positions[&DeviceId(*id)].y)
            .collect();
        assert_eq!(
            ys,
            vec![
                config.baseline_y - config.node_spacing,
                config.baseline_y,
                config.baseline_y + config.node_spacing
            ]
        );
        let switch_x = placement.positions[&DeviceId(2)].x;
        assert_eq!(switch_x, config.origin_x + config.lane_spacing);
        assert_eq!(placement.lane_of[&DeviceId(3)], 1);
    }

    #[test]
    fn persisted_positions_are_all_or_nothing() {
        let config = LayoutConfig::default();
        let devices = [device(1, DeviceType::Router), device(2, DeviceType::Switch)];
        let refs: Vec<&Device> = devices.iter().collect();

        let mut persisted = PersistedPositions::new();
        persisted.insert(DeviceId(1), Position::new(7.0, 9.0));
        let partial = assign_positions(&refs, &BTreeMap::new(), &persisted, &config);
        assert!(!partial.persisted);
        assert_eq!(partial.positions[&DeviceId(1)].x, config.origin_x);

        persisted.insert(DeviceId(2), Position::new(-3.0, 42.5));
        let full = assign_positions(&refs, &BTreeMap::new(), &persisted, &config);
        assert!(full.persisted);
        assert!(full.lanes.is_empty());
        assert_eq!(full.positions[&DeviceId(1)], Position::new(7.0, 9.0));
        assert_eq!(full.positions[&DeviceId(2)], Position::new(-3.0, 42.5));
    }
}
