use crate::ir::{Device, DeviceType, Filters};

/// Empty values and "all" mean the filter is not set.
fn active(value: Option<&str>) -> Option<&str> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"))
}

pub fn device_matches(device: &Device, filters: &Filters) -> bool {
    if let Some(wanted) = active(filters.device_type.as_deref()) {
        let wanted = DeviceType::from_tag(wanted);
        if !device.device_type.tag().eq_ignore_ascii_case(wanted.tag()) {
            return false;
        }
    }

    if let Some(wanted) = active(filters.category.as_deref()) {
        let category = device
            .category
            .as_deref()
            .unwrap_or_else(|| device.device_type.family().as_str());
        if !category.trim().eq_ignore_ascii_case(wanted) {
            return false;
        }
    }

    if let Some(wanted) = active(filters.network_range_type.as_deref()) {
        match device.network_range_type.as_deref() {
            Some(range) if range.trim().eq_ignore_ascii_case(wanted) => {}
            _ => return false,
        }
    }

    true
}
