use std::collections::{BTreeMap, BTreeSet};

use crate::ir::{Connection, ConnectionId, Device, PortDescriptor};

use super::{Diagnostic, PortState, report};

/// Port states 1..=port_count for `device`, derived from `connections`.
///
/// Stored descriptors only contribute type, speed and label. A port is
/// occupied iff a connection names it as an endpoint; when two connections
/// claim the same port the earlier one keeps it.
pub fn port_states<'c>(
    device: &Device,
    connections: impl IntoIterator<Item = &'c Connection>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<PortState> {
    derive_port_states(device, connections, &BTreeSet::new(), diagnostics)
}

/// Like [`port_states`], but connections in `reported` already carry a
/// diagnostic: their out-of-range ends are skipped silently.
pub(super) fn derive_port_states<'c>(
    device: &Device,
    connections: impl IntoIterator<Item = &'c Connection>,
    reported: &BTreeSet<ConnectionId>,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<PortState> {
    let port_count = device.port_count;
    let descriptors = descriptor_index(device, diagnostics);

    let mut owners: Vec<Option<ConnectionId>> = vec![None; port_count as usize];
    for conn in connections {
        if conn.source_device == device.id {
            claim(device, conn, conn.source_port, &mut owners, reported, diagnostics);
        }
        if conn.target_device == device.id {
            // A self-loop on a single port claims it once.
            if conn.source_device == device.id && conn.source_port == conn.target_port {
                continue;
            }
            claim(device, conn, conn.target_port, &mut owners, reported, diagnostics);
        }
    }

    owners
        .into_iter()
        .enumerate()
        .map(|(slot, owner)| {
            let index = slot as u32 + 1;
            let descriptor = descriptors.get(&index);
            PortState {
                index,
                occupied: owner.is_some(),
                connection: owner,
                port_type: descriptor
                    .map(|d| d.port_type.clone())
                    .filter(|t| !t.is_empty()),
                speed: descriptor.and_then(|d| d.speed.clone()),
                label: descriptor.and_then(|d| d.label.clone()),
            }
        })
        .collect()
}

fn descriptor_index<'a>(
    device: &'a Device,
    diagnostics: &mut Vec<Diagnostic>,
) -> BTreeMap<u32, &'a PortDescriptor> {
    let mut descriptors = BTreeMap::new();
    for descriptor in &device.ports {
        if !port_in_range(device, descriptor.index) {
            report(
                diagnostics,
                Diagnostic::InvalidPortDescriptor {
                    device: device.id,
                    port: descriptor.index,
                    port_count: device.port_count,
                },
            );
            continue;
        }
        if descriptors.contains_key(&descriptor.index) {
            report(
                diagnostics,
                Diagnostic::DuplicatePortDescriptor {
                    device: device.id,
                    port: descriptor.index,
                },
            );
            continue;
        }
        descriptors.insert(descriptor.index, descriptor);
    }
    descriptors
}

fn claim(
    device: &Device,
    conn: &Connection,
    port: u32,
    owners: &mut [Option<ConnectionId>],
    reported: &BTreeSet<ConnectionId>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if !port_in_range(device, port) {
        if reported.contains(&conn.id) {
            return;
        }
        report(
            diagnostics,
            Diagnostic::PortOutOfRange {
                connection: conn.id,
                device: device.id,
                port,
                port_count: device.port_count,
            },
        );
        return;
    }
    let slot = &mut owners[(port - 1) as usize];
    match *slot {
        None => *slot = Some(conn.id),
        Some(kept) if kept == conn.id => {}
        Some(kept) => report(
            diagnostics,
            Diagnostic::PortConflict {
                device: device.id,
                port,
                kept,
                ignored: conn.id,
            },
        ),
    }
}

/// True when `port` on `device` can carry a cable.
pub(super) fn port_in_range(device: &Device, port: u32) -> bool {
    port >= 1 && port <= device.port_count
}
