use std::collections::BTreeMap;
use std::fmt;

use crate::ir::{ConnectionId, DeviceId, DeviceType, PairKey, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct PortState {
    pub index: u32,
    pub occupied: bool,
    pub connection: Option<ConnectionId>,
    pub port_type: Option<String>,
    pub speed: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NodeLayout {
    pub id: DeviceId,
    pub name: String,
    pub device_type: DeviceType,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub color: String,
    pub ports: Vec<PortState>,
    pub connection_count: usize,
    /// `None` when the position came from the persisted set.
    pub lane: Option<usize>,
}

impl NodeLayout {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Normal,
    HighAvailability,
    Stack,
}

impl EdgeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::HighAvailability => "ha",
            Self::Stack => "stack",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Anchor {
    Top,
    Bottom,
    Left,
    Right,
}

impl Anchor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPair {
    pub source: Anchor,
    pub target: Anchor,
}

impl AnchorPair {
    pub const fn new(source: Anchor, target: Anchor) -> Self {
        Self { source, target }
    }
}

/// Ports joined by one cable, `(port on from, port on to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortPair {
    pub from_port: u32,
    pub to_port: u32,
}

impl PortPair {
    pub fn swapped(self) -> Self {
        Self {
            from_port: self.to_port,
            to_port: self.from_port,
        }
    }
}

impl fmt::Display for PortPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}⟷{}", self.from_port, self.to_port)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeStyle {
    pub color: String,
    pub width: f32,
    pub dasharray: Option<String>,
}

#[derive(Debug, Clone)]
pub struct EdgeLayout {
    pub from: DeviceId,
    pub to: DeviceId,
    pub kind: EdgeKind,
    /// Firewall pair, kept even when the stack rule classified the edge.
    pub ha: bool,
    pub connections: Vec<ConnectionId>,
    pub multiplicity: usize,
    pub port_pairs: Vec<PortPair>,
    pub label: String,
    pub anchors: AnchorPair,
    pub points: Vec<(f32, f32)>,
    /// Position of this edge among all edges of the same device pair.
    pub pair_index: usize,
    pub pair_total: usize,
    pub style: EdgeStyle,
    pub cable_type: Option<String>,
}

impl EdgeLayout {
    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.from, self.to)
    }
}

/// Lane bucket key: a listed device type or the trailing catch-all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaneKey {
    Type(DeviceType),
    Unlisted,
}

impl LaneKey {
    pub fn label(&self) -> &str {
        match self {
            Self::Type(device_type) => device_type.tag(),
            Self::Unlisted => "Unlisted",
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaneLayout {
    pub key: LaneKey,
    pub x: f32,
    pub devices: Vec<DeviceId>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    MissingDevice {
        connection: ConnectionId,
        device: DeviceId,
    },
    PortOutOfRange {
        connection: ConnectionId,
        device: DeviceId,
        port: u32,
        port_count: u32,
    },
    PortConflict {
        device: DeviceId,
        port: u32,
        kept: ConnectionId,
        ignored: ConnectionId,
    },
    InvalidPortDescriptor {
        device: DeviceId,
        port: u32,
        port_count: u32,
    },
    DuplicatePortDescriptor {
        device: DeviceId,
        port: u32,
    },
    DuplicateDevice {
        device: DeviceId,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDevice { connection, device } => {
                write!(f, "connection {connection} references unknown device {device}")
            }
            Self::PortOutOfRange {
                connection,
                device,
                port,
                port_count,
            } => write!(
                f,
                "connection {connection} uses port {port} on device {device} which has {port_count} ports"
            ),
            Self::PortConflict {
                device,
                port,
                kept,
                ignored,
            } => write!(
                f,
                "port {port} on device {device} is claimed by connections {kept} and {ignored}"
            ),
            Self::InvalidPortDescriptor {
                device,
                port,
                port_count,
            } => write!(
                f,
                "device {device} describes port {port} outside 1..={port_count}"
            ),
            Self::DuplicatePortDescriptor { device, port } => {
                write!(f, "device {device} describes port {port} more than once")
            }
            Self::DuplicateDevice { device } => {
                write!(f, "device id {device} appears more than once")
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub nodes: BTreeMap<DeviceId, NodeLayout>,
    pub edges: Vec<EdgeLayout>,
    pub lanes: Vec<LaneLayout>,
    pub width: f32,
    pub height: f32,
    /// True when every displayed device had a persisted position.
    pub used_persisted_positions: bool,
    pub diagnostics: Vec<Diagnostic>,
}
