use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SnapshotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(pub u64);

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Device family used by the category filter and the default lane order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceFamily {
    It,
    Ot,
    Other,
}

impl DeviceFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::It => "IT",
            Self::Ot => "OT",
            Self::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceType {
    Router,
    Firewall,
    Switch,
    AccessPoint,
    Server,
    Nas,
    Workstation,
    Printer,
    Plc,
    Hmi,
    Sensor,
    Actuator,
    IndustrialGateway,
    Other,
    /// Tag not known to this version; kept verbatim so it still renders.
    Unrecognized(String),
}

impl DeviceType {
    pub fn from_tag(tag: &str) -> Self {
        let trimmed = tag.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "router" => Self::Router,
            "firewall" => Self::Firewall,
            "switch" => Self::Switch,
            "accesspoint" | "access point" | "access_point" | "ap" => Self::AccessPoint,
            "server" => Self::Server,
            "nas" => Self::Nas,
            "workstation" | "pc" => Self::Workstation,
            "printer" => Self::Printer,
            "plc" | "sps" => Self::Plc,
            "hmi" => Self::Hmi,
            "sensor" => Self::Sensor,
            "actuator" | "aktor" => Self::Actuator,
            "industrialgateway" | "gateway" => Self::IndustrialGateway,
            "other" | "sonstige" => Self::Other,
            _ => Self::Unrecognized(trimmed.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Self::Router => "Router",
            Self::Firewall => "Firewall",
            Self::Switch => "Switch",
            Self::AccessPoint => "AccessPoint",
            Self::Server => "Server",
            Self::Nas => "NAS",
            Self::Workstation => "Workstation",
            Self::Printer => "Printer",
            Self::Plc => "PLC",
            Self::Hmi => "HMI",
            Self::Sensor => "Sensor",
            Self::Actuator => "Actuator",
            Self::IndustrialGateway => "IndustrialGateway",
            Self::Other => "Other",
            Self::Unrecognized(tag) => tag.as_str(),
        }
    }

    pub fn family(&self) -> DeviceFamily {
        match self {
            Self::Router
            | Self::Firewall
            | Self::Switch
            | Self::AccessPoint
            | Self::Server
            | Self::Nas
            | Self::Workstation
            | Self::Printer => DeviceFamily::It,
            Self::Plc | Self::Hmi | Self::Sensor | Self::Actuator | Self::IndustrialGateway => {
                DeviceFamily::Ot
            }
            Self::Other | Self::Unrecognized(_) => DeviceFamily::Other,
        }
    }

    /// IT types first, then OT types, `Other` last.
    pub fn default_priority() -> Vec<Self> {
        vec![
            Self::Router,
            Self::Firewall,
            Self::Switch,
            Self::AccessPoint,
            Self::Server,
            Self::Nas,
            Self::Workstation,
            Self::Printer,
            Self::IndustrialGateway,
            Self::Plc,
            Self::Hmi,
            Self::Sensor,
            Self::Actuator,
            Self::Other,
        ]
    }
}

impl From<String> for DeviceType {
    fn from(value: String) -> Self {
        Self::from_tag(&value)
    }
}

impl From<DeviceType> for String {
    fn from(value: DeviceType) -> Self {
        value.tag().to_string()
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortDescriptor {
    pub index: u32,
    #[serde(default)]
    pub port_type: String,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    /// Stored flag from the backend. Occupancy is always recomputed.
    #[serde(default)]
    pub occupied: bool,
    #[serde(default)]
    pub connection: Option<ConnectionId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: DeviceId,
    pub name: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    #[serde(default)]
    pub port_count: u32,
    #[serde(default)]
    pub ports: Vec<PortDescriptor>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub network_range_type: Option<String>,
}

impl Device {
    pub fn new(id: u64, name: &str, device_type: DeviceType, port_count: u32) -> Self {
        Self {
            id: DeviceId(id),
            name: name.to_string(),
            device_type,
            port_count,
            ports: Vec::new(),
            category: None,
            network_range_type: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub id: ConnectionId,
    pub source_device: DeviceId,
    pub source_port: u32,
    pub target_device: DeviceId,
    pub target_port: u32,
    #[serde(default)]
    pub cable_type: String,
    #[serde(default)]
    pub cable_color: Option<String>,
    #[serde(default)]
    pub length: Option<f32>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl Connection {
    pub fn new(id: u64, source: (u64, u32), target: (u64, u32)) -> Self {
        Self {
            id: ConnectionId(id),
            source_device: DeviceId(source.0),
            source_port: source.1,
            target_device: DeviceId(target.0),
            target_port: target.1,
            cable_type: String::new(),
            cable_color: None,
            length: None,
            category: None,
            remark: None,
        }
    }

    pub fn pair_key(&self) -> PairKey {
        PairKey::new(self.source_device, self.target_device)
    }
}

/// Unordered device pair, stored as (min, max).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey {
    pub low: DeviceId,
    pub high: DeviceId,
}

impl PairKey {
    pub fn new(a: DeviceId, b: DeviceId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Display filters applied before layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    #[serde(default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub network_range_type: Option<String>,
}

impl Filters {
    pub fn is_empty(&self) -> bool {
        self.device_type.is_none() && self.category.is_none() && self.network_range_type.is_none()
    }
}

pub type PersistedPositions = BTreeMap<DeviceId, Position>;

/// Immutable device and connection set for one layout pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub devices: Vec<Device>,
    #[serde(default)]
    pub connections: Vec<Connection>,
}

impl Snapshot {
    pub fn new(devices: Vec<Device>, connections: Vec<Connection>) -> Self {
        Self {
            devices,
            connections,
        }
    }

    pub fn from_json_str(input: &str) -> Result<Self, SnapshotError> {
        serde_json::from_str(input).map_err(SnapshotError::Parse)
    }

    pub fn from_path(path: &Path) -> Result<Self, SnapshotError> {
        let contents = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&contents)
    }
}

pub fn load_positions(path: &Path) -> Result<PersistedPositions, SnapshotError> {
    let contents = std::fs::read_to_string(path).map_err(|source| SnapshotError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let raw: BTreeMap<String, Position> =
        serde_json::from_str(&contents).map_err(SnapshotError::Parse)?;
    let mut positions = PersistedPositions::new();
    for (key, position) in raw {
        let id = key
            .trim()
            .parse::<u64>()
            .map_err(|_| SnapshotError::InvalidDeviceKey(key.clone()))?;
        positions.insert(DeviceId(id), position);
    }
    Ok(positions)
}
