//! Network graph data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Values that carry no information and never overwrite a stored value
const PLACEHOLDERS: &[&str] = &["", "unknown", "n/a", "none", "-", "*"];

/// Check whether an incoming value is an "unknown" placeholder
pub fn is_placeholder(value: &str) -> bool {
    let trimmed = value.trim();
    PLACEHOLDERS.iter().any(|p| trimmed.eq_ignore_ascii_case(p))
}

/// Model parsing errors
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Unknown device type: {0}")]
    UnknownDeviceType(String),

    #[error("Unknown node status: {0}")]
    UnknownStatus(String),
}

/// Lifecycle status of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Discovered,
    Alive,
    Compromised,
    Offline,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Discovered => "discovered",
            NodeStatus::Alive => "alive",
            NodeStatus::Compromised => "compromised",
            NodeStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "discovered" => Ok(NodeStatus::Discovered),
            // scanner vocabulary for a responding host
            "alive" | "up" => Ok(NodeStatus::Alive),
            "compromised" => Ok(NodeStatus::Compromised),
            "offline" | "down" => Ok(NodeStatus::Offline),
            other => Err(ModelError::UnknownStatus(other.to_string())),
        }
    }
}

/// Device classification label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    #[default]
    Host,
    Router,
    Firewall,
    Server,
    Workstation,
    Switch,
    AccessPoint,
    Vpn,
    Printer,
    Iot,
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Host => "host",
            DeviceType::Router => "router",
            DeviceType::Firewall => "firewall",
            DeviceType::Server => "server",
            DeviceType::Workstation => "workstation",
            DeviceType::Switch => "switch",
            DeviceType::AccessPoint => "access_point",
            DeviceType::Vpn => "vpn",
            DeviceType::Printer => "printer",
            DeviceType::Iot => "iot",
            DeviceType::Unknown => "unknown",
        }
    }

    /// Routers and firewalls act as subnet hubs during topology inference
    pub fn is_gateway(&self) -> bool {
        matches!(self, DeviceType::Router | DeviceType::Firewall)
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "host" => Ok(DeviceType::Host),
            "router" => Ok(DeviceType::Router),
            "firewall" => Ok(DeviceType::Firewall),
            "server" => Ok(DeviceType::Server),
            "workstation" => Ok(DeviceType::Workstation),
            "switch" => Ok(DeviceType::Switch),
            "access_point" | "ap" => Ok(DeviceType::AccessPoint),
            "vpn" => Ok(DeviceType::Vpn),
            "printer" => Ok(DeviceType::Printer),
            "iot" => Ok(DeviceType::Iot),
            "unknown" => Ok(DeviceType::Unknown),
            _ => Err(ModelError::UnknownDeviceType(s.to_string())),
        }
    }
}

/// One observed service on a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceRecord {
    pub port: u16,
    pub protocol: String,
    pub state: String,
    pub service: String,
    pub product: String,
    pub version: String,
}

impl ServiceRecord {
    /// Services with no recorded state are treated as open
    pub fn is_open(&self) -> bool {
        self.state.is_empty() || self.state.eq_ignore_ascii_case("open")
    }
}

/// Append-only record of which source touched a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEntry {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    pub fields: Vec<String>,
}

/// A discovered device, unique per (network, address)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: Uuid,
    pub network_id: String,
    pub address: String,
    pub hostname: Option<String>,
    pub mac_address: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub status: NodeStatus,
    pub device_type: DeviceType,
    pub services: Vec<ServiceRecord>,
    /// Open attribute bag: vulnerabilities, interfaces, notes and mapped extras
    pub attributes: serde_json::Map<String, serde_json::Value>,
    pub provenance: Vec<ProvenanceEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NetworkNode {
    /// Empty node with default classification, ready for a first upsert
    pub fn new(network_id: &str, address: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            network_id: network_id.to_string(),
            address: address.to_string(),
            hostname: None,
            mac_address: None,
            os_name: None,
            os_version: None,
            status: NodeStatus::default(),
            device_type: DeviceType::default(),
            services: Vec::new(),
            attributes: serde_json::Map::new(),
            provenance: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_open_port(&self, port: u16) -> bool {
        self.services.iter().any(|s| s.port == port && s.is_open())
    }
}

/// Incoming facts about a node; `None` fields are left untouched on merge
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NodeUpsert {
    pub address: String,
    pub hostname: Option<String>,
    pub mac_address: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub status: Option<NodeStatus>,
    pub device_type: Option<DeviceType>,
    /// `Some` replaces the stored service list wholesale
    pub services: Option<Vec<ServiceRecord>>,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl NodeUpsert {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: NodeStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_device_type(mut self, device_type: DeviceType) -> Self {
        self.device_type = Some(device_type);
        self
    }

    pub fn with_services(mut self, services: Vec<ServiceRecord>) -> Self {
        self.services = Some(services);
        self
    }
}

/// Relationship kind between two nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    #[default]
    Adjacency,
    Pivot,
    Callback,
    LateralMovement,
    Tunnel,
    PortForward,
}

/// Where an edge came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeSource {
    #[default]
    Import,
    Scan,
    LiveActivity,
    Manual,
}

/// A directed relationship, unique per (network, source, target)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkEdge {
    pub id: Uuid,
    pub network_id: String,
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub kind: EdgeKind,
    pub label: Option<String>,
    pub confidence: f64,
    pub source: EdgeSource,
    pub created_at: DateTime<Utc>,
}

/// Edge creation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEdge {
    pub source_id: Uuid,
    pub target_id: Uuid,
    pub kind: EdgeKind,
    pub label: Option<String>,
    pub confidence: f64,
    pub source: EdgeSource,
}

impl NewEdge {
    pub fn new(source_id: Uuid, target_id: Uuid, confidence: f64) -> Self {
        Self {
            source_id,
            target_id,
            kind: EdgeKind::default(),
            label: None,
            confidence: confidence.clamp(0.0, 1.0),
            source: EdgeSource::default(),
        }
    }

    pub fn with_kind(mut self, kind: EdgeKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_source(mut self, source: EdgeSource) -> Self {
        self.source = source;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_detection() {
        assert!(is_placeholder(""));
        assert!(is_placeholder("  Unknown "));
        assert!(is_placeholder("*"));
        assert!(!is_placeholder("web01"));
    }

    #[test]
    fn test_device_type_parsing() {
        assert_eq!("Router".parse::<DeviceType>().unwrap(), DeviceType::Router);
        assert_eq!("access-point".parse::<DeviceType>().unwrap(), DeviceType::AccessPoint);
        assert!("toaster".parse::<DeviceType>().is_err());
        assert!(DeviceType::Firewall.is_gateway());
        assert!(!DeviceType::Server.is_gateway());
    }

    #[test]
    fn test_status_accepts_scanner_vocabulary() {
        assert_eq!("up".parse::<NodeStatus>().unwrap(), NodeStatus::Alive);
        assert_eq!("down".parse::<NodeStatus>().unwrap(), NodeStatus::Offline);
    }

    #[test]
    fn test_edge_confidence_is_clamped() {
        let edge = NewEdge::new(Uuid::new_v4(), Uuid::new_v4(), 1.7);
        assert_eq!(edge.confidence, 1.0);
    }

    #[test]
    fn test_device_type_serde_names() {
        let json = serde_json::to_string(&DeviceType::AccessPoint).unwrap();
        assert_eq!(json, "\"access_point\"");
    }
}
