//! Built-in definition for nmap XML output
//!
//! Used when an nmap document arrives and no markup definition is registered
//! as the default. It runs through the same interpreter as any stored
//! definition.

use crate::mapping::SERVICES_TARGET;
use scanweave_core::definition::{
    EdgeGenerationConfig, EdgeMapping, FieldMapping, Grammar, MatchOperator, NodeTypeRule, ParserDefinition,
    SkipCondition, Transform,
};
use scanweave_core::model::{DeviceType, EdgeKind};

pub const BUILTIN_NMAP_ID: &str = "builtin-nmap-xml";

const LEGACY_MARKER: &[u8] = b"<nmaprun";
const LEGACY_WINDOW: usize = 8192;

/// Whether a markup payload is nmap output
pub fn is_legacy_markup(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(LEGACY_WINDOW)];
    window.windows(LEGACY_MARKER.len()).any(|w| w == LEGACY_MARKER)
}

/// The nmap definition
pub fn nmap_definition() -> ParserDefinition {
    let mut definition = ParserDefinition::new(BUILTIN_NMAP_ID, Grammar::Markup);
    definition.name = "nmap XML (built-in)".to_string();
    definition.root_path = Some("nmaprun.host".to_string());

    definition.skip_conditions = vec![SkipCondition {
        field: "status".to_string(),
        operator: MatchOperator::NotEquals,
        value: "up".to_string(),
    }];

    definition.field_mappings = vec![
        FieldMapping::new("address@addr", "ip_address").with_filter("@addrtype", MatchOperator::Equals, "ipv4"),
        FieldMapping::new("address@addr", "ip_address").with_filter("@addrtype", MatchOperator::Equals, "ipv6"),
        FieldMapping::new("address@addr", "mac_address").with_filter("@addrtype", MatchOperator::Equals, "mac"),
        FieldMapping::new("address@vendor", "mac_vendor").with_filter("@addrtype", MatchOperator::Equals, "mac"),
        FieldMapping::new("hostnames.hostname@name", "hostname"),
        FieldMapping::new("status@state", "status").with_transform(Transform::Lowercase),
        FieldMapping::new("os.osmatch@name", "os_name"),
        FieldMapping::new("os.osmatch.osclass@osgen", "os_version"),
        FieldMapping::new("os.osmatch.osclass@type", "os_type").with_transform(Transform::Lowercase),
        FieldMapping::new("ports.port", SERVICES_TARGET)
            .with_filter("state@state", MatchOperator::Equals, "open")
            .with_sub_mappings(service_columns()),
        FieldMapping::new("hostscript.script", "vulnerabilities")
            .with_filter("@id", MatchOperator::Contains, "vuln")
            .with_sub_mappings(script_columns()),
        FieldMapping::new("ports.port.script", "vulnerabilities")
            .with_filter("@id", MatchOperator::Contains, "vuln")
            .with_sub_mappings(script_columns()),
    ];

    definition.edge_mappings = vec![EdgeMapping {
        source: "trace.hop".to_string(),
        address: "@ipaddr".to_string(),
        order: Some("@ttl".to_string()),
        hop_type: Some(DeviceType::Router),
        kind: EdgeKind::Adjacency,
        confidence: None,
        label: Some("traceroute".to_string()),
        include_target: true,
    }];

    definition.node_type_rules = classification_cascade();
    definition.edge_generation = Some(EdgeGenerationConfig::Subnet);
    definition
}

fn service_columns() -> Vec<FieldMapping> {
    vec![
        FieldMapping::new("@portid", "port").with_transform(Transform::Int),
        FieldMapping::new("@protocol", "protocol"),
        FieldMapping::new("state@state", "state"),
        FieldMapping::new("service@name", "service"),
        FieldMapping::new("service@product", "product"),
        FieldMapping::new("service@version", "version"),
    ]
}

fn script_columns() -> Vec<FieldMapping> {
    vec![FieldMapping::new("@id", "id"), FieldMapping::new("@output", "output")]
}

/// Most specific signals first: routing protocols outrank everything else
fn classification_cascade() -> Vec<NodeTypeRule> {
    use DeviceType::*;

    vec![
        NodeTypeRule::port_open(179, Router),
        NodeTypeRule::port_open(520, Router),
        NodeTypeRule::service_running("bgp", Router),
        NodeTypeRule::field_contains("os_type", "router", Router),
        NodeTypeRule::field_contains("os_type", "firewall", Firewall),
        NodeTypeRule::field_contains("os_name", "pfsense", Firewall),
        NodeTypeRule::field_contains("os_name", "fortios", Firewall),
        NodeTypeRule::port_open(500, Vpn),
        NodeTypeRule::port_open(1194, Vpn),
        NodeTypeRule::port_open(1723, Vpn),
        NodeTypeRule::port_open(9100, Printer),
        NodeTypeRule::port_open(631, Printer),
        NodeTypeRule::field_contains("os_type", "printer", Printer),
        NodeTypeRule::field_contains("os_type", "switch", Switch),
        NodeTypeRule::field_contains("os_type", "wap", AccessPoint),
        NodeTypeRule::port_open(1883, Iot),
        NodeTypeRule::field_contains("os_type", "webcam", Iot),
        NodeTypeRule::service_running("ms-wbt-server", Workstation),
        NodeTypeRule::port_open(5900, Workstation),
        NodeTypeRule::port_open(22, Server),
        NodeTypeRule::port_open(80, Server),
        NodeTypeRule::port_open(443, Server),
        NodeTypeRule::port_open(445, Server),
        NodeTypeRule::port_open(3306, Server),
        NodeTypeRule::port_open(5432, Server),
    ]
}
