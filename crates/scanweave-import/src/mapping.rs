//! Field-mapping interpreter
//!
//! Applies a definition's ordered field mappings to one candidate record,
//! producing scalar fields, repeated sub-object lists and ordered trace hop
//! sequences. Nothing here fails: an unresolvable path is an empty extraction
//! and a bad numeric value degrades to zero.

use crate::navigator::{value_to_text, Navigable, SourcePath};
use scanweave_core::definition::{EdgeMapping, FieldMapping, Transform};
use scanweave_core::model::{is_placeholder, DeviceType, NodeStatus, NodeUpsert, ServiceRecord};
use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;

/// Target names that carry the node address, in lookup order
pub const ADDRESS_TARGETS: &[&str] = &["ip_address", "address", "ip"];

/// Target name of the service table
pub const SERVICES_TARGET: &str = "services";

/// Ordered hop addresses from one edge mapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TraceSequence {
    /// Index of the edge mapping within the definition
    pub mapping_index: usize,
    /// Hop addresses in sequence order; empty for a hop with no address
    pub hops: Vec<String>,
}

/// Everything extracted from one candidate record
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractedRecord {
    pub fields: BTreeMap<String, Value>,
    pub lists: BTreeMap<String, Vec<Map<String, Value>>>,
    pub traces: Vec<TraceSequence>,
    /// Set by the rule evaluator
    pub classified: Option<DeviceType>,
}

impl ExtractedRecord {
    /// Text form of a scalar field
    pub fn text(&self, field: &str) -> Option<String> {
        self.fields.get(field).and_then(value_to_text)
    }

    /// The record's address, if it has a usable one
    pub fn address(&self) -> Option<String> {
        ADDRESS_TARGETS
            .iter()
            .filter_map(|target| self.text(target))
            .map(|a| a.trim().to_string())
            .find(|a| !is_placeholder(a))
    }

    /// Services built from the service table, entries without a valid port dropped
    pub fn services(&self) -> Option<Vec<ServiceRecord>> {
        self.lists
            .get(SERVICES_TARGET)
            .map(|rows| rows.iter().filter_map(service_from_row).collect())
    }

    /// Convert into a node upsert; `None` when the record has no usable address
    pub fn to_upsert(&self) -> Option<NodeUpsert> {
        let mut upsert = NodeUpsert::new(self.address()?);

        for (target, value) in &self.fields {
            let text = value_to_text(value);
            let informative = text.as_deref().filter(|t| !is_placeholder(t));
            match target.as_str() {
                t if ADDRESS_TARGETS.contains(&t) => {}
                "hostname" | "host_name" => upsert.hostname = text,
                "mac_address" | "mac" => upsert.mac_address = text,
                "os_name" | "os" => upsert.os_name = text,
                "os_version" => upsert.os_version = text,
                "status" | "state" => match informative.map(str::parse::<NodeStatus>) {
                    Some(Ok(status)) => upsert.status = Some(status),
                    Some(Err(_)) => {
                        upsert.attributes.insert(target.clone(), value.clone());
                    }
                    None => {}
                },
                "device_type" | "type" => {
                    if informative.is_some_and(|t| t.parse::<DeviceType>().is_err()) {
                        upsert.attributes.insert(target.clone(), value.clone());
                    }
                }
                _ => {
                    upsert.attributes.insert(target.clone(), value.clone());
                }
            }
        }

        upsert.device_type = Some(self.device_type());
        upsert.services = self.services();

        for (target, rows) in &self.lists {
            if target != SERVICES_TARGET && !rows.is_empty() {
                let items = rows.iter().cloned().map(Value::Object).collect();
                upsert.attributes.insert(target.clone(), Value::Array(items));
            }
        }

        Some(upsert)
    }

    /// Rule classification first, then a mapped type field, then host
    pub fn device_type(&self) -> DeviceType {
        if let Some(device_type) = self.classified {
            return device_type;
        }
        ["device_type", "type"]
            .iter()
            .filter_map(|field| self.text(field))
            .find_map(|text| text.parse::<DeviceType>().ok())
            .unwrap_or_default()
    }
}

/// Run every field and edge mapping of a definition against one record
pub fn extract_record<N: Navigable>(
    record: &N,
    field_mappings: &[FieldMapping],
    edge_mappings: &[EdgeMapping],
) -> ExtractedRecord {
    let mut extracted = ExtractedRecord::default();

    for mapping in field_mappings {
        if mapping.is_repeated() {
            let rows = extract_list(record, mapping);
            extracted.lists.entry(mapping.target.clone()).or_default().extend(rows);
        } else if let Some(value) = extract_scalar(record, mapping) {
            // first mapping to produce a value for a target wins
            extracted.fields.entry(mapping.target.clone()).or_insert(value);
        }
    }

    for (mapping_index, mapping) in edge_mappings.iter().enumerate() {
        let hops = extract_trace(record, mapping);
        if !hops.is_empty() {
            extracted.traces.push(TraceSequence { mapping_index, hops });
        }
    }

    extracted
}

/// Candidates at the mapping's path that pass its filter
fn candidates<'a, N: Navigable>(record: &'a N, mapping: &FieldMapping) -> (Vec<&'a N>, Option<String>) {
    let (nodes, attribute) = record.resolve(&SourcePath::parse(&mapping.source));
    let nodes = match &mapping.filter {
        Some(filter) => nodes.into_iter().filter(|n| n.matches_filter(filter)).collect(),
        None => nodes,
    };
    (nodes, attribute)
}

/// Extract, filter, default, then transform one scalar field
pub fn extract_scalar<N: Navigable>(record: &N, mapping: &FieldMapping) -> Option<Value> {
    let (nodes, attribute) = candidates(record, mapping);
    let raw = nodes
        .into_iter()
        .filter_map(|node| node.scalar(attribute.as_deref()))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .or_else(|| mapping.default.clone())?;

    Some(apply_transform(&raw, mapping.transform))
}

fn extract_list<N: Navigable>(record: &N, mapping: &FieldMapping) -> Vec<Map<String, Value>> {
    let (items, _) = candidates(record, mapping);
    items
        .into_iter()
        .map(|item| map_object(item, &mapping.sub_mappings))
        .filter(|row| !row.is_empty())
        .collect()
}

/// Build one flat object from sub-mappings; nested repeated mappings become arrays
fn map_object<N: Navigable>(item: &N, mappings: &[FieldMapping]) -> Map<String, Value> {
    let mut row = Map::new();
    for mapping in mappings {
        if mapping.is_repeated() {
            let nested = extract_list(item, mapping);
            if !nested.is_empty() {
                row.insert(
                    mapping.target.clone(),
                    Value::Array(nested.into_iter().map(Value::Object).collect()),
                );
            }
        } else if let Some(value) = extract_scalar(item, mapping) {
            row.entry(mapping.target.clone()).or_insert(value);
        }
    }
    row
}

fn extract_trace<N: Navigable>(record: &N, mapping: &EdgeMapping) -> Vec<String> {
    let (hops, _) = record.resolve(&SourcePath::parse(&mapping.source));
    let address_path = SourcePath::parse(&mapping.address);
    let order_path = mapping.order.as_deref().map(SourcePath::parse);

    let mut keyed: Vec<(Option<f64>, String)> = hops
        .into_iter()
        .map(|hop| {
            let address = hop
                .extract(&address_path)
                .into_iter()
                .map(|a| a.trim().to_string())
                .find(|a| !a.is_empty())
                .unwrap_or_default();
            let order = order_path
                .as_ref()
                .and_then(|path| hop.extract(path).into_iter().find_map(|o| o.trim().parse::<f64>().ok()));
            (order, address)
        })
        .collect();

    if order_path.is_some() {
        // stable: hops without an order key keep document order after the keyed ones
        keyed.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) => a.total_cmp(b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
    }

    keyed.into_iter().map(|(_, address)| address).collect()
}

/// Apply a value transform; numeric failures degrade to zero
pub fn apply_transform(raw: &str, transform: Option<Transform>) -> Value {
    match transform {
        Some(Transform::Int) => {
            let trimmed = raw.trim();
            let parsed = trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i64));
            Value::Number(Number::from(parsed.unwrap_or(0)))
        }
        Some(Transform::Float) => {
            let parsed = raw.trim().parse::<f64>().unwrap_or(0.0);
            Number::from_f64(parsed)
                .map(Value::Number)
                .unwrap_or_else(|| Value::Number(Number::from(0)))
        }
        Some(Transform::Lowercase) => Value::String(raw.to_lowercase()),
        Some(Transform::Uppercase) => Value::String(raw.to_uppercase()),
        Some(Transform::Trim) => Value::String(raw.trim().to_string()),
        Some(Transform::Unsupported) | None => Value::String(raw.to_string()),
    }
}

fn service_from_row(row: &Map<String, Value>) -> Option<ServiceRecord> {
    let text = |keys: &[&str]| {
        keys.iter()
            .filter_map(|key| row.get(*key).and_then(value_to_text))
            .find(|v| !v.trim().is_empty())
            .unwrap_or_default()
    };

    let port = row.get("port").and_then(|value| match value {
        Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
        Value::String(s) => s.trim().parse::<u16>().ok(),
        _ => None,
    })
    .filter(|port| *port != 0)?;

    Some(ServiceRecord {
        port,
        protocol: text(&["protocol", "proto"]),
        state: text(&["state"]),
        service: text(&["service", "name", "service_name"]),
        product: text(&["product"]),
        version: text(&["version"]),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_then_transform() {
        let record = json!({"ip": "10.0.0.1", "ttl": "x"});
        let mapping = FieldMapping::new("missing", "os_name").with_default("Linux").with_transform(Transform::Uppercase);
        assert_eq!(extract_scalar(&record, &mapping), Some(json!("LINUX")));

        let mapping = FieldMapping::new("ttl", "ttl").with_transform(Transform::Int);
        assert_eq!(extract_scalar(&record, &mapping), Some(json!(0)));

        assert_eq!(extract_scalar(&record, &FieldMapping::new("missing", "x")), None);
    }

    #[test]
    fn test_numeric_transforms() {
        assert_eq!(apply_transform(" 443 ", Some(Transform::Int)), json!(443));
        assert_eq!(apply_transform("12.9", Some(Transform::Int)), json!(12));
        assert_eq!(apply_transform("7.5", Some(Transform::Float)), json!(7.5));
        assert_eq!(apply_transform("nan-ish", Some(Transform::Float)), json!(0.0));
        assert_eq!(apply_transform("Mixed", Some(Transform::Lowercase)), json!("mixed"));
    }

    #[test]
    fn test_repeated_mapping_builds_rows() {
        let record = json!({
            "ip": "10.0.0.1",
            "ports": [
                {"port": 22, "proto": "tcp", "service": {"name": "ssh"}},
                {"port": "80", "proto": "tcp"},
                {"proto": "udp"}
            ]
        });
        let mapping = FieldMapping::new("ports", SERVICES_TARGET).with_sub_mappings(vec![
            FieldMapping::new("port", "port").with_transform(Transform::Int),
            FieldMapping::new("proto", "protocol"),
            FieldMapping::new("service.name", "service"),
        ]);

        let extracted = extract_record(&record, &[FieldMapping::new("ip", "ip"), mapping], &[]);
        let services = extracted.services().unwrap();
        // the udp row has no port and is dropped
        assert_eq!(services.len(), 2);
        assert_eq!(services[0].service, "ssh");
        assert_eq!(services[0].protocol, "tcp");
        assert_eq!(services[1].port, 80);
        assert_eq!(extracted.lists[SERVICES_TARGET].len(), 3);
    }

    #[test]
    fn test_to_upsert_routes_known_targets() {
        let record = json!({
            "addr": "10.0.0.9",
            "name": "fw01",
            "state": "up",
            "site": "dc1",
            "kind": "firewall"
        });
        let mappings = vec![
            FieldMapping::new("addr", "ip_address"),
            FieldMapping::new("name", "hostname"),
            FieldMapping::new("state", "status"),
            FieldMapping::new("site", "site"),
            FieldMapping::new("kind", "device_type"),
        ];
        let upsert = extract_record(&record, &mappings, &[]).to_upsert().unwrap();

        assert_eq!(upsert.address, "10.0.0.9");
        assert_eq!(upsert.hostname.as_deref(), Some("fw01"));
        assert_eq!(upsert.status, Some(NodeStatus::Alive));
        assert_eq!(upsert.device_type, Some(DeviceType::Firewall));
        assert_eq!(upsert.attributes.get("site"), Some(&json!("dc1")));
        assert!(upsert.services.is_none());
    }

    #[test]
    fn test_unrecognized_state_and_type_land_in_attributes() {
        let record = json!({"ip": "10.0.0.4", "state": "open", "type": "camera", "role": "-"});
        let mappings = vec![
            FieldMapping::new("ip", "ip"),
            FieldMapping::new("state", "state"),
            FieldMapping::new("type", "type"),
            FieldMapping::new("role", "device_type"),
        ];
        let upsert = extract_record(&record, &mappings, &[]).to_upsert().unwrap();

        assert!(upsert.status.is_none());
        assert_eq!(upsert.device_type, Some(DeviceType::Host));
        assert_eq!(upsert.attributes.get("state"), Some(&json!("open")));
        assert_eq!(upsert.attributes.get("type"), Some(&json!("camera")));
        assert!(!upsert.attributes.contains_key("device_type"));
    }

    #[test]
    fn test_placeholder_address_is_not_usable() {
        let record = json!({"ip": "n/a"});
        let extracted = extract_record(&record, &[FieldMapping::new("ip", "ip")], &[]);
        assert!(extracted.to_upsert().is_none());
    }

    #[test]
    fn test_trace_hops_sorted_by_order_key() {
        let record = json!({
            "hops": [
                {"ttl": 3, "ip": "10.0.2.1"},
                {"ttl": 1, "ip": "192.168.1.1"},
                {"ttl": 2}
            ]
        });
        let mapping = EdgeMapping {
            source: "hops".to_string(),
            address: "ip".to_string(),
            order: Some("ttl".to_string()),
            hop_type: Some(DeviceType::Router),
            kind: Default::default(),
            confidence: None,
            label: None,
            include_target: true,
        };
        let extracted = extract_record(&record, &[], &[mapping]);
        assert_eq!(extracted.traces[0].hops, vec!["192.168.1.1", "", "10.0.2.1"]);
    }
}
