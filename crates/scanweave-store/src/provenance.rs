//! Merge-upsert semantics and provenance trail

use chrono::{DateTime, Utc};
use scanweave_core::model::{is_placeholder, DeviceType, NetworkNode, NodeUpsert, ProvenanceEntry};

/// Attribute key reserved for the provenance trail; incoming values are ignored
pub const PROVENANCE_KEY: &str = "provenance";

/// Merge incoming facts into a node and append one provenance entry.
///
/// Non-empty values overwrite stored ones unless they are an "unknown"
/// placeholder. A `Some` service list replaces the stored list. Attributes are
/// merged key by key. Returns the top-level fields that were written.
pub fn apply_upsert(
    node: &mut NetworkNode,
    upsert: NodeUpsert,
    source: &str,
    is_new: bool,
    now: DateTime<Utc>,
) -> Vec<String> {
    let mut touched = Vec::new();

    merge_text(&mut node.hostname, upsert.hostname, "hostname", &mut touched);
    merge_text(&mut node.mac_address, upsert.mac_address, "mac_address", &mut touched);
    merge_text(&mut node.os_name, upsert.os_name, "os_name", &mut touched);
    merge_text(&mut node.os_version, upsert.os_version, "os_version", &mut touched);

    if let Some(status) = upsert.status {
        node.status = status;
        touched.push("status".to_string());
    }

    if let Some(device_type) = upsert.device_type {
        // an "unknown" label only sticks on a node nobody has classified yet
        if device_type != DeviceType::Unknown || is_new {
            node.device_type = device_type;
            touched.push("device_type".to_string());
        }
    }

    if let Some(services) = upsert.services {
        node.services = services;
        touched.push("services".to_string());
    }

    for (key, value) in upsert.attributes {
        if key == PROVENANCE_KEY || value.is_null() {
            continue;
        }
        if let Some(text) = value.as_str() {
            if is_placeholder(text) {
                continue;
            }
        }
        node.attributes.insert(key.clone(), value);
        touched.push(key);
    }

    node.provenance.push(ProvenanceEntry {
        source: source.to_string(),
        timestamp: now,
        fields: touched.clone(),
    });
    node.updated_at = now;

    touched
}

fn merge_text(slot: &mut Option<String>, incoming: Option<String>, name: &str, touched: &mut Vec<String>) {
    if let Some(value) = incoming {
        if !is_placeholder(&value) {
            *slot = Some(value.trim().to_string());
            touched.push(name.to_string());
        }
    }
}
