//! Engine configuration

use anyhow::{Context, Result};
use scanweave_core::model::DeviceType;
use scanweave_import::TreeLimits;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Import engine settings; every key is optional in the JSON form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Coarse payload ceiling checked before normalizing
    pub max_upload_bytes: usize,
    pub limits: TreeLimits,
    pub topology: TopologyConfig,
    /// Provenance source recorded on import writes
    pub source_tag: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: 50 * 1024 * 1024,
            limits: TreeLimits::default(),
            topology: TopologyConfig::default(),
            source_tag: "import".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid engine configuration")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read engine configuration from {}", path.display()))?;
        Self::from_json_str(&json)
    }
}

/// Confidence values and thresholds for the topology sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Edges observed directly in a path trace
    pub trace_confidence: f64,
    /// Edges from a subnet's router or firewall to its members
    pub hub_confidence: f64,
    /// Edges from the anonymous star heuristic
    pub star_confidence: f64,
    /// Hub-less groups at or above this size get no synthesized edges
    pub star_threshold: usize,
    /// Type for hop nodes when the edge mapping names none
    pub default_hop_type: DeviceType,
    /// Confidence for connection-pair edges when the definition names none
    pub pair_confidence: f64,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            trace_confidence: 0.95,
            hub_confidence: 0.7,
            star_confidence: 0.7,
            star_threshold: 6,
            default_hop_type: DeviceType::Router,
            pair_confidence: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"topology": {"star_threshold": 4}, "source_tag": "nightly"}"#).unwrap();
        assert_eq!(config.topology.star_threshold, 4);
        assert_eq!(config.topology.trace_confidence, 0.95);
        assert_eq!(config.source_tag, "nightly");
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert_eq!(config.limits, TreeLimits::default());
    }

    #[test]
    fn test_confidence_ordering() {
        let topology = TopologyConfig::default();
        assert!(topology.trace_confidence > topology.hub_confidence);
        assert_eq!(topology.hub_confidence, topology.star_confidence);
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        std::fs::write(&path, r#"{"max_upload_bytes": 1024}"#).unwrap();
        assert_eq!(EngineConfig::from_json_file(&path).unwrap().max_upload_bytes, 1024);
    }
}
