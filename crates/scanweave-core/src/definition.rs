//! Declarative parser definitions
//!
//! A definition describes how one source grammar's records turn into node and
//! edge field values. Definitions are JSON documents deserialized once into the
//! typed structures below; rule kinds the engine does not know deserialize to
//! an `Unsupported` variant that never matches.

use crate::model::{DeviceType, EdgeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Source grammar of an uploaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Grammar {
    /// Tag/attribute markup
    #[serde(rename = "xml")]
    Markup,
    /// Nested object/array notation
    #[serde(rename = "json")]
    Object,
    /// Delimited rows with a configurable separator
    #[serde(rename = "csv")]
    Delimited,
}

impl Grammar {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grammar::Markup => "xml",
            Grammar::Object => "json",
            Grammar::Delimited => "csv",
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "xml" | "markup" => Ok(Grammar::Markup),
            "json" | "object" => Ok(Grammar::Object),
            "csv" | "delimited" | "tsv" => Ok(Grammar::Delimited),
            other => Err(format!("unknown grammar: {}", other)),
        }
    }
}

/// String comparison used by skip conditions and filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOperator {
    Equals,
    NotEquals,
    Contains,
    #[serde(other)]
    Unsupported,
}

impl MatchOperator {
    /// Case-insensitive comparison of an extracted value against a rule value
    pub fn matches(&self, actual: &str, expected: &str) -> bool {
        let actual = actual.trim().to_lowercase();
        let expected = expected.trim().to_lowercase();
        match self {
            MatchOperator::Equals => actual == expected,
            MatchOperator::NotEquals => actual != expected,
            MatchOperator::Contains => actual.contains(&expected),
            MatchOperator::Unsupported => false,
        }
    }
}

/// Drops a candidate record when its extracted field matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipCondition {
    pub field: String,
    pub operator: MatchOperator,
    pub value: String,
}

/// Restricts which matched element a mapping uses
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldFilter {
    /// Path relative to the candidate element, e.g. `@addrtype`
    pub field: String,
    pub operator: MatchOperator,
    pub value: String,
}

/// Value transform applied after defaulting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    #[serde(alias = "integer", alias = "to_int")]
    Int,
    #[serde(alias = "to_float")]
    Float,
    #[serde(alias = "lower")]
    Lowercase,
    #[serde(alias = "upper")]
    Uppercase,
    Trim,
    #[serde(other)]
    Unsupported,
}

/// One rule producing one target field, or one repeated sub-structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub filter: Option<FieldFilter>,
    #[serde(default)]
    pub transform: Option<Transform>,
    #[serde(default)]
    pub default: Option<String>,
    /// Non-empty when the target is a list of flat objects
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_mappings: Vec<FieldMapping>,
}

impl FieldMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            filter: None,
            transform: None,
            default: None,
            sub_mappings: Vec::new(),
        }
    }

    pub fn with_filter(mut self, field: &str, operator: MatchOperator, value: &str) -> Self {
        self.filter = Some(FieldFilter {
            field: field.to_string(),
            operator,
            value: value.to_string(),
        });
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_sub_mappings(mut self, sub_mappings: Vec<FieldMapping>) -> Self {
        self.sub_mappings = sub_mappings;
        self
    }

    pub fn is_repeated(&self) -> bool {
        !self.sub_mappings.is_empty()
    }
}

fn default_hop_type() -> Option<DeviceType> {
    Some(DeviceType::Router)
}

fn default_true() -> bool {
    true
}

/// Sequence-derived edges, e.g. traceroute hops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeMapping {
    /// Path to the ordered hop elements
    pub source: String,
    /// Path to the hop address, relative to each hop element
    pub address: String,
    /// Optional numeric sort key relative to each hop element
    #[serde(default)]
    pub order: Option<String>,
    /// Type assigned to hop nodes that do not exist yet
    #[serde(default = "default_hop_type")]
    pub hop_type: Option<DeviceType>,
    #[serde(default)]
    pub kind: EdgeKind,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    /// Close the chain at the record's own address when the last hop differs
    #[serde(default = "default_true")]
    pub include_target: bool,
}

/// Operators for device classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOperator {
    Equals,
    Contains,
    PortOpen,
    ServiceRunning,
    #[serde(other)]
    Unsupported,
}

/// Ordered classification rule; first match wins
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeTypeRule {
    #[serde(default)]
    pub field: String,
    pub operator: RuleOperator,
    pub value: String,
    #[serde(alias = "type")]
    pub device_type: DeviceType,
}

impl NodeTypeRule {
    pub fn port_open(port: u16, device_type: DeviceType) -> Self {
        Self {
            field: String::new(),
            operator: RuleOperator::PortOpen,
            value: port.to_string(),
            device_type,
        }
    }

    pub fn service_running(service: &str, device_type: DeviceType) -> Self {
        Self {
            field: String::new(),
            operator: RuleOperator::ServiceRunning,
            value: service.to_string(),
            device_type,
        }
    }

    pub fn field_contains(field: &str, value: &str, device_type: DeviceType) -> Self {
        Self {
            field: field.to_string(),
            operator: RuleOperator::Contains,
            value: value.to_string(),
            device_type,
        }
    }
}

/// Post-pass edge synthesis strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum EdgeGenerationConfig {
    /// Group nodes by the network's configured address ranges
    Subnet,
    /// One edge per record between two extracted address fields
    ConnectionPairs {
        source_field: String,
        target_field: String,
        #[serde(default)]
        kind: EdgeKind,
        #[serde(default)]
        confidence: Option<f64>,
        #[serde(default)]
        label: Option<String>,
    },
}

fn default_delimiter() -> char {
    ','
}

fn default_comment_prefix() -> String {
    "#".to_string()
}

/// Row parsing options for delimited documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelimitedOptions {
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Explicit header line; when absent the first remaining row is the header
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default = "default_comment_prefix")]
    pub comment_prefix: String,
}

impl Default for DelimitedOptions {
    fn default() -> Self {
        Self {
            delimiter: default_delimiter(),
            header: None,
            comment_prefix: default_comment_prefix(),
        }
    }
}

/// A complete parser definition, immutable for the duration of an import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParserDefinition {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub grammar: Grammar,
    /// Flagged as the default definition for its grammar
    #[serde(default)]
    pub is_default: bool,
    /// Locates candidate host records; the document root when absent
    #[serde(default)]
    pub root_path: Option<String>,
    #[serde(default)]
    pub delimited: DelimitedOptions,
    #[serde(default)]
    pub skip_conditions: Vec<SkipCondition>,
    #[serde(default)]
    pub field_mappings: Vec<FieldMapping>,
    #[serde(default)]
    pub edge_mappings: Vec<EdgeMapping>,
    #[serde(default)]
    pub node_type_rules: Vec<NodeTypeRule>,
    #[serde(default)]
    pub edge_generation: Option<EdgeGenerationConfig>,
}

impl ParserDefinition {
    pub fn new(id: impl Into<String>, grammar: Grammar) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            grammar,
            is_default: false,
            root_path: None,
            delimited: DelimitedOptions::default(),
            skip_conditions: Vec::new(),
            field_mappings: Vec::new(),
            edge_mappings: Vec::new(),
            node_type_rules: Vec::new(),
            edge_generation: None,
        }
    }

    /// Parse a definition from its JSON form
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
