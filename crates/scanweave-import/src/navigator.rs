//! Path navigation and value extraction over normalized trees
//!
//! Paths are dot-separated (`addresses.address`) with an optional trailing
//! attribute reference (`addresses.address@type`, `@addr`). A segment that
//! matches several children fans out before the next segment is applied.
//! Missing matches produce no values rather than an error.

use crate::delimited::DelimitedRow;
use crate::markup::XmlElement;
use scanweave_core::definition::{FieldFilter, MatchOperator};
use serde_json::Value;

/// A parsed source path
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourcePath {
    pub segments: Vec<String>,
    pub attribute: Option<String>,
}

impl SourcePath {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        let raw = raw.strip_prefix('$').unwrap_or(raw);
        let (path, attribute) = match raw.split_once('@') {
            Some((path, attribute)) => (path, Some(attribute.trim())),
            None => (raw, None),
        };

        Self {
            segments: path
                .split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            attribute: attribute.filter(|a| !a.is_empty()).map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.attribute.is_none()
    }
}

/// Uniform navigation over the per-grammar tree types
pub trait Navigable: Sized {
    /// Nodes reached from this one by a single path segment
    fn children(&self, name: &str) -> Vec<&Self>;

    /// Scalar value of this node, or of one of its attributes
    fn scalar(&self, attribute: Option<&str>) -> Option<String>;

    /// Nodes reached by a sequence of segments, fanning out at every level
    fn select(&self, segments: &[String]) -> Vec<&Self> {
        let mut current: Vec<&Self> = vec![self];
        for segment in segments {
            current = current.into_iter().flat_map(|node| node.children(segment)).collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// Candidate nodes for a path and the attribute to read from each
    fn resolve<'a>(&'a self, path: &SourcePath) -> (Vec<&'a Self>, Option<String>) {
        (self.select(&path.segments), path.attribute.clone())
    }

    /// Every scalar value at a path
    fn extract(&self, path: &SourcePath) -> Vec<String> {
        let (nodes, attribute) = self.resolve(path);
        nodes
            .into_iter()
            .filter_map(|node| node.scalar(attribute.as_deref()))
            .collect()
    }

    /// Check a filter against the values found at the filter's path
    fn matches_filter(&self, filter: &FieldFilter) -> bool {
        let values = self.extract(&SourcePath::parse(&filter.field));
        match filter.operator {
            MatchOperator::NotEquals => values
                .iter()
                .all(|v| MatchOperator::NotEquals.matches(v, &filter.value)),
            operator => values.iter().any(|v| operator.matches(v, &filter.value)),
        }
    }
}

impl Navigable for XmlElement {
    fn children(&self, name: &str) -> Vec<&Self> {
        self.children.iter().filter(|c| c.name == name).collect()
    }

    fn scalar(&self, attribute: Option<&str>) -> Option<String> {
        match attribute {
            Some(name) => self.attributes.get(name).cloned(),
            None if self.text.is_empty() => None,
            None => Some(self.text.clone()),
        }
    }
}

impl Navigable for Value {
    fn children(&self, name: &str) -> Vec<&Self> {
        match self {
            Value::Object(map) => match map.get(name) {
                Some(Value::Array(items)) => items.iter().collect(),
                Some(value) => vec![value],
                None => Vec::new(),
            },
            Value::Array(items) => items.iter().flat_map(|item| item.children(name)).collect(),
            _ => Vec::new(),
        }
    }

    fn scalar(&self, attribute: Option<&str>) -> Option<String> {
        let target = match attribute {
            // object notation has no attributes; `@key` reads a member
            Some(name) => self.get(name)?,
            None => self,
        };
        value_to_text(target)
    }
}

impl Navigable for DelimitedRow {
    fn children(&self, _name: &str) -> Vec<&Self> {
        Vec::new()
    }

    fn scalar(&self, attribute: Option<&str>) -> Option<String> {
        attribute.and_then(|column| self.get(column)).map(str::to_string)
    }

    /// A row is flat: the whole path names one column
    fn resolve<'a>(&'a self, path: &SourcePath) -> (Vec<&'a Self>, Option<String>) {
        let column = match &path.attribute {
            Some(attribute) => attribute.clone(),
            None => path.segments.join("."),
        };
        if column.is_empty() {
            return (vec![self], None);
        }
        (vec![self], Some(column))
    }
}

/// Text form of a scalar value; containers and null have none
pub fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
