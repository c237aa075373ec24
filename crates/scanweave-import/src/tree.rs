//! Tree normalizer: raw bytes to a navigable in-memory structure

use crate::delimited::{parse_delimited, DelimitedTable};
use crate::error::NormalizeError;
use crate::limits::TreeLimits;
use crate::markup::{parse_markup, XmlElement};
use scanweave_core::definition::{DelimitedOptions, Grammar};
use serde_json::Value;

/// A normalized document, one variant per grammar
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Markup(XmlElement),
    /// Object notation uses its native value tree directly
    Object(Value),
    Delimited(DelimitedTable),
}

impl Document {
    pub fn grammar(&self) -> Grammar {
        match self {
            Document::Markup(_) => Grammar::Markup,
            Document::Object(_) => Grammar::Object,
            Document::Delimited(_) => Grammar::Delimited,
        }
    }
}

/// Normalize a whole document; any failure is terminal for the import
pub fn normalize(
    bytes: &[u8],
    grammar: Grammar,
    options: &DelimitedOptions,
    limits: &TreeLimits,
) -> Result<Document, NormalizeError> {
    match grammar {
        Grammar::Markup => parse_markup(bytes, limits).map(Document::Markup),
        Grammar::Object => parse_object(bytes, limits).map(Document::Object),
        Grammar::Delimited => parse_delimited(bytes, options, limits).map(Document::Delimited),
    }
}

/// Parse object notation and check it against the tree limits
pub fn parse_object(bytes: &[u8], limits: &TreeLimits) -> Result<Value, NormalizeError> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| NormalizeError::malformed(Grammar::Object, e))?;
    check_object_limits(&value, limits)?;
    Ok(value)
}

fn check_object_limits(root: &Value, limits: &TreeLimits) -> Result<(), NormalizeError> {
    let mut pending = vec![(root, 1usize)];
    let mut element_count = 0usize;

    while let Some((value, depth)) = pending.pop() {
        element_count += 1;
        if element_count > limits.max_elements {
            return Err(NormalizeError::ElementLimitExceeded {
                limit: limits.max_elements,
            });
        }
        if depth > limits.max_depth {
            return Err(NormalizeError::DepthExceeded { limit: limits.max_depth });
        }
        match value {
            Value::Array(items) => pending.extend(items.iter().map(|item| (item, depth + 1))),
            Value::Object(map) => pending.extend(map.values().map(|item| (item, depth + 1))),
            _ => {}
        }
    }

    Ok(())
}
