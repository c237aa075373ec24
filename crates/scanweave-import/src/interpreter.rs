//! Record location and per-record evaluation
//!
//! Splits a normalized document into candidate host records, then runs the
//! mapping interpreter and the rule evaluator over each one in document order.

use crate::mapping::{extract_record, ExtractedRecord};
use crate::navigator::{Navigable, SourcePath};
use crate::rules::{classify, should_skip};
use crate::tree::Document;
use scanweave_core::definition::{ParserDefinition, SkipCondition};
use serde_json::Value;
use tracing::debug;

/// Result of evaluating one candidate record
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// Dropped by a skip condition
    Skipped(SkipCondition),
    /// Mapped and classified, ready to persist
    Accepted(ExtractedRecord),
}

/// Evaluate every candidate record of a document against a definition
pub fn interpret(document: &Document, definition: &ParserDefinition) -> Vec<RecordOutcome> {
    let root_path = definition.root_path.as_deref().map(SourcePath::parse).unwrap_or_default();

    match document {
        Document::Markup(root) => {
            let mut segments = root_path.segments.as_slice();
            if segments.first().is_some_and(|first| *first == root.name) {
                segments = &segments[1..];
            }
            root.select(segments)
                .into_iter()
                .map(|record| evaluate(record, definition))
                .collect()
        }
        Document::Object(root) => object_records(root, &root_path)
            .into_iter()
            .map(|record| evaluate(record, definition))
            .collect(),
        Document::Delimited(table) => table.rows.iter().map(|row| evaluate(row, definition)).collect(),
    }
}

/// Records located by the root path; arrays contribute their items
fn object_records<'a>(root: &'a Value, root_path: &SourcePath) -> Vec<&'a Value> {
    root.select(&root_path.segments)
        .into_iter()
        .flat_map(|value| match value {
            Value::Array(items) => items.iter().collect(),
            other => vec![other],
        })
        .filter(|value| value.is_object())
        .collect()
}

fn evaluate<N: Navigable>(record: &N, definition: &ParserDefinition) -> RecordOutcome {
    let mut extracted = extract_record(record, &definition.field_mappings, &definition.edge_mappings);

    if let Some(condition) = should_skip(record, &extracted, &definition.skip_conditions) {
        debug!(field = %condition.field, value = %condition.value, "record skipped");
        return RecordOutcome::Skipped(condition.clone());
    }

    let services = extracted.services().unwrap_or_default();
    extracted.classified = classify(record, &extracted, &services, &definition.node_type_rules);
    RecordOutcome::Accepted(extracted)
}
