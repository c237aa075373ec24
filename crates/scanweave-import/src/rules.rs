//! Skip and classification rule evaluation

use crate::mapping::ExtractedRecord;
use crate::navigator::{Navigable, SourcePath};
use scanweave_core::definition::{MatchOperator, NodeTypeRule, RuleOperator, SkipCondition};
use scanweave_core::model::{DeviceType, ServiceRecord};

/// Values a rule field refers to: an extracted target field when one exists
/// under that name, otherwise a path into the raw record
fn field_values<N: Navigable>(record: &N, extracted: &ExtractedRecord, field: &str) -> Vec<String> {
    if let Some(text) = extracted.text(field) {
        return vec![text];
    }
    record.extract(&SourcePath::parse(field))
}

/// First skip condition the record matches, if any
pub fn should_skip<'a, N: Navigable>(
    record: &N,
    extracted: &ExtractedRecord,
    conditions: &'a [SkipCondition],
) -> Option<&'a SkipCondition> {
    conditions.iter().find(|condition| {
        let values = field_values(record, extracted, &condition.field);
        if values.is_empty() {
            // an absent field compares as the empty string
            return condition.operator.matches("", &condition.value);
        }
        values.iter().any(|v| condition.operator.matches(v, &condition.value))
    })
}

/// Evaluate classification rules in order; the first satisfied rule wins
pub fn classify<N: Navigable>(
    record: &N,
    extracted: &ExtractedRecord,
    services: &[ServiceRecord],
    rules: &[NodeTypeRule],
) -> Option<DeviceType> {
    rules
        .iter()
        .find(|rule| rule_matches(record, extracted, services, rule))
        .map(|rule| rule.device_type)
}

fn rule_matches<N: Navigable>(
    record: &N,
    extracted: &ExtractedRecord,
    services: &[ServiceRecord],
    rule: &NodeTypeRule,
) -> bool {
    match rule.operator {
        RuleOperator::Equals => field_values(record, extracted, &rule.field)
            .iter()
            .any(|v| MatchOperator::Equals.matches(v, &rule.value)),
        RuleOperator::Contains => field_values(record, extracted, &rule.field)
            .iter()
            .any(|v| MatchOperator::Contains.matches(v, &rule.value)),
        RuleOperator::PortOpen => match rule.value.trim().parse::<u16>() {
            Ok(port) => services.iter().any(|s| s.port == port && s.is_open()),
            Err(_) => false,
        },
        RuleOperator::ServiceRunning => {
            let wanted = rule.value.trim();
            !wanted.is_empty()
                && services
                    .iter()
                    .any(|s| s.is_open() && s.service.trim().eq_ignore_ascii_case(wanted))
        }
        RuleOperator::Unsupported => false,
    }
}
