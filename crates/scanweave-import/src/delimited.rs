//! Delimited row normalization

use crate::error::NormalizeError;
use crate::limits::TreeLimits;
use scanweave_core::definition::{DelimitedOptions, Grammar};
use std::collections::HashMap;

/// One data row keyed by header name
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DelimitedRow {
    pub columns: HashMap<String, String>,
}

impl DelimitedRow {
    pub fn get(&self, column: &str) -> Option<&str> {
        self.columns.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DelimitedTable {
    pub headers: Vec<String>,
    pub rows: Vec<DelimitedRow>,
}

/// Strip comment and blank lines, then parse the remaining rows.
///
/// The header is either the configured header line or the first remaining row.
pub fn parse_delimited(
    bytes: &[u8],
    options: &DelimitedOptions,
    limits: &TreeLimits,
) -> Result<DelimitedTable, NormalizeError> {
    if !options.delimiter.is_ascii() {
        return Err(NormalizeError::InvalidOptions(format!(
            "delimiter '{}' is not a single-byte character",
            options.delimiter
        )));
    }

    let text = std::str::from_utf8(bytes).map_err(|e| NormalizeError::malformed(Grammar::Delimited, e))?;
    let comment_prefix = options.comment_prefix.trim();

    let mut cleaned = String::with_capacity(text.len());
    if let Some(header) = &options.header {
        cleaned.push_str(header.trim());
        cleaned.push('\n');
    }
    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || (!comment_prefix.is_empty() && trimmed.starts_with(comment_prefix)) {
            continue;
        }
        cleaned.push_str(line);
        cleaned.push('\n');
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter as u8)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(cleaned.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| NormalizeError::malformed(Grammar::Delimited, e))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut table = DelimitedTable {
        headers,
        rows: Vec::new(),
    };

    for record in reader.records() {
        let record = record.map_err(|e| NormalizeError::malformed(Grammar::Delimited, e))?;
        if table.rows.len() >= limits.max_elements {
            return Err(NormalizeError::ElementLimitExceeded {
                limit: limits.max_elements,
            });
        }
        let columns = table
            .headers
            .iter()
            .zip(record.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        table.rows.push(DelimitedRow { columns });
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_remaining_row_is_header() {
        let input = b"# masscan output\n\nip,port,proto\n10.0.0.1,22,tcp\n# trailing comment\n10.0.0.2,80,tcp\n";
        let table = parse_delimited(input, &DelimitedOptions::default(), &TreeLimits::default()).unwrap();

        assert_eq!(table.headers, vec!["ip", "port", "proto"]);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1].get("port"), Some("80"));
    }

    #[test]
    fn test_explicit_header_and_custom_separator() {
        let options = DelimitedOptions {
            delimiter: '\t',
            header: Some("ip\thostname".to_string()),
            comment_prefix: "//".to_string(),
        };
        let input = b"// exported\n10.0.0.1\tgw.lab\n10.0.0.2\n";
        let table = parse_delimited(input, &options, &TreeLimits::default()).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].get("hostname"), Some("gw.lab"));
        // short rows are tolerated, missing columns are simply absent
        assert_eq!(table.rows[1].get("hostname"), None);
    }

    #[test]
    fn test_quoted_fields_keep_separators() {
        let input = b"ip,notes\n10.0.0.1,\"edge, core\"\n";
        let table = parse_delimited(input, &DelimitedOptions::default(), &TreeLimits::default()).unwrap();
        assert_eq!(table.rows[0].get("notes"), Some("edge, core"));
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let input = b"ip\n\xff\xfe\n";
        assert!(parse_delimited(input, &DelimitedOptions::default(), &TreeLimits::default()).is_err());
    }

    #[test]
    fn test_non_ascii_delimiter_is_rejected() {
        let options = DelimitedOptions {
            delimiter: '§',
            ..Default::default()
        };
        let result = parse_delimited(b"a", &options, &TreeLimits::default());
        assert!(matches!(result, Err(NormalizeError::InvalidOptions(_))));
    }
}
