//! Grammar detection from a payload's byte prefix

use scanweave_core::definition::Grammar;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const SNIFF_WINDOW: usize = 8192;
const DELIMITERS: &[u8] = b",\t;|";

/// Guess the grammar of a payload; `None` when nothing looks familiar
pub fn detect_grammar(bytes: &[u8]) -> Option<Grammar> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let window = &bytes[..bytes.len().min(SNIFF_WINDOW)];

    match window.iter().find(|b| !b.is_ascii_whitespace())? {
        b'<' => return Some(Grammar::Markup),
        b'{' | b'[' => return Some(Grammar::Object),
        _ => {}
    }

    if window.iter().any(|b| b.is_ascii_control() && !b.is_ascii_whitespace()) {
        return None;
    }

    // a separator on the first data line, or a single-column table with a header and rows
    let text = String::from_utf8_lossy(window);
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'));
    let first = lines.next()?;
    if first.bytes().any(|b| DELIMITERS.contains(&b)) || lines.next().is_some() {
        return Some(Grammar::Delimited);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_each_grammar() {
        assert_eq!(detect_grammar(b"  <?xml version=\"1.0\"?><nmaprun/>"), Some(Grammar::Markup));
        assert_eq!(detect_grammar(b"\xEF\xBB\xBF{\"hosts\": []}"), Some(Grammar::Object));
        assert_eq!(detect_grammar(b"\n[ {\"ip\": \"10.0.0.1\"} ]"), Some(Grammar::Object));
        assert_eq!(detect_grammar(b"# masscan\nip,port\n10.0.0.1,22\n"), Some(Grammar::Delimited));
        assert_eq!(detect_grammar(b"ip\tport\n"), Some(Grammar::Delimited));
    }

    #[test]
    fn test_single_column_table_is_delimited() {
        assert_eq!(detect_grammar(b"ip\n10.0.0.1\n10.0.0.2\n"), Some(Grammar::Delimited));
        assert_eq!(detect_grammar(b"# hosts\nip\n\n10.0.0.1"), Some(Grammar::Delimited));
        assert_eq!(detect_grammar(b"ip\n"), None);
        assert_eq!(detect_grammar(b"ip\n\x00\x01binary"), None);
    }

    #[test]
    fn test_unrecognized_payloads() {
        assert_eq!(detect_grammar(b""), None);
        assert_eq!(detect_grammar(b"   \n\t"), None);
        assert_eq!(detect_grammar(b"plain words only\n"), None);
    }
}
