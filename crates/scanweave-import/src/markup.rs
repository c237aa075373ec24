//! Generic element tree for tag/attribute markup

use crate::error::NormalizeError;
use crate::limits::TreeLimits;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use scanweave_core::definition::Grammar;
use std::collections::HashMap;

/// One markup element: name, attributes, ordered children and trimmed text
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Direct children with the given name, in document order
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }
}

/// Build an element tree in a single streaming pass, without schema validation
pub fn parse_markup(bytes: &[u8], limits: &TreeLimits) -> Result<XmlElement, NormalizeError> {
    let mut reader = Reader::from_reader(bytes);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;
    let mut element_count = 0usize;

    loop {
        let event = match reader.read_event_into(&mut buf) {
            Ok(event) => event,
            Err(e) => {
                return Err(NormalizeError::malformed(
                    Grammar::Markup,
                    format!("at byte {}: {}", reader.buffer_position(), e),
                ))
            }
        };

        match event {
            Event::Start(start) => {
                enter_element(&stack, &mut element_count, limits)?;
                stack.push(element_from(&start)?);
            }
            Event::Empty(start) => {
                enter_element(&stack, &mut element_count, limits)?;
                let element = element_from(&start)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| NormalizeError::malformed(Grammar::Markup, "unexpected closing tag"))?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    let value = text
                        .unescape()
                        .map_err(|e| NormalizeError::malformed(Grammar::Markup, e))?;
                    push_text(&mut current.text, &value);
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    let raw = data.into_inner();
                    push_text(&mut current.text, &String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            // declarations, comments, processing instructions, doctype
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(NormalizeError::malformed(
            Grammar::Markup,
            format!("unclosed element <{}>", open.name),
        ));
    }

    root.ok_or_else(|| NormalizeError::malformed(Grammar::Markup, "no root element"))
}

fn enter_element(stack: &[XmlElement], element_count: &mut usize, limits: &TreeLimits) -> Result<(), NormalizeError> {
    *element_count += 1;
    if *element_count > limits.max_elements {
        return Err(NormalizeError::ElementLimitExceeded {
            limit: limits.max_elements,
        });
    }
    if stack.len() + 1 > limits.max_depth {
        return Err(NormalizeError::DepthExceeded { limit: limits.max_depth });
    }
    Ok(())
}

fn element_from(start: &BytesStart) -> Result<XmlElement, NormalizeError> {
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
    let mut attributes = HashMap::new();

    for attr in start.attributes() {
        let attr = attr.map_err(|e| NormalizeError::malformed(Grammar::Markup, e))?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| NormalizeError::malformed(Grammar::Markup, e))?
            .into_owned();
        attributes.insert(key, value);
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<(), NormalizeError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(NormalizeError::malformed(Grammar::Markup, "multiple root elements"));
    }
    *root = Some(element);
    Ok(())
}

fn push_text(buffer: &mut String, value: &str) {
    let value = value.trim();
    if value.is_empty() {
        return;
    }
    if !buffer.is_empty() {
        buffer.push(' ');
    }
    buffer.push_str(value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attributes_children_and_text() {
        let xml = br#"<?xml version="1.0"?>
            <!DOCTYPE nmaprun>
            <nmaprun scanner="nmap">
              <host><address addr="10.0.0.1" addrtype="ipv4"/><comment> edge  router </comment></host>
              <host><address addr="10.0.0.2" addrtype="ipv4"/></host>
            </nmaprun>"#;

        let root = parse_markup(xml, &TreeLimits::default()).unwrap();
        assert_eq!(root.name, "nmaprun");
        assert_eq!(root.attribute("scanner"), Some("nmap"));
        assert_eq!(root.children_named("host").count(), 2);
        let first = &root.children[0];
        assert_eq!(first.children[0].attribute("addr"), Some("10.0.0.1"));
        assert_eq!(first.children[1].text, "edge  router");
    }

    #[test]
    fn test_escaped_values_are_unescaped() {
        let xml = br#"<a title="x &amp; y">1 &lt; 2</a>"#;
        let root = parse_markup(xml, &TreeLimits::default()).unwrap();
        assert_eq!(root.attribute("title"), Some("x & y"));
        assert_eq!(root.text, "1 < 2");
    }

    #[test]
    fn test_malformed_markup_is_fatal() {
        assert!(parse_markup(b"<a><b></a>", &TreeLimits::default()).is_err());
        assert!(parse_markup(b"<a><b>", &TreeLimits::default()).is_err());
        assert!(parse_markup(b"just text", &TreeLimits::default()).is_err());
        assert!(parse_markup(b"<a/><b/>", &TreeLimits::default()).is_err());
    }

    #[test]
    fn test_depth_limit_rejects_deep_nesting() {
        let limits = TreeLimits {
            max_depth: 3,
            max_elements: 100,
        };
        assert!(parse_markup(b"<a><b><c/></b></a>", &limits).is_ok());
        let result = parse_markup(b"<a><b><c><d/></c></b></a>", &limits);
        assert!(matches!(result, Err(NormalizeError::DepthExceeded { limit: 3 })));
    }

    #[test]
    fn test_element_limit_rejects_large_documents() {
        let limits = TreeLimits {
            max_depth: 10,
            max_elements: 3,
        };
        let result = parse_markup(b"<a><b/><b/><b/></a>", &limits);
        assert!(matches!(result, Err(NormalizeError::ElementLimitExceeded { limit: 3 })));
    }
}
