//! XML to JSON mapping conversion for case transaction documents.
//!
//! The produced mapping follows the xml2json conventions that the case
//! parser consumes:
//!
//! - attributes become `@`-prefixed keys (`@case_id`), keeping their
//!   namespace prefix when they have one (`@xsi:nil`);
//! - element text is the whole value when the element has neither attributes
//!   nor child elements, and lives under `#text` otherwise;
//! - child elements are keyed by their local tag name, and repeated tags fold
//!   into an array under that one key;
//! - namespace declarations are not attributes. An element whose namespace
//!   differs from its parent's carries the URI as `@xmlns`.
//!
//! # Example
//!
//! ```
//! use case_xml::xml_to_json;
//!
//! let (tag, value) = xml_to_json(r#"<case case_id="abc"><close/></case>"#).unwrap();
//! assert_eq!(tag, "case");
//! assert_eq!(value, serde_json::json!({"@case_id": "abc", "close": ""}));
//! ```

use roxmltree::{Attribute, Document, Node};
use serde_json::map::Entry;
use serde_json::{Map, Value};
use thiserror::Error;

/// Prefix marking attribute keys in the mapping.
pub const ATTRIBUTE_PREFIX: char = '@';

/// Key holding element text when the element also has attributes or children.
pub const TEXT_KEY: &str = "#text";

/// Key holding an element's namespace URI.
pub const XMLNS_KEY: &str = "@xmlns";

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("malformed xml: {0}")]
    Parse(#[from] roxmltree::Error),
}

/// Conversion options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Strip leading and trailing whitespace from element text. Whitespace-only
    /// text next to child elements is dropped either way.
    pub trim_text: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self { trim_text: true }
    }
}

/// Parses `text` and converts its root element.
///
/// Returns the root element's local name together with its mapping.
pub fn xml_to_json(text: &str) -> Result<(String, Value), XmlError> {
    xml_to_json_with(text, &ConvertOptions::default())
}

pub fn xml_to_json_with(text: &str, opts: &ConvertOptions) -> Result<(String, Value), XmlError> {
    let doc = Document::parse(text)?;
    Ok(element_to_json_with(doc.root_element(), opts))
}

/// Converts an already parsed element (and its subtree).
///
/// The element is treated as a root: it carries `@xmlns` whenever it has a
/// namespace, even one inherited from an ancestor.
pub fn element_to_json(node: Node<'_, '_>) -> (String, Value) {
    element_to_json_with(node, &ConvertOptions::default())
}

pub fn element_to_json_with(node: Node<'_, '_>, opts: &ConvertOptions) -> (String, Value) {
    let tag = node.tag_name().name().to_string();
    let value = convert(node, None, opts);
    tracing::trace!(tag = %tag, "converted xml element");
    (tag, value)
}

fn convert(node: Node<'_, '_>, parent_ns: Option<&str>, opts: &ConvertOptions) -> Value {
    let mut map = Map::new();

    let ns = node.tag_name().namespace();
    if let Some(uri) = ns {
        if parent_ns != Some(uri) {
            map.insert(XMLNS_KEY.to_string(), Value::String(uri.to_string()));
        }
    }

    for attr in node.attributes() {
        map.insert(attribute_key(node, attr), Value::String(attr.value().to_string()));
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let key = child.tag_name().name().to_string();
            let value = convert(child, ns, opts);
            insert_child(&mut map, key, value);
        } else if child.is_text() {
            if let Some(chunk) = child.text() {
                text.push_str(chunk);
            }
        }
    }
    let text = if opts.trim_text { text.trim() } else { text.as_str() };

    if map.is_empty() {
        return Value::String(text.to_string());
    }
    if !text.trim().is_empty() {
        map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
    }
    Value::Object(map)
}

// Namespaced attributes keep their prefix so `a:x` and `b:x` stay apart.
fn attribute_key(node: Node<'_, '_>, attr: Attribute<'_, '_>) -> String {
    let prefix = attr.namespace().and_then(|uri| node.lookup_prefix(uri));
    match prefix {
        Some(prefix) => format!("{ATTRIBUTE_PREFIX}{prefix}:{}", attr.name()),
        None => format!("{ATTRIBUTE_PREFIX}{}", attr.name()),
    }
}

// Converted children are never arrays themselves, so an array under `key`
// always means the tag was already repeated.
fn insert_child(map: &mut Map<String, Value>, key: String, value: Value) {
    match map.entry(key) {
        Entry::Vacant(slot) => {
            slot.insert(value);
        }
        Entry::Occupied(mut slot) => match slot.get_mut() {
            Value::Array(items) => items.push(value),
            existing => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn repeated_children_fold_into_array() {
        let (_, value) = xml_to_json("<a><b>1</b><b>2</b><b>3</b></a>").unwrap();
        assert_eq!(value, json!({"b": ["1", "2", "3"]}));
    }

    #[test]
    fn whitespace_is_kept_when_trimming_is_off() {
        let opts = ConvertOptions { trim_text: false };
        let (_, value) = xml_to_json_with("<a> x </a>", &opts).unwrap();
        assert_eq!(value, json!(" x "));
    }

    #[test]
    fn indentation_between_children_is_not_text() {
        let opts = ConvertOptions { trim_text: false };
        let (_, value) = xml_to_json_with("<a>\n  <b> y </b>\n</a>", &opts).unwrap();
        assert_eq!(value, json!({"b": " y "}));
    }
}
