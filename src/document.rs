//! Document Model - XML as a Tree of Mappings
//!
//! Every element is a key mapping to an ordered array (one entry per
//! occurrence). Attributes live under the attribute key, leaf text under
//! the text key. Key order is insertion order, which is element order.

use roxmltree::{ExpandedName, Node};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::mapper::ConvertError;

/// A parsed or to-be-serialized XML document.
pub type Document = Value;

pub const ATTRIBUTE_KEY: &str = "@";
pub const TEXT_KEY: &str = "#text";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseOptions {
    #[serde(default = "default_attribute_key")]
    pub attribute_key: String,
    #[serde(default = "default_text_key")]
    pub text_key: String,
    /// Turn numeric leaf text into JSON numbers
    #[serde(default)]
    pub parse_numbers: bool,
}

fn default_attribute_key() -> String { ATTRIBUTE_KEY.to_string() }
fn default_text_key() -> String { TEXT_KEY.to_string() }
fn default_indent() -> String { "  ".to_string() }

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            attribute_key: default_attribute_key(),
            text_key: default_text_key(),
            parse_numbers: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerializeOptions {
    #[serde(default = "default_attribute_key")]
    pub attribute_key: String,
    #[serde(default = "default_text_key")]
    pub text_key: String,
    #[serde(default = "default_indent")]
    pub indent: String,
    /// Emit an `<?xml ...?>` declaration line
    #[serde(default)]
    pub declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            attribute_key: default_attribute_key(),
            text_key: default_text_key(),
            indent: default_indent(),
            declaration: false,
        }
    }
}

/// Parse XML text into the tree-of-mappings shape.
///
/// Names are re-qualified with the prefix in scope (`ogr:name`).
/// Namespace declarations are not carried over as attributes.
pub fn parse_xml(text: &str, options: &ParseOptions) -> Result<Document, ConvertError> {
    let doc = roxmltree::Document::parse(text)?;
    let root = doc.root_element();

    let mut map = Map::new();
    map.insert(
        qualified_name(root, root.tag_name()),
        Value::Array(vec![element_value(root, options)]),
    );
    Ok(Value::Object(map))
}

fn element_value(node: Node<'_, '_>, options: &ParseOptions) -> Value {
    let mut map = Map::new();

    let mut attributes = Map::new();
    for attribute in node.attributes() {
        let name = match attribute.namespace() {
            Some(uri) => prefixed(node, uri, attribute.name()),
            None => attribute.name().to_string(),
        };
        attributes.insert(name, Value::String(attribute.value().to_string()));
    }
    if !attributes.is_empty() {
        map.insert(options.attribute_key.clone(), Value::Object(attributes));
    }

    let mut text = String::new();
    for child in node.children() {
        if child.is_element() {
            let key = qualified_name(child, child.tag_name());
            let value = element_value(child, options);
            if let Value::Array(items) = map.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                items.push(value);
            }
        } else if child.is_text() {
            if let Some(t) = child.text() {
                text.push_str(t);
            }
        }
    }

    let text = text.trim();
    if !text.is_empty() {
        map.insert(options.text_key.clone(), leaf_value(text, options.parse_numbers));
    }

    Value::Object(map)
}

fn leaf_value(text: &str, parse_numbers: bool) -> Value {
    if parse_numbers {
        if let Ok(i) = text.parse::<i64>() {
            return Value::Number(i.into());
        }
        if let Some(n) = text.parse::<f64>().ok().and_then(Number::from_f64) {
            return Value::Number(n);
        }
    }
    Value::String(text.to_string())
}

fn qualified_name(node: Node<'_, '_>, name: ExpandedName<'_, '_>) -> String {
    match name.namespace() {
        Some(uri) => prefixed(node, uri, name.name()),
        None => name.name().to_string(),
    }
}

fn prefixed(node: Node<'_, '_>, uri: &str, local: &str) -> String {
    match node.lookup_prefix(uri) {
        Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, local),
        _ => local.to_string(),
    }
}

/// Render a tree-of-mappings document as indented XML text.
pub fn serialize_xml(document: &Document, options: &SerializeOptions) -> Result<String, ConvertError> {
    let root = document
        .as_object()
        .ok_or_else(|| ConvertError::Serialize("document root must be a mapping".into()))?;

    let mut out = String::new();
    if options.declaration {
        out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    }
    for (name, value) in root {
        write_element(&mut out, name, value, 0, options)?;
    }
    Ok(out)
}

fn write_element(
    out: &mut String,
    name: &str,
    value: &Value,
    depth: usize,
    options: &SerializeOptions,
) -> Result<(), ConvertError> {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(out, name, item, depth, options)?;
            }
        }
        Value::Object(map) => write_mapping(out, name, map, depth, options)?,
        scalar => {
            push_indent(out, depth, options);
            out.push_str(&format!("<{}>{}</{}>\n", name, escape_text(&scalar_text(scalar)), name));
        }
    }
    Ok(())
}

fn write_mapping(
    out: &mut String,
    name: &str,
    map: &Map<String, Value>,
    depth: usize,
    options: &SerializeOptions,
) -> Result<(), ConvertError> {
    push_indent(out, depth, options);
    out.push('<');
    out.push_str(name);

    if let Some(attributes) = map.get(&options.attribute_key) {
        let attributes = attributes.as_object().ok_or_else(|| {
            ConvertError::Serialize(format!("attributes of <{}> must be a mapping", name))
        })?;
        for (key, value) in attributes {
            if value.is_array() || value.is_object() {
                return Err(ConvertError::Serialize(format!(
                    "attribute {} of <{}> must be a scalar",
                    key, name
                )));
            }
            out.push_str(&format!(" {}=\"{}\"", key, escape_attribute(&scalar_text(value))));
        }
    }
    out.push('>');

    let text = match map.get(&options.text_key) {
        Some(value) if value.is_array() || value.is_object() => {
            return Err(ConvertError::Serialize(format!("text of <{}> must be a scalar", name)));
        }
        Some(value) => scalar_text(value),
        None => String::new(),
    };

    let children: Vec<_> = map
        .iter()
        .filter(|(key, _)| **key != options.attribute_key && **key != options.text_key)
        .collect();

    if children.is_empty() {
        out.push_str(&escape_text(&text));
    } else {
        out.push('\n');
        if !text.is_empty() {
            push_indent(out, depth + 1, options);
            out.push_str(&escape_text(&text));
            out.push('\n');
        }
        for (key, value) in children {
            write_element(out, key, value, depth + 1, options)?;
        }
        push_indent(out, depth, options);
    }

    out.push_str(&format!("</{}>\n", name));
    Ok(())
}

fn push_indent(out: &mut String, depth: usize, options: &SerializeOptions) {
    for _ in 0..depth {
        out.push_str(&options.indent);
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attribute(text: &str) -> String {
    escape_text(text).replace('"', "&quot;").replace('\'', "&apos;")
}
