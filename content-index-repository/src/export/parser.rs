//! Reader for legacy XML tree exports.
//!
//! Two node shapes are recognized anywhere in the document:
//!
//! * content: any element carrying an `isDoc` attribute. The element name is
//!   the content-type alias and child elements are properties.
//! * media: `<node nodeTypeAlias="...">` elements whose properties are
//!   `<data alias="...">` children.
//!
//! Nodes may be nested (tree export) or flat (XPath result). Document order
//! is kept as export order.

use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::warn;

use crate::errors::SourceError;
use content_index_shared::{
    parse_timestamp, ContentNode, ContentType, IndexType, NodeKind, PropertyValue,
};

/// The nodes of one export plus the content types they reference.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportDocument {
    pub nodes: Vec<ContentNode>,
    pub content_types: Vec<ContentType>,
}

enum Frame {
    Node(usize),
    Property { owner: usize, alias: String, text: String },
    /// Element nested in a property value; its text belongs to the property.
    Markup,
    Other,
}

/// Text buffer of the property the innermost element belongs to.
fn property_text(stack: &mut [Frame]) -> Option<&mut String> {
    for frame in stack.iter_mut().rev() {
        match frame {
            Frame::Markup => continue,
            Frame::Property { text, .. } => return Some(text),
            _ => return None,
        }
    }
    None
}

/// Parse an export into nodes of `index_type`.
pub fn parse_export(xml: &str, index_type: IndexType) -> Result<ExportDocument, SourceError> {
    // Whitespace between markup inside a property is significant.
    let mut reader = Reader::from_str(xml);

    let mut nodes: Vec<ContentNode> = Vec::new();
    let mut aliases: Vec<String> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            SourceError::parse(format!("at byte {}: {}", reader.buffer_position(), e))
        })?;

        match event {
            Event::Start(element) => {
                if property_text(&mut stack).is_some() {
                    stack.push(Frame::Markup);
                } else if let Some((node, alias)) = read_node(&element, index_type)? {
                    nodes.push(node);
                    aliases.push(alias);
                    stack.push(Frame::Node(nodes.len() - 1));
                } else if let Some(&Frame::Node(owner)) = stack.last() {
                    stack.push(Frame::Property {
                        owner,
                        alias: property_alias(&element)?,
                        text: String::new(),
                    });
                } else {
                    stack.push(Frame::Other);
                }
            }
            Event::Empty(element) => {
                if property_text(&mut stack).is_some() {
                    continue;
                }
                if let Some((node, alias)) = read_node(&element, index_type)? {
                    nodes.push(node);
                    aliases.push(alias);
                } else if let Some(&Frame::Node(owner)) = stack.last() {
                    let alias = property_alias(&element)?;
                    nodes[owner].properties.insert(alias, PropertyValue::Null);
                }
            }
            Event::Text(text) => {
                if let Some(buffer) = property_text(&mut stack) {
                    buffer.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(buffer) = property_text(&mut stack) {
                    buffer.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::End(_) => {
                if let Some(Frame::Property { owner, alias, text }) = stack.pop() {
                    nodes[owner]
                        .properties
                        .insert(alias, PropertyValue::Text(text.trim().to_string()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let content_types = derive_content_types(&nodes, &aliases, index_type);
    Ok(ExportDocument {
        nodes,
        content_types,
    })
}

fn local_name(element: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(element.name().local_name().as_ref()).into_owned()
}

fn attributes(element: &BytesStart<'_>) -> Result<HashMap<String, String>, SourceError> {
    let mut attributes = HashMap::new();
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value: Cow<'_, str> = attr.unescape_value()?;
        attributes.insert(key, value.into_owned());
    }
    Ok(attributes)
}

fn property_alias(element: &BytesStart<'_>) -> Result<String, SourceError> {
    let name = local_name(element);
    if name == "data" {
        if let Some(alias) = attributes(element)?.remove("alias") {
            return Ok(alias);
        }
    }
    Ok(name)
}

/// Build a node from an element, `None` if the element is not a node.
fn read_node(
    element: &BytesStart<'_>,
    index_type: IndexType,
) -> Result<Option<(ContentNode, String)>, SourceError> {
    let name = local_name(element);
    let mut attrs = attributes(element)?;

    let alias = if attrs.contains_key("isDoc") {
        name
    } else if name == "node" {
        match attrs.remove("nodeTypeAlias") {
            Some(alias) => alias,
            None => return Ok(None),
        }
    } else {
        return Ok(None);
    };

    let id = required_int(&attrs, "id", &alias)?;
    let kind = match index_type {
        IndexType::Content => NodeKind::Content {
            published: match attrs.get("published") {
                Some(raw) => parse_bool(raw)
                    .ok_or_else(|| invalid(id, "published", raw))?,
                None => true,
            },
        },
        IndexType::Media => NodeKind::Media,
    };

    let node = ContentNode {
        id,
        parent_id: required_int(&attrs, "parentID", &alias)?,
        level: required_int(&attrs, "level", &alias)?,
        sort_order: optional_int(&attrs, "sortOrder", id)?.unwrap_or(0),
        create_date: optional_date(&attrs, "createDate", id)?.unwrap_or_default(),
        update_date: optional_date(&attrs, "updateDate", id)?.unwrap_or_default(),
        name: attrs.get("nodeName").cloned().unwrap_or_default(),
        path: required(&attrs, "path", &alias)?.to_string(),
        creator_id: match optional_int(&attrs, "creatorID", id)? {
            Some(creator) => creator,
            None => optional_int(&attrs, "writerID", id)?.unwrap_or(0),
        },
        content_type_id: required_int(&attrs, "nodeType", &alias)?,
        kind,
        properties: BTreeMap::new(),
    };
    Ok(Some((node, alias)))
}

fn required<'a>(
    attrs: &'a HashMap<String, String>,
    key: &str,
    alias: &str,
) -> Result<&'a str, SourceError> {
    attrs
        .get(key)
        .map(String::as_str)
        .ok_or_else(|| SourceError::parse(format!("<{}> is missing attribute {}", alias, key)))
}

fn required_int(
    attrs: &HashMap<String, String>,
    key: &str,
    alias: &str,
) -> Result<i32, SourceError> {
    let raw = required(attrs, key, alias)?;
    raw.trim().parse().map_err(|_| {
        SourceError::parse(format!("<{}> has non-numeric {}: {:?}", alias, key, raw))
    })
}

fn optional_int(
    attrs: &HashMap<String, String>,
    key: &str,
    id: i32,
) -> Result<Option<i32>, SourceError> {
    attrs
        .get(key)
        .map(|raw| raw.trim().parse().map_err(|_| invalid(id, key, raw)))
        .transpose()
}

fn optional_date(
    attrs: &HashMap<String, String>,
    key: &str,
    id: i32,
) -> Result<Option<DateTime<Utc>>, SourceError> {
    attrs
        .get(key)
        .map(|raw| parse_timestamp(raw).ok_or_else(|| invalid(id, key, raw)))
        .transpose()
}

fn invalid(id: i32, key: &str, raw: &str) -> SourceError {
    SourceError::parse(format!("node {} has invalid {}: {:?}", id, key, raw))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn derive_content_types(
    nodes: &[ContentNode],
    aliases: &[String],
    index_type: IndexType,
) -> Vec<ContentType> {
    let mut types: BTreeMap<i32, ContentType> = BTreeMap::new();

    for (node, alias) in nodes.iter().zip(aliases) {
        let content_type = types
            .entry(node.content_type_id)
            .or_insert_with(|| ContentType::new(node.content_type_id, alias.clone(), index_type));

        if content_type.alias != *alias {
            warn!(
                type_id = node.content_type_id,
                kept = %content_type.alias,
                ignored = %alias,
                "Content type id used with two aliases"
            );
        }
        content_type
            .property_aliases
            .extend(node.properties.keys().cloned());
    }

    types.into_values().collect()
}
