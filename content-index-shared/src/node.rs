//! Content tree nodes.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Parent id of top-level nodes, and the root that selects a whole tree.
pub const ROOT_ID: i32 = -1;

/// The index a node is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexType {
    /// Pages.
    Content,
    /// Binary and asset nodes.
    Media,
}

impl IndexType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexType::Content => "content",
            IndexType::Media => "media",
        }
    }
}

impl fmt::Display for IndexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variant-specific state of a node.
///
/// Media has no publish state, so there is nothing to consult for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeKind {
    Content { published: bool },
    Media,
}

impl NodeKind {
    pub fn index_type(&self) -> IndexType {
        match self {
            NodeKind::Content { .. } => IndexType::Content,
            NodeKind::Media => IndexType::Media,
        }
    }
}

/// A typed property value as held by the content store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    Text(String),
    Date(DateTime<Utc>),
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<DateTime<Utc>> for PropertyValue {
    fn from(value: DateTime<Utc>) -> Self {
        PropertyValue::Date(value)
    }
}

/// A read-only snapshot of one node of a content or media tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentNode {
    pub id: i32,
    pub parent_id: i32,
    /// Depth in the tree, top-level nodes are level 1.
    pub level: i32,
    pub sort_order: i32,
    pub create_date: DateTime<Utc>,
    pub update_date: DateTime<Utc>,
    pub name: String,
    /// Comma-delimited ancestor chain ending with the node's own id.
    pub path: String,
    pub creator_id: i32,
    pub content_type_id: i32,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ContentNode {
    /// Create a top-level node. Use [`ContentNode::under`] to place it in a tree.
    pub fn new(id: i32, name: impl Into<String>, content_type_id: i32, kind: NodeKind) -> Self {
        Self {
            id,
            parent_id: ROOT_ID,
            level: 1,
            sort_order: 0,
            create_date: DateTime::<Utc>::default(),
            update_date: DateTime::<Utc>::default(),
            name: name.into(),
            path: format!("{},{}", ROOT_ID, id),
            creator_id: 0,
            content_type_id,
            kind,
            properties: BTreeMap::new(),
        }
    }

    /// Create a published content node.
    pub fn content(id: i32, name: impl Into<String>, content_type_id: i32) -> Self {
        Self::new(id, name, content_type_id, NodeKind::Content { published: true })
    }

    /// Create a media node.
    pub fn media(id: i32, name: impl Into<String>, content_type_id: i32) -> Self {
        Self::new(id, name, content_type_id, NodeKind::Media)
    }

    /// Re-parent the node below `parent`, deriving level and path from it.
    pub fn under(mut self, parent: &ContentNode) -> Self {
        self.parent_id = parent.id;
        self.level = parent.level + 1;
        self.path = format!("{},{}", parent.path, self.id);
        self
    }

    pub fn with_sort_order(mut self, sort_order: i32) -> Self {
        self.sort_order = sort_order;
        self
    }

    pub fn with_dates(mut self, created: DateTime<Utc>, updated: DateTime<Utc>) -> Self {
        self.create_date = created;
        self.update_date = updated;
        self
    }

    pub fn with_creator(mut self, creator_id: i32) -> Self {
        self.creator_id = creator_id;
        self
    }

    pub fn with_property(mut self, alias: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(alias.into(), value.into());
        self
    }

    pub fn unpublished(mut self) -> Self {
        if let NodeKind::Content { ref mut published } = self.kind {
            *published = false;
        }
        self
    }

    pub fn index_type(&self) -> IndexType {
        self.kind.index_type()
    }

    /// Publish state, `None` for media.
    pub fn published(&self) -> Option<bool> {
        match self.kind {
            NodeKind::Content { published } => Some(published),
            NodeKind::Media => None,
        }
    }

    /// Ids along the path, excluding the root sentinel and the node itself.
    pub fn ancestor_ids(&self) -> Vec<i32> {
        self.path
            .split(',')
            .filter_map(|segment| segment.trim().parse::<i32>().ok())
            .filter(|id| *id != ROOT_ID && *id != self.id)
            .collect()
    }

    /// Whether the node sits below `root_id`. Every node descends from [`ROOT_ID`].
    pub fn is_descendant_of(&self, root_id: i32) -> bool {
        if root_id == ROOT_ID {
            return true;
        }
        self.id != root_id && self.ancestor_ids().contains(&root_id)
    }
}
