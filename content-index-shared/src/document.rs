//! Documents written to the search index.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::node::IndexType;
use crate::policy::FieldOptions;

/// A single typed value of an index field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Date(DateTime<Utc>),
}

impl FieldValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Date(d) => f.write_str(&d.to_rfc3339_opts(SecondsFormat::Secs, true)),
        }
    }
}

/// A named field: its values and how the index should treat them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexField {
    pub values: Vec<FieldValue>,
    pub options: FieldOptions,
}

/// A flat, indexable rendition of one content node.
///
/// Fields are kept in a `BTreeMap` so that identical input always serializes
/// to identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub node_id: i32,
    pub index_type: IndexType,
    pub fields: BTreeMap<String, IndexField>,
}

impl IndexDocument {
    pub fn new(node_id: i32, index_type: IndexType) -> Self {
        Self {
            node_id,
            index_type,
            fields: BTreeMap::new(),
        }
    }

    /// The id the writer upserts by.
    pub fn document_id(&self) -> String {
        self.node_id.to_string()
    }

    /// Set a single-valued field, replacing any previous value.
    pub fn set(&mut self, name: impl Into<String>, value: FieldValue, options: FieldOptions) {
        self.fields.insert(
            name.into(),
            IndexField {
                values: vec![value],
                options,
            },
        );
    }

    pub fn field(&self, name: &str) -> Option<&IndexField> {
        self.fields.get(name)
    }

    /// First value of a field, if present.
    pub fn first(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).and_then(|f| f.values.first())
    }

    pub fn contains_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}
