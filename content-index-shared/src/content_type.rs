//! Content type schemas.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::node::IndexType;

/// The schema of a node: its alias, icon and the property aliases it declares.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub id: i32,
    /// Identifier written as the document's `nodeTypeAlias`.
    pub alias: String,
    #[serde(default)]
    pub icon: String,
    pub index_type: IndexType,
    #[serde(default)]
    pub property_aliases: BTreeSet<String>,
}

impl ContentType {
    pub fn new(id: i32, alias: impl Into<String>, index_type: IndexType) -> Self {
        Self {
            id,
            alias: alias.into(),
            icon: String::new(),
            index_type,
            property_aliases: BTreeSet::new(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_properties<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.property_aliases
            .extend(aliases.into_iter().map(Into::into));
        self
    }

    /// Whether the schema allows a property with this alias.
    pub fn declares(&self, alias: &str) -> bool {
        self.property_aliases.contains(alias)
    }
}
