//! Field policies: which properties become index fields, and how.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The type a property value is coerced to before indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Date,
}

/// How the index treats a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldOptions {
    /// Value can be read back from the index.
    #[serde(default = "default_true")]
    pub stored: bool,
    /// Value is split into terms for full-text search.
    #[serde(default)]
    pub tokenized: bool,
    /// Value can be used to order results.
    #[serde(default)]
    pub sortable: bool,
}

fn default_true() -> bool {
    true
}

impl FieldOptions {
    /// Stored, matched as a whole.
    pub const fn keyword() -> Self {
        Self {
            stored: true,
            tokenized: false,
            sortable: false,
        }
    }

    /// Stored and full-text searchable.
    pub const fn analyzed() -> Self {
        Self {
            stored: true,
            tokenized: true,
            sortable: false,
        }
    }

    pub const fn sortable(self) -> Self {
        Self {
            sortable: true,
            ..self
        }
    }
}

impl Default for FieldOptions {
    fn default() -> Self {
        Self::analyzed()
    }
}

/// Selects one property alias for indexing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Property alias, also used as the field name.
    pub alias: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub options: FieldOptions,
}

fn default_field_type() -> FieldType {
    FieldType::Text
}

impl FieldRule {
    pub fn new(alias: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            alias: alias.into(),
            field_type,
            options: FieldOptions::default(),
        }
    }

    pub fn text(alias: impl Into<String>) -> Self {
        Self::new(alias, FieldType::Text)
    }

    pub fn integer(alias: impl Into<String>) -> Self {
        Self::new(alias, FieldType::Integer).with_options(FieldOptions::keyword().sortable())
    }

    pub fn date(alias: impl Into<String>) -> Self {
        Self::new(alias, FieldType::Date).with_options(FieldOptions::keyword().sortable())
    }

    pub fn with_options(mut self, options: FieldOptions) -> Self {
        self.options = options;
        self
    }
}

/// A field every document carries, whatever its schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemField {
    pub name: &'static str,
    pub field_type: FieldType,
    pub options: FieldOptions,
}

const SYSTEM_FIELDS: [SystemField; 10] = [
    SystemField {
        name: "id",
        field_type: FieldType::Integer,
        options: FieldOptions::keyword().sortable(),
    },
    SystemField {
        name: "parentID",
        field_type: FieldType::Integer,
        options: FieldOptions::keyword(),
    },
    SystemField {
        name: "level",
        field_type: FieldType::Integer,
        options: FieldOptions::keyword().sortable(),
    },
    SystemField {
        name: "path",
        field_type: FieldType::Text,
        options: FieldOptions::keyword(),
    },
    SystemField {
        name: "sortOrder",
        field_type: FieldType::Integer,
        options: FieldOptions::keyword().sortable(),
    },
    SystemField {
        name: "createDate",
        field_type: FieldType::Date,
        options: FieldOptions::keyword().sortable(),
    },
    SystemField {
        name: "updateDate",
        field_type: FieldType::Date,
        options: FieldOptions::keyword().sortable(),
    },
    SystemField {
        name: "nodeName",
        field_type: FieldType::Text,
        options: FieldOptions::analyzed().sortable(),
    },
    SystemField {
        name: "nodeTypeAlias",
        field_type: FieldType::Text,
        options: FieldOptions::keyword(),
    },
    SystemField {
        name: "creatorID",
        field_type: FieldType::Integer,
        options: FieldOptions::keyword(),
    },
];

/// The fixed set of fields emitted for every node, in emission order.
pub fn system_fields() -> &'static [SystemField] {
    &SYSTEM_FIELDS
}

/// Index criteria: the field policy plus node selection rules.
///
/// Resolved once per run; it cannot change while a run is in progress.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexCriteria {
    /// Properties indexed for every content type.
    #[serde(default)]
    pub user_fields: Vec<FieldRule>,
    /// Additional properties per content-type alias. A rule here replaces a
    /// global rule with the same alias.
    #[serde(default)]
    pub type_fields: BTreeMap<String, Vec<FieldRule>>,
    /// When non-empty, only these aliases are indexed.
    #[serde(default)]
    pub include_node_types: Vec<String>,
    #[serde(default)]
    pub exclude_node_types: Vec<String>,
    /// Only index nodes below this node.
    #[serde(default)]
    pub parent_node_id: Option<i32>,
}

impl IndexCriteria {
    pub fn with_user_field(mut self, rule: FieldRule) -> Self {
        self.user_fields.push(rule);
        self
    }

    pub fn with_type_field(mut self, alias: impl Into<String>, rule: FieldRule) -> Self {
        self.type_fields.entry(alias.into()).or_default().push(rule);
        self
    }

    pub fn including(mut self, alias: impl Into<String>) -> Self {
        self.include_node_types.push(alias.into());
        self
    }

    pub fn excluding(mut self, alias: impl Into<String>) -> Self {
        self.exclude_node_types.push(alias.into());
        self
    }

    pub fn below(mut self, parent_node_id: i32) -> Self {
        self.parent_node_id = Some(parent_node_id);
        self
    }

    /// Whether nodes of this alias are selected by the include/exclude lists.
    pub fn accepts_type(&self, alias: &str) -> bool {
        if self.exclude_node_types.iter().any(|a| a == alias) {
            return false;
        }
        self.include_node_types.is_empty() || self.include_node_types.iter().any(|a| a == alias)
    }

    /// Ordered property rules for one content-type alias.
    ///
    /// Global rules come first in declaration order; type rules replace a
    /// global rule in place or are appended.
    pub fn rules_for(&self, alias: &str) -> Vec<FieldRule> {
        let mut rules = self.user_fields.clone();
        if let Some(type_rules) = self.type_fields.get(alias) {
            for rule in type_rules {
                match rules.iter_mut().find(|r| r.alias == rule.alias) {
                    Some(existing) => *existing = rule.clone(),
                    None => rules.push(rule.clone()),
                }
            }
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_rules_override_global_rules() {
        let criteria = IndexCriteria::default()
            .with_user_field(FieldRule::text("bodyText"))
            .with_user_field(FieldRule::text("umbracoFile"))
            .with_type_field("Image", FieldRule::integer("umbracoWidth"))
            .with_type_field("Image", FieldRule::integer("umbracoFile"));

        let rules = criteria.rules_for("Image");
        let aliases: Vec<_> = rules.iter().map(|r| r.alias.as_str()).collect();
        assert_eq!(aliases, vec!["bodyText", "umbracoFile", "umbracoWidth"]);
        assert_eq!(rules[1].field_type, FieldType::Integer);

        assert_eq!(criteria.rules_for("Folder").len(), 2);
    }

    #[test]
    fn test_accepts_type() {
        let open = IndexCriteria::default();
        assert!(open.accepts_type("Folder"));

        let criteria = IndexCriteria::default().including("Image").excluding("Folder");
        assert!(criteria.accepts_type("Image"));
        assert!(!criteria.accepts_type("Folder"));
        assert!(!criteria.accepts_type("File"));
    }

    #[test]
    fn test_criteria_from_json() {
        let json = r#"{
            "user_fields": [{ "alias": "bodyText" }],
            "type_fields": { "Image": [{ "alias": "umbracoWidth", "type": "integer" }] },
            "exclude_node_types": ["Folder"]
        }"#;
        let criteria: IndexCriteria = serde_json::from_str(json).unwrap();

        assert_eq!(criteria.user_fields[0].field_type, FieldType::Text);
        assert!(criteria.user_fields[0].options.tokenized);
        assert_eq!(criteria.rules_for("Image")[1].field_type, FieldType::Integer);
        assert!(!criteria.accepts_type("Folder"));
    }
}
