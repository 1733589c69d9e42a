//! Field mapper implementation.
//!
//! Turns a content node plus its resolved content type into an index document.

use tracing::{debug, instrument};

use crate::mapper::coercion::{coerce, WarningReason};
use content_index_shared::{
    system_fields, ContentNode, ContentType, FieldOptions, FieldRule, FieldType, FieldValue,
    IndexCriteria, IndexDocument,
};

pub const INDEX_TYPE_FIELD: &str = "__IndexType";
pub const NODE_TYPE_ALIAS_FIELD: &str = "__NodeTypeAlias";
pub const ICON_FIELD: &str = "__Icon";
pub const CREATOR_NAME_FIELD: &str = "creatorName";

/// A content type with the ordered property rules that apply to it.
///
/// Built once per type per run.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPlan {
    pub content_type: ContentType,
    pub rules: Vec<FieldRule>,
}

impl FieldPlan {
    pub fn alias(&self) -> &str {
        &self.content_type.alias
    }
}

/// A property that was left out of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldCoercionWarning {
    pub node_id: i32,
    pub field: String,
    pub reason: WarningReason,
}

/// The mapper's output: the document plus the fields it had to leave out.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedDocument {
    pub document: IndexDocument,
    pub warnings: Vec<FieldCoercionWarning>,
}

/// Maps nodes to documents according to the index criteria.
///
/// Mapping is pure: identical input always yields identical documents.
#[derive(Debug, Clone, Default)]
pub struct FieldMapper {
    criteria: IndexCriteria,
}

impl FieldMapper {
    pub fn new(criteria: IndexCriteria) -> Self {
        Self { criteria }
    }

    pub fn criteria(&self) -> &IndexCriteria {
        &self.criteria
    }

    /// Build the field plan for a resolved content type.
    pub fn plan_for(&self, content_type: ContentType) -> FieldPlan {
        let rules = self.criteria.rules_for(&content_type.alias);
        debug!(
            alias = %content_type.alias,
            rules = rules.len(),
            "Built field plan"
        );
        FieldPlan {
            content_type,
            rules,
        }
    }

    /// Map one node to a document.
    ///
    /// # Arguments
    ///
    /// * `node` - The node to map
    /// * `plan` - The plan of the node's content type
    /// * `creator_name` - Display name of the node's creator, if known
    ///
    /// # Returns
    ///
    /// The document with every system field and each policy field that could
    /// be coerced, plus one warning per policy field that was left out.
    #[instrument(skip_all, fields(node_id = node.id))]
    pub fn map_to_document(
        &self,
        node: &ContentNode,
        plan: &FieldPlan,
        creator_name: Option<&str>,
    ) -> MappedDocument {
        let mut document = IndexDocument::new(node.id, node.index_type());
        self.add_system_fields(&mut document, node, plan, creator_name);

        let mut warnings = Vec::new();
        for rule in &plan.rules {
            let mut warn = |reason: WarningReason| {
                warnings.push(FieldCoercionWarning {
                    node_id: node.id,
                    field: rule.alias.clone(),
                    reason,
                })
            };

            if is_reserved(&rule.alias) {
                warn(WarningReason::Reserved);
                continue;
            }

            let declared = plan.content_type.declares(&rule.alias);
            let value = match (node.properties.get(&rule.alias), declared) {
                (Some(value), true) => value,
                (Some(_), false) => {
                    warn(WarningReason::Undeclared);
                    continue;
                }
                (None, true) => {
                    warn(WarningReason::Missing);
                    continue;
                }
                // Rule does not apply to this content type.
                (None, false) => continue,
            };

            match coerce(value, rule.field_type) {
                Ok(Some(field)) => document.set(rule.alias.clone(), field, rule.options),
                Ok(None) => warn(WarningReason::Missing),
                Err(reason) => warn(reason),
            }
        }

        MappedDocument { document, warnings }
    }

    fn add_system_fields(
        &self,
        document: &mut IndexDocument,
        node: &ContentNode,
        plan: &FieldPlan,
        creator_name: Option<&str>,
    ) {
        for field in system_fields() {
            let value = match field.name {
                "id" => FieldValue::Integer(i64::from(node.id)),
                "parentID" => FieldValue::Integer(i64::from(node.parent_id)),
                "level" => FieldValue::Integer(i64::from(node.level)),
                "path" => FieldValue::Text(node.path.clone()),
                "sortOrder" => FieldValue::Integer(i64::from(node.sort_order)),
                "createDate" => FieldValue::Date(node.create_date),
                "updateDate" => FieldValue::Date(node.update_date),
                "nodeName" => FieldValue::Text(node.name.clone()),
                "nodeTypeAlias" => FieldValue::Text(plan.alias().to_string()),
                "creatorID" => FieldValue::Integer(i64::from(node.creator_id)),
                _ => continue,
            };
            debug_assert_eq!(value_type(&value), field.field_type);
            document.set(field.name, value, field.options);
        }

        document.set(
            INDEX_TYPE_FIELD,
            FieldValue::Text(node.index_type().as_str().to_string()),
            FieldOptions::keyword(),
        );
        document.set(
            NODE_TYPE_ALIAS_FIELD,
            FieldValue::Text(plan.alias().to_lowercase()),
            FieldOptions::keyword(),
        );
        if !plan.content_type.icon.is_empty() {
            document.set(
                ICON_FIELD,
                FieldValue::Text(plan.content_type.icon.clone()),
                FieldOptions::keyword(),
            );
        }
        if let Some(name) = creator_name {
            document.set(
                CREATOR_NAME_FIELD,
                FieldValue::Text(name.to_string()),
                FieldOptions::analyzed(),
            );
        }
    }
}

fn is_reserved(alias: &str) -> bool {
    system_fields().iter().any(|f| f.name == alias)
        || alias.starts_with("__")
        || alias == CREATOR_NAME_FIELD
}

fn value_type(value: &FieldValue) -> FieldType {
    match value {
        FieldValue::Text(_) => FieldType::Text,
        FieldValue::Integer(_) => FieldType::Integer,
        FieldValue::Date(_) => FieldType::Date,
    }
}
