//! Field mapper for the content indexer pipeline.
//!
//! Transforms content nodes into index documents.

mod coercion;
mod field_mapper;

pub use coercion::{coerce, WarningReason};
pub use field_mapper::{
    FieldCoercionWarning, FieldMapper, FieldPlan, MappedDocument, CREATOR_NAME_FIELD, ICON_FIELD,
    INDEX_TYPE_FIELD, NODE_TYPE_ALIAS_FIELD,
};
