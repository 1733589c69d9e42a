//! # Content Index Shared
//!
//! Shared types for the content indexer: the content tree model, content
//! types, field policies, paging cursors and the documents written to the
//! search index.

mod content_type;
mod document;
mod node;
mod paging;
mod policy;
mod timestamp;

pub use content_type::ContentType;
pub use document::{FieldValue, IndexDocument, IndexField};
pub use node::{ContentNode, IndexType, NodeKind, PropertyValue, ROOT_ID};
pub use paging::{
    CursorError, DescendantsQuery, Direction, LegacyExportQuery, NodeFilter, OrderBy, Page,
    PageIndex,
};
pub use policy::{system_fields, FieldOptions, FieldRule, FieldType, IndexCriteria, SystemField};
pub use timestamp::parse_timestamp;
