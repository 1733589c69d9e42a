//! Cursors and queries for the two fetch modes of a content source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::node::{ContentNode, ROOT_ID};

/// A page index was built from a negative number.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("page index must not be negative, got {0}")]
pub struct CursorError(pub i64);

/// Zero-based page index.
///
/// Both 32-bit and 64-bit cursors convert into this type, so a single
/// paged-fetch method serves callers of either width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PageIndex(u64);

impl PageIndex {
    pub const FIRST: PageIndex = PageIndex(0);

    pub fn get(&self) -> u64 {
        self.0
    }

    pub fn next(&self) -> PageIndex {
        PageIndex(self.0.saturating_add(1))
    }
}

impl From<u32> for PageIndex {
    fn from(value: u32) -> Self {
        PageIndex(u64::from(value))
    }
}

impl From<u64> for PageIndex {
    fn from(value: u64) -> Self {
        PageIndex(value)
    }
}

impl TryFrom<i32> for PageIndex {
    type Error = CursorError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        PageIndex::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for PageIndex {
    type Error = CursorError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(PageIndex)
            .map_err(|_| CursorError(value))
    }
}

impl fmt::Display for PageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Field a descendants page is ordered by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderBy {
    /// Tree order, as emitted by the legacy export.
    #[default]
    Path,
    SortOrder,
    Id,
    Name,
    Level,
    CreateDate,
    UpdateDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// Structured filter applied by the source before paging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeFilter {
    ContentTypes(Vec<i32>),
    NameContains(String),
    UpdatedSince(DateTime<Utc>),
    All(Vec<NodeFilter>),
}

impl NodeFilter {
    pub fn matches(&self, node: &ContentNode) -> bool {
        match self {
            NodeFilter::ContentTypes(ids) => ids.contains(&node.content_type_id),
            NodeFilter::NameContains(needle) => node
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            NodeFilter::UpdatedSince(since) => node.update_date >= *since,
            NodeFilter::All(filters) => filters.iter().all(|f| f.matches(node)),
        }
    }
}

/// Selects the subtree returned by a legacy whole-tree export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyExportQuery {
    pub root_id: i32,
}

impl LegacyExportQuery {
    /// The whole tree.
    pub fn all() -> Self {
        Self { root_id: ROOT_ID }
    }

    pub fn below(root_id: i32) -> Self {
        Self { root_id }
    }
}

impl Default for LegacyExportQuery {
    fn default() -> Self {
        Self::all()
    }
}

/// One request for a page of a subtree's descendants.
#[derive(Debug, Clone, PartialEq)]
pub struct DescendantsQuery {
    pub root_id: i32,
    pub page_index: PageIndex,
    pub page_size: usize,
    pub order_by: OrderBy,
    pub direction: Direction,
    /// Only return published content. Media is unaffected.
    pub published_only: bool,
    pub filter: Option<NodeFilter>,
}

impl DescendantsQuery {
    pub fn new(root_id: i32, page_index: impl Into<PageIndex>, page_size: usize) -> Self {
        Self {
            root_id,
            page_index: page_index.into(),
            page_size,
            order_by: OrderBy::default(),
            direction: Direction::default(),
            published_only: false,
            filter: None,
        }
    }

    pub fn ordered_by(mut self, order_by: OrderBy, direction: Direction) -> Self {
        self.order_by = order_by;
        self.direction = direction;
        self
    }

    pub fn published_only(mut self, published_only: bool) -> Self {
        self.published_only = published_only;
        self
    }

    pub fn with_filter(mut self, filter: NodeFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// The same query for the following page.
    pub fn next_page(&self) -> Self {
        Self {
            page_index: self.page_index.next(),
            ..self.clone()
        }
    }

    /// Number of records before this page, `None` on overflow.
    pub fn offset(&self) -> Option<u64> {
        self.page_index.get().checked_mul(self.page_size as u64)
    }

    /// Whether a node passes the publish and structured filters.
    pub fn admits(&self, node: &ContentNode) -> bool {
        if self.published_only && node.published() == Some(false) {
            return false;
        }
        self.filter.as_ref().map_or(true, |f| f.matches(node))
    }
}

/// One page of descendants plus the authoritative total for the query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub nodes: Vec<ContentNode>,
    pub total_records: u64,
}

impl Page {
    pub fn empty(total_records: u64) -> Self {
        Self {
            nodes: Vec::new(),
            total_records,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether a page after `query`'s page exists.
    pub fn has_next(&self, query: &DescendantsQuery) -> bool {
        match query.next_page().offset() {
            Some(next_offset) => query.page_size > 0 && next_offset < self.total_records,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_index_conversions() {
        assert_eq!(PageIndex::from(3u32).get(), 3);
        assert_eq!(PageIndex::try_from(7i64).map(|p| p.get()), Ok(7));
        assert_eq!(PageIndex::try_from(-1i32), Err(CursorError(-1)));
        assert_eq!(PageIndex::try_from(i64::MIN), Err(CursorError(i64::MIN)));
    }

    #[test]
    fn test_cursor_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(CursorError(-4));
        assert_eq!(err.to_string(), "page index must not be negative, got -4");
    }

    #[test]
    fn test_has_next_uses_total_records() {
        let query = DescendantsQuery::new(ROOT_ID, 0u32, 1);
        let page = Page::empty(2);
        assert!(page.has_next(&query));
        assert!(!page.has_next(&query.next_page()));

        let wide = DescendantsQuery::new(ROOT_ID, 0u32, 10);
        assert!(!Page::empty(10).has_next(&wide));
        assert!(Page::empty(11).has_next(&wide));
    }

    #[test]
    fn test_admits_applies_publish_filter_to_content_only() {
        let query = DescendantsQuery::new(ROOT_ID, 0u32, 10).published_only(true);

        let draft = ContentNode::content(1, "Draft", 1044).unpublished();
        let image = ContentNode::media(2, "Image", 1032);
        assert!(!query.admits(&draft));
        assert!(query.admits(&image));
    }

    #[test]
    fn test_node_filter() {
        let node = ContentNode::media(1032, "Sunset Photo", 1032);

        assert!(NodeFilter::NameContains("sunset".into()).matches(&node));
        assert!(NodeFilter::ContentTypes(vec![1031, 1032]).matches(&node));
        assert!(!NodeFilter::All(vec![
            NodeFilter::ContentTypes(vec![1032]),
            NodeFilter::NameContains("dawn".into()),
        ])
        .matches(&node));
    }
}
