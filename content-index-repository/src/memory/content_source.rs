//! In-memory content source.
//!
//! Holds a whole tree in export order and serves both fetch modes from it.
//! Used as the backing of the XML export source and as a test double.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::errors::SourceError;
use crate::interfaces::ContentSource;
use content_index_shared::{
    ContentNode, DescendantsQuery, Direction, LegacyExportQuery, OrderBy, Page,
};

/// A content or media tree held in memory.
#[derive(Debug)]
pub struct InMemoryContentSource {
    name: String,
    /// Depth-first, pre-order.
    nodes: Vec<ContentNode>,
    available: AtomicBool,
    latency: Option<Duration>,
    fetches: AtomicUsize,
}

impl InMemoryContentSource {
    /// Build a source from nodes in any order.
    ///
    /// Nodes are arranged depth-first with siblings ordered by sort order then
    /// id. Nodes whose parent is missing are treated as top-level.
    pub fn new(name: impl Into<String>, nodes: Vec<ContentNode>) -> Self {
        Self::from_export_order(name, tree_order(nodes))
    }

    /// Build a source from nodes already in export (pre-order) order.
    pub fn from_export_order(name: impl Into<String>, nodes: Vec<ContentNode>) -> Self {
        Self {
            name: name.into(),
            nodes,
            available: AtomicBool::new(true),
            latency: None,
            fetches: AtomicUsize::new(0),
        }
    }

    /// Delay every fetch by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Simulate the backing store going away or coming back.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of fetches served, successful or not.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[ContentNode] {
        &self.nodes
    }

    async fn begin_fetch(&self) -> Result<(), SourceError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if !self.available.load(Ordering::SeqCst) {
            return Err(SourceError::unavailable(format!(
                "{} store is not reachable",
                self.name
            )));
        }
        Ok(())
    }

    /// Compute one page of descendants without any I/O simulation.
    pub fn page(&self, query: &DescendantsQuery) -> Result<Page, SourceError> {
        if query.page_size == 0 {
            return Err(SourceError::invalid_cursor("page size must be positive"));
        }
        let offset = query.offset().ok_or_else(|| {
            SourceError::invalid_cursor(format!(
                "page {} of size {} overflows",
                query.page_index, query.page_size
            ))
        })?;

        let mut matching: Vec<(usize, &ContentNode)> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_descendant_of(query.root_id) && query.admits(node))
            .collect();

        matching.sort_by(|a, b| {
            let ordering = compare(a, b, query.order_by);
            match query.direction {
                Direction::Ascending => ordering,
                Direction::Descending => ordering.reverse(),
            }
        });

        let total_records = matching.len() as u64;
        if offset >= total_records {
            return Ok(Page::empty(total_records));
        }

        let nodes = matching
            .into_iter()
            .skip(offset as usize)
            .take(query.page_size)
            .map(|(_, node)| node.clone())
            .collect();

        Ok(Page {
            nodes,
            total_records,
        })
    }
}

fn compare(a: &(usize, &ContentNode), b: &(usize, &ContentNode), order_by: OrderBy) -> CmpOrdering {
    let (a_pos, a) = a;
    let (b_pos, b) = b;
    let by_key = match order_by {
        OrderBy::Path => CmpOrdering::Equal,
        OrderBy::SortOrder => a.sort_order.cmp(&b.sort_order),
        OrderBy::Id => a.id.cmp(&b.id),
        OrderBy::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        OrderBy::Level => a.level.cmp(&b.level),
        OrderBy::CreateDate => a.create_date.cmp(&b.create_date),
        OrderBy::UpdateDate => a.update_date.cmp(&b.update_date),
    };
    by_key.then(a_pos.cmp(b_pos))
}

/// Arrange nodes depth-first, siblings by sort order then id.
fn tree_order(nodes: Vec<ContentNode>) -> Vec<ContentNode> {
    let ids: HashSet<i32> = nodes.iter().map(|n| n.id).collect();
    let mut children: HashMap<Option<i32>, Vec<ContentNode>> = HashMap::new();
    for node in nodes {
        let parent = ids.contains(&node.parent_id).then_some(node.parent_id);
        children.entry(parent).or_default().push(node);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| (a.sort_order, a.id).cmp(&(b.sort_order, b.id)));
        siblings.reverse();
    }

    let mut ordered = Vec::with_capacity(ids.len());
    let mut stack: Vec<ContentNode> = children.remove(&None).unwrap_or_default();
    while let Some(node) = stack.pop() {
        if let Some(mut kids) = children.remove(&Some(node.id)) {
            stack.append(&mut kids);
        }
        ordered.push(node);
    }

    if !children.is_empty() {
        warn!(
            unreachable = children.values().map(Vec::len).sum::<usize>(),
            "Dropping nodes caught in a parent cycle"
        );
    }
    ordered
}

#[async_trait]
impl ContentSource for InMemoryContentSource {
    #[instrument(skip(self), fields(source = %self.name))]
    async fn fetch_all_by_legacy_export(
        &self,
        query: &LegacyExportQuery,
    ) -> Result<Vec<ContentNode>, SourceError> {
        self.begin_fetch().await?;

        Ok(self
            .nodes
            .iter()
            .filter(|node| node.is_descendant_of(query.root_id))
            .cloned()
            .collect())
    }

    #[instrument(skip(self), fields(source = %self.name))]
    async fn fetch_descendants(&self, query: &DescendantsQuery) -> Result<Page, SourceError> {
        self.begin_fetch().await?;
        let page = self.page(query)?;

        debug!(
            page_index = %query.page_index,
            returned = page.len(),
            total = page.total_records,
            "Served descendants page"
        );
        Ok(page)
    }
}
