use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::ResolveError;
use crate::interfaces::ContentTypeResolver;
use content_index_shared::ContentType;

/// Content types held in a map keyed by id.
#[derive(Debug)]
pub struct InMemoryContentTypeResolver {
    types: HashMap<i32, ContentType>,
    available: AtomicBool,
    lookups: AtomicUsize,
}

impl InMemoryContentTypeResolver {
    pub fn new() -> Self {
        Self::from_types(Vec::new())
    }

    pub fn from_types(types: impl IntoIterator<Item = ContentType>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.id, t)).collect(),
            available: AtomicBool::new(true),
            lookups: AtomicUsize::new(0),
        }
    }

    pub fn insert(&mut self, content_type: ContentType) {
        self.types.insert(content_type.id, content_type);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of `resolve` calls served.
    pub fn lookup_count(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for InMemoryContentTypeResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentTypeResolver for InMemoryContentTypeResolver {
    async fn resolve(&self, type_id: i32) -> Result<ContentType, ResolveError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if !self.available.load(Ordering::SeqCst) {
            return Err(ResolveError::unavailable("schema store is not reachable"));
        }

        self.types
            .get(&type_id)
            .cloned()
            .ok_or(ResolveError::UnknownType(type_id))
    }
}
