//! The index format shared by the writers and the read side.
//!
//! A snapshot holds the committed documents keyed by document id, plus an
//! inverted map from terms of tokenized fields to the ids containing them.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use unicode_segmentation::UnicodeSegmentation;

use content_index_shared::IndexDocument;

/// Version written into every snapshot.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Committed state of one index location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSnapshot {
    pub version: u32,
    documents: BTreeMap<String, IndexDocument>,
    terms: BTreeMap<String, BTreeSet<String>>,
}

impl Default for IndexSnapshot {
    fn default() -> Self {
        Self {
            version: INDEX_FORMAT_VERSION,
            documents: BTreeMap::new(),
            terms: BTreeMap::new(),
        }
    }
}

impl IndexSnapshot {
    /// Insert a document, replacing the one with the same id and its terms.
    pub fn upsert(&mut self, document: IndexDocument) {
        let id = document.document_id();

        if let Some(previous) = self.documents.remove(&id) {
            for term in document_terms(&previous) {
                if let Some(ids) = self.terms.get_mut(&term) {
                    ids.remove(&id);
                    if ids.is_empty() {
                        self.terms.remove(&term);
                    }
                }
            }
        }

        for term in document_terms(&document) {
            self.terms.entry(term).or_default().insert(id.clone());
        }
        self.documents.insert(id, document);
    }

    pub fn document(&self, document_id: &str) -> Option<&IndexDocument> {
        self.documents.get(document_id)
    }

    /// All documents, ordered by document id.
    pub fn documents(&self) -> impl Iterator<Item = &IndexDocument> {
        self.documents.values()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    /// Documents containing every term of `query` in a tokenized field.
    pub fn search(&self, query: &str) -> Vec<&IndexDocument> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Vec::new();
        }

        let mut matching: Option<BTreeSet<&String>> = None;
        for term in &terms {
            let ids: BTreeSet<&String> = match self.terms.get(term) {
                Some(ids) => ids.iter().collect(),
                None => return Vec::new(),
            };
            matching = Some(match matching {
                Some(current) => current.intersection(&ids).copied().collect(),
                None => ids,
            });
        }

        matching
            .unwrap_or_default()
            .into_iter()
            .filter_map(|id| self.documents.get(id))
            .collect()
    }

    /// Documents where any value of `field` renders exactly as `value`.
    pub fn find(&self, field: &str, value: &str) -> Vec<&IndexDocument> {
        self.documents
            .values()
            .filter(|doc| {
                doc.field(field)
                    .map_or(false, |f| f.values.iter().any(|v| v.to_string() == value))
            })
            .collect()
    }
}

/// Split text into lower-cased words.
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(|w| w.to_lowercase()).collect()
}

fn document_terms(document: &IndexDocument) -> BTreeSet<String> {
    document
        .fields
        .values()
        .filter(|field| field.options.tokenized)
        .flat_map(|field| field.values.iter())
        .filter_map(|value| value.as_text())
        .flat_map(tokenize)
        .collect()
}
