//! Single-writer locks on index locations.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::errors::WriteError;

/// The set of index locations that currently have an open writer.
#[derive(Debug, Clone, Default)]
pub struct LocationLocks {
    held: Arc<Mutex<HashSet<String>>>,
}

impl LocationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the lock on `location`, failing if a writer already holds it.
    pub fn acquire(&self, location: &str) -> Result<LocationGuard, WriteError> {
        let mut held = self
            .held
            .lock()
            .map_err(|e| WriteError::corrupted(format!("Lock table poisoned: {}", e)))?;

        if !held.insert(location.to_string()) {
            return Err(WriteError::locked(location));
        }

        debug!(location = %location, "Acquired index location");
        Ok(LocationGuard {
            location: location.to_string(),
            held: Arc::clone(&self.held),
        })
    }

    pub fn is_held(&self, location: &str) -> bool {
        self.held
            .lock()
            .map(|held| held.contains(location))
            .unwrap_or(false)
    }
}

/// Releases its location when dropped.
#[derive(Debug)]
pub struct LocationGuard {
    location: String,
    held: Arc<Mutex<HashSet<String>>>,
}

impl LocationGuard {
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl Drop for LocationGuard {
    fn drop(&mut self) {
        if let Ok(mut held) = self.held.lock() {
            held.remove(&self.location);
            debug!(location = %self.location, "Released index location");
        }
    }
}
