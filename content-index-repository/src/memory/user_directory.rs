use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::SourceError;
use crate::interfaces::UserDirectory;

/// User profiles held in a map keyed by user id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserDirectory {
    profiles: HashMap<i32, String>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, user_id: i32, name: impl Into<String>) -> Self {
        self.profiles.insert(user_id, name.into());
        self
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn profile_name(&self, user_id: i32) -> Result<Option<String>, SourceError> {
        Ok(self.profiles.get(&user_id).cloned())
    }
}
