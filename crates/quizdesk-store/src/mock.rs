//! In-memory session store for tests and throwaway sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use quizdesk_core::traits::SessionStore;

/// A session store that keeps everything in memory.
///
/// Counts writes so tests can assert that the identity service persisted
/// (or cleared) the session.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    values: Mutex<HashMap<String, String>>,
    save_count: AtomicU32,
    remove_count: AtomicU32,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with one entry.
    pub fn with_entry(key: &str, value: &str) -> Self {
        let store = Self::default();
        store
            .entries()
            .insert(key.to_string(), value.to_string());
        store
    }

    /// Number of `save` calls made.
    pub fn save_count(&self) -> u32 {
        self.save_count.load(Ordering::Relaxed)
    }

    /// Number of `remove` calls made.
    pub fn remove_count(&self) -> u32 {
        self.remove_count.load(Ordering::Relaxed)
    }

    /// Current value for `key`, without going through the async trait.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn load(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.peek(key))
    }

    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()> {
        self.save_count.fetch_add(1, Ordering::Relaxed);
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> anyhow::Result<()> {
        self.remove_count.fetch_add(1, Ordering::Relaxed);
        self.entries().remove(key);
        Ok(())
    }
}
