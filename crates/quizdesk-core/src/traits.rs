//! Core trait definitions for session storage and time.
//!
//! Session stores are implemented by the `quizdesk-store` crate; the clock
//! seam lets tests control `submitted_at` ordering.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

// ---------------------------------------------------------------------------
// Session store trait
// ---------------------------------------------------------------------------

/// Key under which the authenticated account is cached.
pub const SESSION_KEY: &str = "user";

/// Durable client-side key/value storage for the session cache.
///
/// Values are opaque strings; the identity service stores JSON in them.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Human-readable store name (e.g. "file").
    fn name(&self) -> &str;

    /// Read the value stored under `key`, if any.
    async fn load(&self, key: &str) -> anyhow::Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn save(&self, key: &str, value: &str) -> anyhow::Result<()>;

    /// Delete `key`. Deleting a missing key is not an error.
    async fn remove(&self, key: &str) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Clock trait
// ---------------------------------------------------------------------------

/// Source of submission timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that starts at a fixed instant and advances by a fixed step on
/// every reading.
#[derive(Debug)]
pub struct SteppingClock {
    next: Mutex<DateTime<Utc>>,
    step: Duration,
}

impl SteppingClock {
    pub fn new(start: DateTime<Utc>, step: Duration) -> Self {
        Self {
            next: Mutex::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut next = self
            .next
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let current = *next;
        *next = current + self.step;
        current
    }
}
