//! quizdesk-store: session storage backends and configuration.
//!
//! Implements the `SessionStore` trait with a JSON file store and an
//! in-memory store, and loads the application configuration that picks
//! between them.

pub mod config;
pub mod error;
pub mod file;
pub mod mock;

pub use config::{create_store, load_config, QuizdeskConfig, StoreConfig};
pub use error::StoreError;
pub use file::FileSessionStore;
pub use mock::MemorySessionStore;
