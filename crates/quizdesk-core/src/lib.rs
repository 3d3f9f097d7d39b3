//! quizdesk-core: identity, catalog, scoring, and analytics.
//!
//! This crate defines the data model, the session-store seam, and the two
//! services the presentation layer drives: [`IdentityService`] and
//! [`CatalogService`].

pub mod catalog;
pub mod error;
pub mod identity;
pub mod model;
pub mod parser;
pub mod scoring;
pub mod seed;
pub mod statistics;
pub mod traits;

pub use catalog::{CatalogService, ResultFilter};
pub use identity::IdentityService;
