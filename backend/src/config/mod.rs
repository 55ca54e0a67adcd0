//! Policy Configuration Module
//!
//! Loads, merges, validates and persists the per-scope configuration
//! document. Reads resolve along the scope chain (campus -> institution ->
//! system default); writes merge a partial document over the current full
//! document, one top-level section at a time, and persist atomically only
//! after validation passes.
//!
//! Concurrency: last-writer-wins per scope key. Different scopes never
//! conflict; no cross-scope locking exists.

pub mod store;
pub mod validation;

// Re-export public API
pub use store::{ConfigError, ConfigSection, PolicyConfigStore};
pub use validation::{validate_document, validate_policy, Violation};
