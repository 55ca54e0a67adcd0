//! Per-scope configuration store
//!
//! Reads resolve the scope chain; writes merge, validate, stamp and save.
//! The store never persists a document that failed validation.

use std::sync::Arc;

use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::validation::{validate_document, Violation};
use crate::core::clock::Clock;
use crate::models::policy::{ConfigScope, InstitutionConfig};
use crate::repo::{PolicyConfigRepository, RepositoryError};

/// Named top-level sections of the configuration document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSection {
    General,
    LateFees,
    Receipts,
    Notifications,
    Reporting,
    System,
}

impl ConfigSection {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigSection::General => "general",
            ConfigSection::LateFees => "late_fees",
            ConfigSection::Receipts => "receipts",
            ConfigSection::Notifications => "notifications",
            ConfigSection::Reporting => "reporting",
            ConfigSection::System => "system",
        }
    }
}

/// Configuration store errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The merged document violates the schema or business rules; nothing
    /// was persisted
    #[error("configuration rejected with {} violation(s)", .0.len())]
    Validation(Vec<Violation>),

    /// The `system` section is stamped by the store and cannot be written
    /// directly
    #[error("section '{0}' is maintained by the engine and is read-only")]
    ReadOnlySection(&'static str),

    #[error("configuration document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Loads, merges, validates and persists per-scope policy documents
pub struct PolicyConfigStore {
    repo: Arc<dyn PolicyConfigRepository>,
    clock: Arc<dyn Clock>,
}

impl PolicyConfigStore {
    pub fn new(repo: Arc<dyn PolicyConfigRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Most specific saved document for the scope, falling back to the
    /// system default if no document exists anywhere in the chain
    pub async fn get_configuration(
        &self,
        scope: &ConfigScope,
    ) -> Result<InstitutionConfig, ConfigError> {
        for candidate in scope.scope_chain() {
            if let Some(document) = self.repo.load(&candidate).await? {
                debug!(scope = %candidate.scope_key(), "configuration resolved");
                return Ok(serde_json::from_value(document)?);
            }
        }
        Ok(InstitutionConfig::system_default(self.clock.now()))
    }

    /// Merge a partial document over the current one, validate, stamp and
    /// persist
    ///
    /// The merge is shallow per top-level section: fields of a section given
    /// in `partial` override the current section's fields one level deep;
    /// nested objects and arrays are replaced whole, never element-merged.
    /// Returns the new full document. On validation failure nothing is
    /// written.
    pub async fn update_configuration(
        &self,
        partial: Value,
        scope: &ConfigScope,
        updated_by: &str,
    ) -> Result<InstitutionConfig, ConfigError> {
        if partial
            .as_object()
            .is_some_and(|sections| sections.contains_key("system"))
        {
            return Err(ConfigError::ReadOnlySection("system"));
        }

        let current = self.get_configuration(scope).await?;
        let mut merged_value = serde_json::to_value(&current)?;
        merge_sections(&mut merged_value, partial);

        let mut merged: InstitutionConfig = serde_json::from_value(merged_value)?;
        merged.system.version = current.system.version + 1;
        merged.system.last_updated = self.clock.now();
        merged.system.updated_by = updated_by.to_string();

        validate_document(&merged).map_err(ConfigError::Validation)?;

        self.repo
            .save(scope, &serde_json::to_value(&merged)?)
            .await?;
        Ok(merged)
    }

    /// One named section of the resolved document
    pub async fn get_section(
        &self,
        scope: &ConfigScope,
        section: ConfigSection,
    ) -> Result<Value, ConfigError> {
        let document = self.get_configuration(scope).await?;
        let value = serde_json::to_value(&document)?;
        Ok(value
            .get(section.name())
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Replace one named section (shallow-merged like any partial update)
    pub async fn update_section(
        &self,
        scope: &ConfigScope,
        section: ConfigSection,
        value: Value,
        updated_by: &str,
    ) -> Result<InstitutionConfig, ConfigError> {
        if section == ConfigSection::System {
            return Err(ConfigError::ReadOnlySection("system"));
        }
        let partial = json!({ section.name(): value });
        self.update_configuration(partial, scope, updated_by).await
    }
}

/// Shallow merge per top-level section: `partial`'s sections override the
/// current document's sections field-by-field, one level deep.
fn merge_sections(current: &mut Value, partial: Value) {
    let Some(sections) = current.as_object_mut() else {
        return;
    };
    let Value::Object(partial_sections) = partial else {
        return;
    };

    for (section, incoming) in partial_sections {
        match incoming {
            Value::Object(fields) => {
                if let Some(existing) = sections.get_mut(&section).and_then(Value::as_object_mut) {
                    for (key, value) in fields {
                        existing.insert(key, value);
                    }
                } else {
                    sections.insert(section, Value::Object(fields));
                }
            }
            other => {
                sections.insert(section, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_preserves_untouched_section_fields() {
        let mut current = json!({
            "late_fees": {"enabled": true, "min_amount": 100},
            "general": {"timezone": "UTC"}
        });
        merge_sections(&mut current, json!({"late_fees": {"min_amount": 500}}));
        assert_eq!(current["late_fees"]["enabled"], true);
        assert_eq!(current["late_fees"]["min_amount"], 500);
        assert_eq!(current["general"]["timezone"], "UTC");
    }

    #[test]
    fn test_merge_replaces_nested_objects_whole() {
        let mut current = json!({
            "late_fees": {"calculation": {"type": "fixed", "amount": 1000}}
        });
        merge_sections(
            &mut current,
            json!({"late_fees": {"calculation": {"type": "percentage", "rate": 5.0}}}),
        );
        // No deep merge: the old "amount" field is gone
        assert_eq!(
            current["late_fees"]["calculation"],
            json!({"type": "percentage", "rate": 5.0})
        );
    }

    #[test]
    fn test_merge_inserts_new_section() {
        let mut current = json!({"late_fees": {}});
        merge_sections(&mut current, json!({"receipts": {"footer": "thanks"}}));
        assert_eq!(current["receipts"]["footer"], "thanks");
    }
}
