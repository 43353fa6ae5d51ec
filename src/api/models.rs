//! Model identifiers and the built-in catalog of context thresholds.
//!
//! The catalog is embedded from `builtin_models.toml` at build time. Each
//! entry carries the approximate token budget a conversation may reach
//! before it is summarized.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Budget used for models missing from both the catalog and the config.
pub const DEFAULT_CONTEXT_THRESHOLD: u64 = 8192;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModelId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for ModelId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinModel {
    pub id: String,
    pub display_name: String,
    pub context_threshold: u64,
    pub knowledge_cutoff: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuiltinModelsConfig {
    models: Vec<BuiltinModel>,
}

/// Load built-in models from the embedded catalog
pub fn load_builtin_models() -> Vec<BuiltinModel> {
    const CATALOG: &str = include_str!("../builtin_models.toml");

    let config: BuiltinModelsConfig =
        toml::from_str(CATALOG).expect("Failed to parse builtin_models.toml");

    config.models
}

/// Find a built-in model by ID (case-insensitive)
pub fn find_builtin_model(id: &str) -> Option<BuiltinModel> {
    load_builtin_models()
        .into_iter()
        .find(|model| model.id.eq_ignore_ascii_case(id))
}

pub fn builtin_context_threshold(model: &ModelId) -> Option<u64> {
    find_builtin_model(model.as_str()).map(|model| model.context_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_lists_expected_models() {
        let ids: Vec<String> = load_builtin_models().into_iter().map(|m| m.id).collect();
        for expected in ["gpt-3.5-turbo", "gpt-4o", "gpt-4-turbo", "gpt-4.1-mini"] {
            assert!(ids.iter().any(|id| id == expected), "missing {expected}");
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let model = find_builtin_model("GPT-4o").expect("gpt-4o");
        assert_eq!(model.id, "gpt-4o");
        assert!(find_builtin_model("not-a-model").is_none());
    }

    #[test]
    fn thresholds_come_from_the_catalog() {
        assert_eq!(
            builtin_context_threshold(&ModelId::from("gpt-3.5-turbo")),
            Some(4096)
        );
        assert_eq!(
            builtin_context_threshold(&ModelId::from("gpt-4-turbo")),
            Some(128_000)
        );
        assert_eq!(builtin_context_threshold(&ModelId::from("mystery")), None);
    }

    #[test]
    fn every_entry_has_a_positive_threshold() {
        for model in load_builtin_models() {
            assert!(!model.display_name.is_empty());
            assert!(model.context_threshold > 0, "{} has no budget", model.id);
        }
    }
}
