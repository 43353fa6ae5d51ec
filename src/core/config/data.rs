use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Contents of `config.toml`. Every field is optional; see `defaults.rs`
/// for what an unset field resolves to.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Model used when `--model` is not given (e.g., "gpt-4o")
    pub model: Option<String>,
    /// API base URL; `OPENAI_BASE_URL` takes precedence
    pub base_url: Option<String>,
    /// Instructions prepended to every turn
    pub system_prompt: Option<String>,
    /// Instructions prepended to summarization requests
    pub summary_prompt: Option<String>,
    /// Assistant message the transcript starts with; empty disables it
    pub greeting: Option<String>,
    /// Offer the web search tool on streaming turns
    pub web_search: Option<bool>,
    /// Budget for models with no entry in `context_thresholds` or the
    /// built-in catalog
    pub default_context_threshold: Option<u64>,
    /// Per-model budget overrides, keyed by model id
    #[serde(default)]
    pub context_thresholds: HashMap<String, u64>,
    pub connect_timeout_secs: Option<u64>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
