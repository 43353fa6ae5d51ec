use std::time::Duration;

use crate::api::models::{builtin_context_threshold, DEFAULT_CONTEXT_THRESHOLD};
use crate::api::{ModelId, ToolDeclaration};
use crate::core::config::data::Config;
use crate::core::conversation::{ConversationSettings, DEFAULT_GREETING};
use crate::core::http::DEFAULT_CONNECT_TIMEOUT;
use crate::core::message::{system_context, Message};

pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a virtual automotive assistant focused on car maintenance, troubleshooting, diagnostics, and upgrades.
Respond only to questions about passenger vehicles or light trucks, including maintenance schedules, repair steps, recommended parts, safety considerations, and performance improvements.
If a request falls outside automotive topics, reply that you can only assist with car-related questions.
Provide concise, step-by-step guidance when appropriate, request clarification if key details are missing, and encourage consulting a certified mechanic for critical safety issues.
Do not answer or speculate about any non-automotive subjects.";

pub const DEFAULT_SUMMARY_PROMPT: &str = "Summarize the following conversation between a user and an automotive assistant into key points, focusing
on car maintenance, troubleshooting, diagnostics, and upgrades. Provide a concise summary that captures the main topics discussed.
Conversation:";

impl Config {
    /// `--model` wins over the configured model, which wins over the default.
    pub fn model_id(&self, cli_model: Option<&str>) -> ModelId {
        cli_model
            .or(self.model.as_deref())
            .map(str::trim)
            .filter(|model| !model.is_empty())
            .map(ModelId::from)
            .unwrap_or_else(|| ModelId::from(DEFAULT_MODEL))
    }

    pub fn base_url(&self, env_base_url: Option<&str>) -> String {
        env_base_url
            .or(self.base_url.as_deref())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Per-model override, then the built-in catalog, then the configured
    /// default, then the crate default.
    pub fn context_threshold_for(&self, model: &ModelId) -> u64 {
        self.context_thresholds
            .iter()
            .find(|(id, _)| id.eq_ignore_ascii_case(model.as_str()))
            .map(|(_, threshold)| *threshold)
            .or_else(|| builtin_context_threshold(model))
            .or(self.default_context_threshold)
            .unwrap_or(DEFAULT_CONTEXT_THRESHOLD)
    }

    pub fn system_prompt(&self) -> &str {
        self.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }

    pub fn summary_prompt(&self) -> &str {
        self.summary_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SUMMARY_PROMPT)
    }

    pub fn greeting(&self) -> &str {
        self.greeting.as_deref().unwrap_or(DEFAULT_GREETING)
    }

    pub fn web_search_enabled(&self) -> bool {
        self.web_search.unwrap_or(true)
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT)
    }

    pub fn conversation_settings(&self, model: ModelId) -> ConversationSettings {
        let threshold = self.context_threshold_for(&model);
        let tools = if self.web_search_enabled() {
            vec![ToolDeclaration::web_search()]
        } else {
            Vec::new()
        };

        ConversationSettings::new(model)
            .with_context(prompt_context(self.system_prompt()))
            .with_summary_context(prompt_context(self.summary_prompt()))
            .with_context_threshold(threshold)
            .with_tools(tools)
    }
}

fn prompt_context(prompt: &str) -> Vec<Message> {
    if prompt.trim().is_empty() {
        Vec::new()
    } else {
        system_context([prompt])
    }
}
