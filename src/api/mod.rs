use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::message::{Message, Role};

pub mod models;

pub use models::ModelId;

/// Body of a `POST /responses` call. Built by [`crate::core::request`] and
/// never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    model: ModelId,
    input: Vec<Message>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolDeclaration>>,
}

impl ChatRequest {
    pub(crate) fn new(
        model: ModelId,
        input: Vec<Message>,
        stream: bool,
        tools: Option<Vec<ToolDeclaration>>,
    ) -> Self {
        Self {
            model,
            input,
            stream,
            tools,
        }
    }

    pub fn model(&self) -> &ModelId {
        &self.model
    }

    pub fn input(&self) -> &[Message] {
        &self.input
    }

    pub fn is_streaming(&self) -> bool {
        self.stream
    }

    pub fn tools(&self) -> Option<&[ToolDeclaration]> {
        self.tools.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolDeclaration {
    #[serde(rename = "type")]
    pub kind: String,
}

impl ToolDeclaration {
    pub fn new(kind: impl Into<String>) -> Self {
        Self { kind: kind.into() }
    }

    pub fn web_search() -> Self {
        Self::new("web_search")
    }
}

/// Non-streaming body of a responses call. Unknown fields are ignored and
/// everything the client does not strictly need is optional, so the same
/// type also decodes the `response` object embedded in completion events.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponsesResponse {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub created_at: Option<i64>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ResponsesResponse {
    /// Text of the first output item that carries any, with its text
    /// contents concatenated in order.
    pub fn output_text(&self) -> Option<String> {
        self.output
            .iter()
            .map(OutputItem::text)
            .find(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: Vec<OutputContent>,
}

impl OutputItem {
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|content| content.text.as_deref())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
    pub input_tokens_details: Option<TokensDetails>,
    pub output_tokens_details: Option<TokensDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokensDetails {
    pub cached_tokens: Option<u64>,
    pub reasoning_tokens: Option<u64>,
}

/// One `data:` payload of a streaming response. Fields whose shape varies
/// between event kinds stay as raw JSON so an unusual event never fails to
/// decode as a whole.
#[derive(Debug, Deserialize)]
pub struct StreamEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub delta: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub error: Option<Value>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `{"error": {...}}` body returned with non-2xx statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_omits_tools_when_absent() {
        let request = ChatRequest::new(
            ModelId::from("gpt-4o"),
            vec![Message::user("hi")],
            true,
            None,
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "input": [{"role": "user", "content": "hi"}],
                "stream": true
            })
        );
    }

    #[test]
    fn request_serializes_tool_declarations() {
        let request = ChatRequest::new(
            ModelId::from("gpt-4o"),
            vec![Message::user("hi")],
            false,
            Some(vec![ToolDeclaration::web_search()]),
        );
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["tools"], json!([{"type": "web_search"}]));
        assert_eq!(value["stream"], json!(false));
    }

    #[test]
    fn responses_body_decodes_and_exposes_text() {
        let body = json!({
            "id": "resp_1",
            "object": "response",
            "created_at": 1_700_000_000,
            "model": "gpt-4.1-mini",
            "output": [
                {"id": "ws_1", "type": "web_search_call", "status": "completed"},
                {
                    "id": "msg_1",
                    "type": "message",
                    "status": "completed",
                    "role": "assistant",
                    "content": [
                        {"type": "output_text", "text": "Check the "},
                        {"type": "output_text", "text": "gas cap."}
                    ]
                }
            ],
            "usage": {
                "input_tokens": 12,
                "output_tokens": 5,
                "total_tokens": 17,
                "input_tokens_details": {"cached_tokens": 0}
            }
        });

        let response: ResponsesResponse = serde_json::from_value(body).unwrap();
        assert_eq!(response.output_text().as_deref(), Some("Check the gas cap."));
        assert_eq!(response.output[1].role, Some(Role::Assistant));
        assert_eq!(response.usage.and_then(|u| u.total_tokens), Some(17));
    }

    #[test]
    fn output_text_is_none_without_text() {
        let response: ResponsesResponse =
            serde_json::from_value(json!({"id": "r", "model": "m", "output": []})).unwrap();
        assert!(response.output_text().is_none());
    }

    #[test]
    fn error_body_decodes_optional_fields() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error":{"message":"rate limited","type":"rate_limit_error"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.message, "rate limited");
        assert_eq!(body.error.kind.as_deref(), Some("rate_limit_error"));
        assert!(body.error.param.is_none());
        assert!(body.error.code.is_none());
    }
}
