//! Error types shared by the request, streaming and summarization paths.

use std::error::Error as StdError;
use std::fmt;

use crate::api::{ApiErrorBody, ApiErrorDetail};

/// A non-2xx response, with the decoded error object when the body had the
/// usual `{"error": {...}}` shape and the raw body otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status_code: Option<u16>,
    pub parsed: Option<ApiErrorDetail>,
    pub raw_body: Option<String>,
}

impl ApiError {
    pub fn from_body(status_code: Option<u16>, body: &str) -> Self {
        let trimmed = body.trim();
        let parsed = serde_json::from_str::<ApiErrorBody>(trimmed)
            .ok()
            .map(|body| body.error);
        let raw_body = (!trimmed.is_empty()).then(|| trimmed.to_string());

        Self {
            status_code,
            parsed,
            raw_body,
        }
    }

    pub fn message(&self) -> Option<&str> {
        self.parsed.as_ref().map(|detail| detail.message.as_str())
    }

    /// Short, single-line description suitable for a status line.
    pub fn summary(&self) -> String {
        if let Some(message) = self.message() {
            return collapse_whitespace(message);
        }

        let Some(raw) = self.raw_body.as_deref() else {
            return "<empty>".to_string();
        };

        serde_json::from_str::<serde_json::Value>(raw)
            .ok()
            .and_then(|value| extract_error_summary(&value))
            .unwrap_or_else(|| collapse_whitespace(raw))
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .or_else(|| value.get("error").and_then(|v| v.as_str()))
        .or_else(|| value.get("message").and_then(|v| v.as_str()))
        .map(collapse_whitespace)
        .filter(|summary| !summary.is_empty())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(status) => write!(f, "API error (status {status}): {}", self.summary()),
            None => write!(f, "API error: {}", self.summary()),
        }
    }
}

impl StdError for ApiError {}

/// Everything that can go wrong between building a request and consuming
/// its response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Connection-level failure, before or while reading the body.
    Transport(String),
    /// Non-2xx status.
    Api(ApiError),
    /// An explicit error event inside an otherwise healthy stream.
    Stream(String),
    /// The request could not be built.
    InvalidRequest(String),
    /// A 2xx body that could not be decoded or carried no usable text.
    InvalidResponse(String),
}

impl ClientError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            ClientError::Api(error) => Some(error),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Transport(message) => write!(f, "Transport error: {message}"),
            ClientError::Api(error) => write!(f, "{error}"),
            ClientError::Stream(message) => write!(f, "Stream error: {message}"),
            ClientError::InvalidRequest(message) => write!(f, "Invalid request: {message}"),
            ClientError::InvalidResponse(message) => write!(f, "Invalid response: {message}"),
        }
    }
}

impl StdError for ClientError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ClientError::Api(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ApiError> for ClientError {
    fn from(value: ApiError) -> Self {
        ClientError::Api(value)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        ClientError::Transport(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_error_bodies() {
        let error = ApiError::from_body(
            Some(400),
            r#"{"error":{"message":"bad  input","type":"invalid_request_error","param":"input","code":"invalid_value"}}"#,
        );
        let detail = error.parsed.as_ref().expect("parsed");
        assert_eq!(detail.param.as_deref(), Some("input"));
        assert_eq!(detail.code.as_deref(), Some("invalid_value"));
        assert_eq!(error.summary(), "bad input");
        assert_eq!(error.to_string(), "API error (status 400): bad input");
    }

    #[test]
    fn keeps_raw_body_when_shape_is_unknown() {
        let error = ApiError::from_body(Some(502), "<html>Bad Gateway</html>\n");
        assert!(error.parsed.is_none());
        assert_eq!(error.raw_body.as_deref(), Some("<html>Bad Gateway</html>"));
        assert_eq!(error.summary(), "<html>Bad Gateway</html>");
    }

    #[test]
    fn summarizes_loose_json_errors() {
        let error = ApiError::from_body(Some(500), r#"{"error":"overloaded"}"#);
        assert!(error.parsed.is_none());
        assert_eq!(error.summary(), "overloaded");

        let error = ApiError::from_body(None, r#"{"message":"try later"}"#);
        assert_eq!(error.to_string(), "API error: try later");
    }

    #[test]
    fn empty_bodies_have_no_raw_text() {
        let error = ApiError::from_body(Some(503), "  ");
        assert!(error.raw_body.is_none());
        assert_eq!(error.summary(), "<empty>");
    }
}
