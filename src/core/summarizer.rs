//! Collapses a transcript into one `system` message through a single
//! non-streaming request.

use tracing::debug;

use crate::api::{ModelId, ResponsesResponse};
use crate::core::error::ClientError;
use crate::core::message::Message;
use crate::core::request::build_request;
use crate::core::sse::drain_error;
use crate::core::transport::Transport;

pub async fn summarize(
    transport: &dyn Transport,
    model: &ModelId,
    summary_context: &[Message],
    transcript: &[Message],
) -> Result<Message, ClientError> {
    let request = build_request(model, summary_context, transcript, false, None)?;
    debug!(model = %model, messages = transcript.len(), "requesting summary");

    let response = transport.send(&request).await?;
    if !response.is_success() {
        return Err(ClientError::Api(
            drain_error(response.status, response.lines).await,
        ));
    }

    let lines = response.collect_lines().await?;
    let body = lines.join("\n");
    let decoded: ResponsesResponse = serde_json::from_str(&body).map_err(|err| {
        ClientError::InvalidResponse(format!("could not decode summary response: {err}"))
    })?;

    let text = decoded
        .output_text()
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or_else(|| ClientError::InvalidResponse("summary response carried no text".into()))?;

    debug!(words = crate::core::budget::word_count(&text), "summary received");
    Ok(Message::system(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::{system_context, Role};
    use crate::utils::test_utils::{summary_body, ScriptedTransport};

    fn transcript() -> Vec<Message> {
        vec![
            Message::assistant("Hello, how can I help you today?"),
            Message::user("My tire pressure light is on."),
            Message::assistant("Check all four tires with a gauge."),
        ]
    }

    #[tokio::test]
    async fn returns_system_message_with_summary_text() {
        let transport = ScriptedTransport::new();
        transport.push_lines(200, [summary_body("User asked about a tire pressure light.")]);

        let context = system_context(["Summarize the conversation."]);
        let summary = summarize(&transport, &ModelId::from("gpt-4o"), &context, &transcript())
            .await
            .unwrap();

        assert_eq!(summary.role, Role::System);
        assert_eq!(summary.text(), "User asked about a tire pressure light.");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(!requests[0].is_streaming());
        assert!(requests[0].tools().is_none());
        assert_eq!(requests[0].input().len(), 4);
        assert_eq!(requests[0].input()[0], Message::system("Summarize the conversation."));
    }

    #[tokio::test]
    async fn pretty_printed_bodies_are_rejoined() {
        let transport = ScriptedTransport::new();
        transport.push_lines(
            200,
            [
                "{",
                r#"  "output": [{"type": "message", "content": ["#,
                r#"    {"type": "output_text", "text": "part one, "},"#,
                r#"    {"type": "output_text", "text": "part two"}"#,
                "  ]}]",
                "}",
            ],
        );

        let summary = summarize(&transport, &ModelId::from("gpt-4o"), &[], &transcript())
            .await
            .unwrap();
        assert_eq!(summary.text(), "part one, part two");
    }

    #[tokio::test]
    async fn error_status_becomes_api_error() {
        let transport = ScriptedTransport::new();
        transport.push_lines(500, [r#"{"error":{"message":"server exploded","type":"server_error"}}"#]);

        let err = summarize(&transport, &ModelId::from("gpt-4o"), &[], &transcript())
            .await
            .unwrap_err();
        let api = err.api_error().expect("api error");
        assert_eq!(api.status_code, Some(500));
        assert_eq!(api.message(), Some("server exploded"));
    }

    #[tokio::test]
    async fn error_body_cut_short_still_reports_status() {
        let transport = ScriptedTransport::new();
        let feed = transport.push_channel(503);
        feed.send(Ok(r#"{"error":{"message":"overloaded"}}"#.to_string()))
            .unwrap();
        feed.send(Err(ClientError::Transport("reset".into()))).unwrap();
        drop(feed);

        let err = summarize(&transport, &ModelId::from("gpt-4o"), &[], &transcript())
            .await
            .unwrap_err();
        let api = err.api_error().expect("api error");
        assert_eq!(api.status_code, Some(503));
        assert_eq!(api.message(), Some("overloaded"));
    }

    #[tokio::test]
    async fn empty_and_garbage_bodies_are_invalid() {
        let transport = ScriptedTransport::new();
        transport.push_lines(200, [r#"{"output":[]}"#]);
        transport.push_lines(200, ["<html>oops</html>"]);

        for _ in 0..2 {
            let err = summarize(&transport, &ModelId::from("gpt-4o"), &[], &transcript())
                .await
                .unwrap_err();
            assert!(matches!(err, ClientError::InvalidResponse(_)), "{err:?}");
        }
    }

    #[tokio::test]
    async fn transport_failures_propagate() {
        let transport = ScriptedTransport::new();
        transport.push_failure(ClientError::Transport("timed out".into()));

        let err = summarize(&transport, &ModelId::from("gpt-4o"), &[], &transcript())
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::Transport("timed out".into()));
    }
}
