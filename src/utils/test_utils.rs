use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use futures_util::stream::{self, Stream};
use serde_json::json;
use tokio::sync::mpsc;

use crate::api::ChatRequest;
use crate::core::error::ClientError;
use crate::core::transport::{HttpResponse, Transport};

pub type LineFeed = mpsc::UnboundedSender<Result<String, ClientError>>;

enum Scripted {
    Lines { status: u16, lines: Vec<String> },
    Fail(ClientError),
    Channel {
        status: u16,
        rx: mpsc::UnboundedReceiver<Result<String, ClientError>>,
    },
}

/// In-memory transport that answers requests from a queue of scripted
/// responses and records every request it was given.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_lines<I, S>(&self, status: u16, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines = lines.into_iter().map(Into::into).collect();
        self.push(Scripted::Lines { status, lines });
    }

    pub fn push_failure(&self, error: ClientError) {
        self.push(Scripted::Fail(error));
    }

    /// Queues a response whose body lines are fed by the caller. The body
    /// ends when the returned sender is dropped.
    pub fn push_channel(&self, status: u16) -> LineFeed {
        let (tx, rx) = mpsc::unbounded_channel();
        self.push(Scripted::Channel { status, rx });
        tx
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(&self, response: Scripted) {
        self.responses.lock().unwrap().push_back(response);
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &ChatRequest) -> Result<HttpResponse, ClientError> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.responses.lock().unwrap().pop_front();

        match next {
            Some(Scripted::Lines { status, lines }) => Ok(HttpResponse::new(
                status,
                Box::pin(stream::iter(lines.into_iter().map(Ok))),
            )),
            Some(Scripted::Fail(error)) => Err(error),
            Some(Scripted::Channel { status, rx }) => {
                Ok(HttpResponse::new(status, Box::pin(receiver_stream(rx))))
            }
            None => Err(ClientError::Transport("no scripted response left".into())),
        }
    }
}

fn receiver_stream<T: Send + 'static>(
    rx: mpsc::UnboundedReceiver<T>,
) -> impl Stream<Item = T> + Send {
    stream::unfold(rx, |mut rx| async move { rx.recv().await.map(|item| (item, rx)) })
}

pub fn sse_delta(text: &str) -> String {
    format!(
        "data: {}",
        json!({"type": "response.output_text.delta", "delta": text})
    )
}

pub fn sse_completed(text: &str) -> String {
    format!(
        "data: {}",
        json!({
            "type": "response.completed",
            "response": {
                "output": [{
                    "type": "message",
                    "content": [{"type": "output_text", "text": text}]
                }]
            }
        })
    )
}

pub fn sse_done() -> String {
    "data: [DONE]".to_string()
}

/// A non-streaming responses body carrying `text` as its only output.
pub fn summary_body(text: &str) -> String {
    json!({
        "id": "resp_summary",
        "object": "response",
        "model": "gpt-4o",
        "output": [{
            "id": "msg_summary",
            "type": "message",
            "status": "completed",
            "role": "assistant",
            "content": [{"type": "output_text", "text": text}]
        }],
        "usage": {"input_tokens": 120, "output_tokens": 12, "total_tokens": 132}
    })
    .to_string()
}
