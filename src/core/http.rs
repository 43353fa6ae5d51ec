//! `reqwest`-backed [`Transport`] for the responses endpoint.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{stream, Stream, StreamExt};
use memchr::memchr2;
use tracing::{debug, warn};

use crate::api::ChatRequest;
use crate::core::error::ClientError;
use crate::core::transport::{HttpResponse, LineStream, Transport};

pub const RESPONSES_ENDPOINT: &str = "responses";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Joins a base URL and an endpoint path with exactly one slash between them.
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}

pub struct ReqwestTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl ReqwestTransport {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        connect_timeout: Duration,
    ) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .build()?;
        Ok(Self::with_client(client, base_url, api_key))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: construct_api_url(base_url, RESPONSES_ENDPOINT),
            api_key: api_key.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &ChatRequest) -> Result<HttpResponse, ClientError> {
        debug!(
            endpoint = %self.endpoint,
            model = %request.model(),
            stream = request.is_streaming(),
            messages = request.input().len(),
            "sending request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status().as_u16();
        debug!(status, "response headers received");
        Ok(HttpResponse::new(
            status,
            into_line_stream(Box::pin(response.bytes_stream())),
        ))
    }
}

struct LineState<S> {
    bytes: S,
    buffer: SseLineBuffer,
    pending: VecDeque<String>,
    finished: bool,
}

fn into_line_stream<S, B>(bytes: S) -> LineStream
where
    S: Stream<Item = Result<B, reqwest::Error>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send,
{
    let state = LineState {
        bytes,
        buffer: SseLineBuffer::default(),
        pending: VecDeque::new(),
        finished: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if let Some(line) = state.pending.pop_front() {
                return Some((Ok(line), state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.buffer.push(chunk.as_ref());
                    state.pending.extend(lines);
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((Err(ClientError::from(err)), state));
                }
                None => {
                    state.finished = true;
                    let rest = state.buffer.finish();
                    state.pending.extend(rest);
                }
            }
        }
    }))
}

/// Splits a byte stream into trimmed, non-empty text lines. Handles chunks
/// that end mid-line. `\n`, `\r\n` and a bare `\r` all end a line; lines
/// that are not valid UTF-8 are dropped.
#[derive(Default)]
pub struct SseLineBuffer {
    buffer: Vec<u8>,
}

impl SseLineBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        self.drain_lines(false)
    }

    pub fn finish(&mut self) -> Vec<String> {
        self.drain_lines(true)
    }

    fn drain_lines(&mut self, flush: bool) -> Vec<String> {
        let mut lines = Vec::new();
        let mut start = 0;

        while let Some(offset) = memchr2(b'\n', b'\r', &self.buffer[start..]) {
            let end = start + offset;
            Self::push_line(&self.buffer[start..end], &mut lines);
            start = end + 1;
        }

        if flush {
            Self::push_line(&self.buffer[start..], &mut lines);
            self.buffer.clear();
        } else if start > 0 {
            self.buffer.drain(..start);
        }

        lines
    }

    fn push_line(bytes: &[u8], lines: &mut Vec<String>) {
        match std::str::from_utf8(bytes) {
            Ok(text) => {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    lines.push(trimmed.to_string());
                }
            }
            Err(err) => warn!(error = %err, "dropping line with invalid UTF-8"),
        }
    }
}
