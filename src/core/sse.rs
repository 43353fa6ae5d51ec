//! Decoding of the responses API event stream.
//!
//! Lines arrive already split. Only `data:` lines matter; each carries one
//! JSON event, or the `[DONE]` sentinel. A payload that fails to decode is
//! logged and skipped so one bad chunk never ends a healthy stream. An
//! explicit error event is the one thing that ends it early.

use futures_util::StreamExt;
use serde_json::Value;
use tracing::{debug, warn};

use crate::api::{ResponsesResponse, StreamEnvelope};
use crate::core::error::{ApiError, ClientError};
use crate::core::transport::LineStream;

pub const DATA_PREFIX: &str = "data:";
pub const DONE_SENTINEL: &str = "[DONE]";

pub const OUTPUT_TEXT_DELTA: &str = "response.output_text.delta";
pub const RESPONSE_COMPLETED: &str = "response.completed";
pub const RESPONSE_ERROR: &str = "response.error";

const FALLBACK_STREAM_ERROR: &str = "Unknown streaming error";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// An increment of the assistant text, not the text so far.
    TextDelta(String),
    /// The response finished; carries its full text when the event had it.
    Completed(String),
    Error(String),
    Other,
}

/// What a single raw line amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseLine {
    /// Not a `data:` line, or an empty payload.
    Ignored,
    /// A `data:` payload that is not a valid event.
    Malformed,
    Done,
    Event(StreamEvent),
}

pub fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}

pub fn classify_line(line: &str) -> SseLine {
    let Some(payload) = data_payload(line) else {
        return SseLine::Ignored;
    };

    if payload.is_empty() {
        return SseLine::Ignored;
    }

    if payload == DONE_SENTINEL {
        return SseLine::Done;
    }

    match serde_json::from_str::<StreamEnvelope>(payload) {
        Ok(envelope) => SseLine::Event(event_from_envelope(envelope)),
        Err(err) => {
            warn!(error = %err, "skipping malformed stream chunk");
            SseLine::Malformed
        }
    }
}

fn event_from_envelope(envelope: StreamEnvelope) -> StreamEvent {
    match envelope.kind.as_str() {
        OUTPUT_TEXT_DELTA => match envelope.delta.as_ref().and_then(Value::as_str) {
            Some(delta) => StreamEvent::TextDelta(delta.to_string()),
            None => StreamEvent::Other,
        },
        RESPONSE_COMPLETED => StreamEvent::Completed(completed_text(envelope.response)),
        RESPONSE_ERROR => StreamEvent::Error(stream_error_message(&envelope)),
        _ => StreamEvent::Other,
    }
}

fn completed_text(response: Option<Value>) -> String {
    response
        .and_then(|value| serde_json::from_value::<ResponsesResponse>(value).ok())
        .and_then(|response| response.output_text())
        .unwrap_or_default()
}

fn stream_error_message(envelope: &StreamEnvelope) -> String {
    let nested = envelope.error.as_ref().and_then(|error| {
        error
            .pointer("/message")
            .or_else(|| error.pointer("/error/message"))
            .and_then(Value::as_str)
            .or_else(|| error.as_str())
    });

    nested
        .or(envelope.message.as_deref())
        .map(str::trim)
        .filter(|message| !message.is_empty())
        .unwrap_or(FALLBACK_STREAM_ERROR)
        .to_string()
}

/// Pull adapter turning a line stream into events.
///
/// Yields deltas in arrival order. A `Completed` or `Error` event is the
/// last item; `[DONE]` or the end of the body ends the stream without one.
/// A read failure is yielded once as `Err` and also ends the stream.
pub struct EventStream {
    lines: LineStream,
    finished: bool,
    skipped: usize,
}

impl EventStream {
    pub fn new(lines: LineStream) -> Self {
        Self {
            lines,
            finished: false,
            skipped: 0,
        }
    }

    /// Number of malformed chunks skipped so far.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, ClientError>> {
        if self.finished {
            return None;
        }

        while let Some(line) = self.lines.next().await {
            let line = match line {
                Ok(line) => line,
                Err(err) => {
                    self.finished = true;
                    return Some(Err(err));
                }
            };

            match classify_line(&line) {
                SseLine::Ignored | SseLine::Event(StreamEvent::Other) => continue,
                SseLine::Malformed => self.skipped += 1,
                SseLine::Done => {
                    debug!("stream reached [DONE]");
                    self.finished = true;
                    return None;
                }
                SseLine::Event(event @ (StreamEvent::Completed(_) | StreamEvent::Error(_))) => {
                    self.finished = true;
                    return Some(Ok(event));
                }
                SseLine::Event(event) => return Some(Ok(event)),
            }
        }

        self.finished = true;
        None
    }
}

/// Builds the error for a non-2xx response from its body lines.
///
/// `data:` payloads (except `[DONE]`) are concatenated and decoded. A body
/// with no `data:` lines at all is a plain JSON error and is used as is.
pub fn drain_error_lines<I, S>(status: u16, lines: I) -> ApiError
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut payload = String::new();
    let mut plain = Vec::new();
    let mut saw_data = false;

    for line in lines {
        let line = line.as_ref();
        match data_payload(line) {
            Some(data) => {
                saw_data = true;
                if data != DONE_SENTINEL {
                    payload.push_str(data);
                }
            }
            None => plain.push(line.to_string()),
        }
    }

    let body = if saw_data { payload } else { plain.join("\n") };
    ApiError::from_body(Some(status), &body)
}

/// Error-drain mode: consumes the whole body without producing events.
pub async fn drain_error(status: u16, mut lines: LineStream) -> ApiError {
    let mut collected = Vec::new();
    while let Some(line) = lines.next().await {
        match line {
            Ok(line) => collected.push(line),
            Err(err) => {
                warn!(error = %err, status, "error body ended early");
                break;
            }
        }
    }
    drain_error_lines(status, collected)
}
