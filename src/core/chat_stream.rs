use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::ChatRequest;
use crate::core::error::ClientError;
use crate::core::sse::{drain_error, EventStream, StreamEvent};
use crate::core::transport::Transport;

pub const DEFAULT_STREAM_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamMessage {
    Delta(String),
    /// Full response text from the completion event; may be empty.
    Completed(String),
    Error(ClientError),
    End,
}

pub struct StreamParams {
    pub transport: Arc<dyn Transport>,
    pub request: ChatRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::Sender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Runs one request on its own task. Every message is tagged with the
    /// stream id; the task stops early when the token is cancelled or the
    /// receiver is gone.
    pub fn spawn_stream(&self, params: StreamParams) -> JoinHandle<()> {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                transport,
                request,
                cancel_token,
                stream_id,
            } = params;

            tokio::select! {
                _ = run_stream(transport.as_ref(), &request, &tx, stream_id) => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "stream cancelled");
                }
            }
        })
    }

    #[cfg(test)]
    pub async fn send_for_test(&self, message: StreamMessage, stream_id: u64) {
        let _ = self.tx.send((message, stream_id)).await;
    }
}

async fn run_stream(
    transport: &dyn Transport,
    request: &ChatRequest,
    tx: &mpsc::Sender<(StreamMessage, u64)>,
    stream_id: u64,
) {
    let response = match transport.send(request).await {
        Ok(response) => response,
        Err(err) => {
            debug!(stream_id, error = %err, "request failed before a status was received");
            if forward(tx, stream_id, StreamMessage::Error(err)).await {
                forward(tx, stream_id, StreamMessage::End).await;
            }
            return;
        }
    };

    if !response.is_success() {
        let error = drain_error(response.status, response.lines).await;
        debug!(stream_id, status = response.status, "draining error response");
        if forward(tx, stream_id, StreamMessage::Error(ClientError::Api(error))).await {
            forward(tx, stream_id, StreamMessage::End).await;
        }
        return;
    }

    let mut events = EventStream::new(response.lines);
    while let Some(event) = events.next_event().await {
        let message = match event {
            Ok(StreamEvent::TextDelta(delta)) => StreamMessage::Delta(delta),
            Ok(StreamEvent::Completed(text)) => StreamMessage::Completed(text),
            Ok(StreamEvent::Error(message)) => StreamMessage::Error(ClientError::Stream(message)),
            Ok(StreamEvent::Other) => continue,
            Err(err) => StreamMessage::Error(err),
        };
        if !forward(tx, stream_id, message).await {
            debug!(stream_id, "stream receiver dropped");
            return;
        }
    }

    if events.skipped() > 0 {
        debug!(stream_id, skipped = events.skipped(), "stream finished with skipped chunks");
    }
    forward(tx, stream_id, StreamMessage::End).await;
}

async fn forward(
    tx: &mpsc::Sender<(StreamMessage, u64)>,
    stream_id: u64,
    message: StreamMessage,
) -> bool {
    tx.send((message, stream_id)).await.is_ok()
}
