//! The conversation state machine.
//!
//! A turn moves through `Idle -> [Summarizing] -> Sending -> Streaming ->
//! Idle`. The orchestrator is the only writer of the transcript; observers
//! follow along through [`ConversationUpdate`]s.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::models::{builtin_context_threshold, DEFAULT_CONTEXT_THRESHOLD};
use crate::api::{ModelId, ToolDeclaration};
use crate::core::budget;
use crate::core::chat_stream::{
    ChatStreamService, StreamMessage, StreamParams, DEFAULT_STREAM_CAPACITY,
};
use crate::core::error::ClientError;
use crate::core::message::{Content, Message, Role};
use crate::core::request::build_request;
use crate::core::summarizer::summarize;
use crate::core::transport::Transport;

pub const FAILURE_NOTICE: &str = "An error occurred. Please try again.";
pub const CANCELLED_NOTICE: &str = "Response cancelled.";
pub const DEFAULT_GREETING: &str = "Hello, how can I help you today?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Summarizing,
    Sending,
    Streaming,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::Summarizing => "summarizing",
            Phase::Sending => "sending",
            Phase::Streaming => "streaming",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConversationUpdate {
    PhaseChanged(Phase),
    MessageAppended { index: usize, message: Message },
    /// The message at `index` now has this content; for a streaming reply
    /// that is the cumulative text so far.
    MessageUpdated { index: usize, message: Message },
    TranscriptReplaced { transcript: Vec<Message> },
    /// The reply at `index` failed; its content is about to be replaced
    /// with the failure notice.
    TurnFailed { index: usize },
}

#[derive(Debug, Clone)]
pub struct ConversationSettings {
    pub model: ModelId,
    /// Prepended to every turn request, never stored in the transcript.
    pub context: Vec<Message>,
    /// Prepended to summarization requests instead of `context`.
    pub summary_context: Vec<Message>,
    pub context_threshold: u64,
    pub tools: Vec<ToolDeclaration>,
    pub stream_capacity: usize,
}

impl ConversationSettings {
    pub fn new(model: ModelId) -> Self {
        let context_threshold =
            builtin_context_threshold(&model).unwrap_or(DEFAULT_CONTEXT_THRESHOLD);
        Self {
            model,
            context: Vec::new(),
            summary_context: Vec::new(),
            context_threshold,
            tools: Vec::new(),
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    pub fn with_context(mut self, context: Vec<Message>) -> Self {
        self.context = context;
        self
    }

    pub fn with_summary_context(mut self, summary_context: Vec<Message>) -> Self {
        self.summary_context = summary_context;
        self
    }

    pub fn with_context_threshold(mut self, threshold: u64) -> Self {
        self.context_threshold = threshold;
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDeclaration>) -> Self {
        self.tools = tools;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub transcript: Vec<Message>,
    /// Index of the assistant message currently receiving stream text.
    pub pending_assistant_index: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserInput {
    pub text: String,
    pub image_url: Option<String>,
}

impl UserInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.image_url.is_none()
    }

    fn into_message(self) -> Message {
        match self.image_url {
            Some(url) => Message::with_image(Role::User, Some(&self.text), url),
            None => Message::user(self.text),
        }
    }
}

impl From<&str> for UserInput {
    fn from(value: &str) -> Self {
        UserInput::text(value)
    }
}

impl From<String> for UserInput {
    fn from(value: String) -> Self {
        UserInput::text(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    NotNeeded,
    Summarized,
    /// The transcript was left untouched and the turn went ahead anyway.
    Failed(ClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    Completed,
    Failed(ClientError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub summary: SummaryOutcome,
    pub result: TurnResult,
    /// Final content of the assistant message for this turn.
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationError {
    Busy(Phase),
    EmptyInput,
}

impl fmt::Display for ConversationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConversationError::Busy(phase) => {
                write!(f, "a turn is already in progress ({phase})")
            }
            ConversationError::EmptyInput => write!(f, "nothing to send"),
        }
    }
}

impl std::error::Error for ConversationError {}

#[derive(Default)]
struct StreamProgress {
    text: String,
    received_delta: bool,
    failure: Option<ClientError>,
}

pub struct Conversation {
    transport: Arc<dyn Transport>,
    settings: ConversationSettings,
    state: ConversationState,
    phase: Phase,
    stream_service: ChatStreamService,
    stream_rx: mpsc::Receiver<(StreamMessage, u64)>,
    stream_task: Option<JoinHandle<()>>,
    stream_cancel_token: Option<CancellationToken>,
    current_stream_id: u64,
    subscribers: Vec<mpsc::UnboundedSender<ConversationUpdate>>,
}

impl Conversation {
    pub fn new(transport: Arc<dyn Transport>, settings: ConversationSettings) -> Self {
        let (stream_service, stream_rx) = ChatStreamService::new(settings.stream_capacity);
        Self {
            transport,
            settings,
            state: ConversationState::default(),
            phase: Phase::Idle,
            stream_service,
            stream_rx,
            stream_task: None,
            stream_cancel_token: None,
            current_stream_id: 0,
            subscribers: Vec::new(),
        }
    }

    /// Seeds the transcript with an assistant greeting.
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        if !greeting.trim().is_empty() {
            self.state.transcript.push(Message::assistant(greeting));
        }
        self
    }

    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<ConversationUpdate> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    pub fn transcript(&self) -> &[Message] {
        &self.state.transcript
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn settings(&self) -> &ConversationSettings {
        &self.settings
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_current_stream(&self, stream_id: u64) -> bool {
        self.current_stream_id == stream_id
    }

    pub fn estimated_tokens(&self, pending_input: &str) -> f64 {
        budget::estimate(&self.settings.context, &self.state.transcript, pending_input)
    }

    pub fn needs_summary(&self, pending_input: &str) -> bool {
        budget::should_summarize(
            self.estimated_tokens(pending_input),
            self.settings.context_threshold,
        )
    }

    /// Runs one full turn. Summarizes first when the transcript plus the new
    /// input is over budget, then streams the reply into a placeholder
    /// assistant message.
    pub async fn send_message(
        &mut self,
        input: impl Into<UserInput>,
    ) -> Result<TurnOutcome, ConversationError> {
        if self.phase != Phase::Idle {
            return Err(ConversationError::Busy(self.phase));
        }

        let input = input.into();
        if input.is_empty() {
            return Err(ConversationError::EmptyInput);
        }

        let summary = self.summarize_history(&input.text).await;

        let result = match self.begin_turn(input) {
            Ok(stream_id) => self.consume_stream(stream_id).await,
            Err(err) => TurnResult::Failed(err),
        };
        let text = self.finish_turn(&result);

        Ok(TurnOutcome {
            summary,
            result,
            text,
        })
    }

    /// Abandons an interrupted turn. An empty placeholder gets a notice;
    /// partial text is kept. Returns false when there was nothing to cancel.
    pub fn cancel_current_stream(&mut self) -> bool {
        if self.phase == Phase::Idle {
            return false;
        }

        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
        self.stream_task = None;

        if let Some(index) = self.state.pending_assistant_index.take() {
            let empty = self
                .state
                .transcript
                .get(index)
                .is_some_and(|message| message.content.is_empty_text());
            if empty {
                self.replace_content(index, CANCELLED_NOTICE.to_string());
            }
        }

        debug!(stream_id = self.current_stream_id, "turn cancelled");
        self.set_phase(Phase::Idle);
        true
    }

    async fn summarize_history(&mut self, pending_input: &str) -> SummaryOutcome {
        let estimate = self.estimated_tokens(pending_input);
        if !budget::should_summarize(estimate, self.settings.context_threshold) {
            return SummaryOutcome::NotNeeded;
        }

        debug!(
            estimate,
            threshold = self.settings.context_threshold,
            "transcript over budget, summarizing"
        );
        self.set_phase(Phase::Summarizing);

        let summary = summarize(
            self.transport.as_ref(),
            &self.settings.model,
            &self.settings.summary_context,
            &self.state.transcript,
        )
        .await;

        match summary {
            Ok(summary) => {
                self.state.transcript = vec![summary];
                self.state.pending_assistant_index = None;
                self.publish(ConversationUpdate::TranscriptReplaced {
                    transcript: self.state.transcript.clone(),
                });
                SummaryOutcome::Summarized
            }
            Err(err) => {
                warn!(error = %err, "summarization failed, keeping the full transcript");
                SummaryOutcome::Failed(err)
            }
        }
    }

    fn begin_turn(&mut self, input: UserInput) -> Result<u64, ClientError> {
        self.set_phase(Phase::Sending);

        self.append(input.into_message());
        let placeholder = self.append(Message::assistant(String::new()));
        self.state.pending_assistant_index = Some(placeholder);

        let request = build_request(
            &self.settings.model,
            &self.settings.context,
            &self.state.transcript[..placeholder],
            true,
            Some(&self.settings.tools),
        )?;

        let (cancel_token, stream_id) = self.start_new_stream();
        let task = self.stream_service.spawn_stream(StreamParams {
            transport: Arc::clone(&self.transport),
            request,
            cancel_token,
            stream_id,
        });
        self.stream_task = Some(task);

        self.set_phase(Phase::Streaming);
        Ok(stream_id)
    }

    fn start_new_stream(&mut self) -> (CancellationToken, u64) {
        if let Some(token) = self.stream_cancel_token.take() {
            token.cancel();
        }
        self.current_stream_id += 1;

        let token = CancellationToken::new();
        self.stream_cancel_token = Some(token.clone());
        (token, self.current_stream_id)
    }

    async fn consume_stream(&mut self, stream_id: u64) -> TurnResult {
        let mut progress = StreamProgress::default();
        let mut task = self.stream_task.take();

        loop {
            let next = match task.as_mut() {
                Some(handle) => tokio::select! {
                    biased;
                    message = self.stream_rx.recv() => message,
                    _ = handle => {
                        task = None;
                        self.stream_rx.try_recv().ok()
                    }
                },
                None => self.stream_rx.try_recv().ok(),
            };

            let Some((message, id)) = next else {
                debug!(stream_id, "stream task ended without an end marker");
                progress
                    .failure
                    .get_or_insert_with(|| ClientError::Stream("stream ended unexpectedly".into()));
                break;
            };

            if self.apply_stream_message(message, id, &mut progress) {
                break;
            }
        }

        match progress.failure {
            Some(err) => TurnResult::Failed(err),
            None => TurnResult::Completed,
        }
    }

    /// Applies one message from the stream task. Returns true once the
    /// current stream has ended.
    fn apply_stream_message(
        &mut self,
        message: StreamMessage,
        stream_id: u64,
        progress: &mut StreamProgress,
    ) -> bool {
        if !self.is_current_stream(stream_id) {
            debug!(
                stream_id,
                current = self.current_stream_id,
                "discarding message from stale stream"
            );
            return false;
        }

        let Some(index) = self.state.pending_assistant_index else {
            return matches!(message, StreamMessage::End);
        };

        match message {
            StreamMessage::Delta(delta) => {
                progress.text.push_str(&delta);
                progress.received_delta = true;
                self.replace_content(index, progress.text.clone());
                false
            }
            StreamMessage::Completed(text) => {
                if !progress.received_delta && !text.is_empty() {
                    progress.text = text;
                    self.replace_content(index, progress.text.clone());
                }
                false
            }
            StreamMessage::Error(err) => {
                debug!(stream_id, error = %err, "stream failed");
                progress.failure = Some(err);
                false
            }
            StreamMessage::End => true,
        }
    }

    fn finish_turn(&mut self, result: &TurnResult) -> String {
        self.stream_cancel_token = None;
        self.stream_task = None;

        let text = match self.state.pending_assistant_index.take() {
            Some(index) => {
                if let TurnResult::Failed(err) = result {
                    warn!(error = %err, "turn failed");
                    self.publish(ConversationUpdate::TurnFailed { index });
                    self.replace_content(index, FAILURE_NOTICE.to_string());
                }
                self.state
                    .transcript
                    .get(index)
                    .map(|message| message.text().into_owned())
                    .unwrap_or_default()
            }
            None => String::new(),
        };

        self.set_phase(Phase::Idle);
        text
    }

    fn append(&mut self, message: Message) -> usize {
        let index = self.state.transcript.len();
        self.state.transcript.push(message.clone());
        self.publish(ConversationUpdate::MessageAppended { index, message });
        index
    }

    fn replace_content(&mut self, index: usize, text: String) {
        let Some(message) = self.state.transcript.get_mut(index) else {
            return;
        };
        message.content = Content::Text(text);
        let message = message.clone();
        self.publish(ConversationUpdate::MessageUpdated { index, message });
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.phase != phase {
            self.phase = phase;
            self.publish(ConversationUpdate::PhaseChanged(phase));
        }
    }

    fn publish(&mut self, update: ConversationUpdate) {
        self.subscribers
            .retain(|subscriber| subscriber.send(update.clone()).is_ok());
    }
}
