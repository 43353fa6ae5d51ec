//! Incremental terminal output for streamed replies.

use std::io::{self, Write};

use tokio::sync::mpsc;

use crate::core::conversation::{
    Conversation, ConversationError, ConversationUpdate, Phase, TurnOutcome, UserInput,
};

/// Prints only the newly arrived suffix of the reply being streamed.
#[derive(Debug, Default)]
pub struct StreamPrinter {
    reply_index: Option<usize>,
    printed: String,
    failed: bool,
}

impl StreamPrinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply<W: Write>(&mut self, update: &ConversationUpdate, out: &mut W) -> io::Result<()> {
        match update {
            ConversationUpdate::MessageAppended { index, message }
                if message.role.is_assistant() && message.content.is_empty_text() =>
            {
                self.reply_index = Some(*index);
                self.printed.clear();
                self.failed = false;
            }
            ConversationUpdate::TurnFailed { index } if Some(*index) == self.reply_index => {
                self.failed = true;
            }
            ConversationUpdate::MessageUpdated { index, message }
                if Some(*index) == self.reply_index && !self.failed =>
            {
                let text = message.text();
                // Text that does not extend what was printed is skipped.
                if let Some(suffix) = text.strip_prefix(self.printed.as_str()) {
                    out.write_all(suffix.as_bytes())?;
                    out.flush()?;
                    self.printed.push_str(suffix);
                }
            }
            ConversationUpdate::PhaseChanged(Phase::Idle) => {
                if self.reply_index.take().is_some() && !self.printed.is_empty() {
                    out.write_all(b"\n")?;
                    out.flush()?;
                }
                self.printed.clear();
                self.failed = false;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Runs one turn while echoing its updates to `out` as they arrive.
pub async fn run_turn<W: Write>(
    conversation: &mut Conversation,
    updates: &mut mpsc::UnboundedReceiver<ConversationUpdate>,
    input: UserInput,
    out: &mut W,
) -> Result<Result<TurnOutcome, ConversationError>, io::Error> {
    let mut printer = StreamPrinter::new();
    let turn = conversation.send_message(input);
    tokio::pin!(turn);

    let outcome = loop {
        tokio::select! {
            outcome = &mut turn => break outcome,
            Some(update) = updates.recv() => printer.apply(&update, out)?,
        }
    };

    while let Ok(update) = updates.try_recv() {
        printer.apply(&update, out)?;
    }
    Ok(outcome)
}
