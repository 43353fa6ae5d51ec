//! Word-count heuristic for deciding when a transcript must be summarized.
//!
//! This is admission control, not billing: the estimate is the number of
//! whitespace-delimited words scaled by [`TOKENS_PER_WORD`].

use crate::core::message::Message;

pub const TOKENS_PER_WORD: f64 = 0.75;

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

fn message_words(messages: &[Message]) -> usize {
    messages
        .iter()
        .map(|message| word_count(&message.text()))
        .sum()
}

pub fn estimate(context: &[Message], transcript: &[Message], pending_input: &str) -> f64 {
    let words = message_words(context) + message_words(transcript) + word_count(pending_input);
    words as f64 * TOKENS_PER_WORD
}

pub fn should_summarize(estimate: f64, threshold: u64) -> bool {
    estimate > threshold as f64
}
