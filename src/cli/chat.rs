//! Line-oriented interactive chat on stdin/stdout.

use std::error::Error;
use std::io::{self, Write};

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::printer::run_turn;
use crate::core::conversation::{Conversation, SummaryOutcome, TurnResult, UserInput};
use crate::utils::image::resolve_image_reference;

const PROMPT: &str = "> ";
const IMAGE_USAGE: &str = "Usage: /image <url|path> [text]";

#[derive(Debug, PartialEq, Eq)]
pub enum ChatCommand {
    Quit,
    Help,
    Send(UserInput),
    /// An `/image` line whose reference could not be resolved.
    Invalid(String),
    Empty,
}

/// Interprets one input line. `/image <url|path> [text]` attaches an image.
pub fn parse_line(line: &str) -> ChatCommand {
    let line = line.trim();
    match line {
        "" => ChatCommand::Empty,
        "/quit" | "/exit" => ChatCommand::Quit,
        "/help" => ChatCommand::Help,
        "/image" => ChatCommand::Invalid(IMAGE_USAGE.to_string()),
        _ => match line.strip_prefix("/image ") {
            Some(rest) => {
                let rest = rest.trim_start();
                let (reference, text) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
                match resolve_image_reference(reference) {
                    Ok(url) => ChatCommand::Send(UserInput::text(text.trim()).with_image(url)),
                    Err(err) => ChatCommand::Invalid(err.to_string()),
                }
            }
            None => ChatCommand::Send(UserInput::text(line)),
        },
    }
}

fn print_help() {
    eprintln!("Type a message and press Enter to send it.");
    eprintln!("  /image <url|path> [text]  Send an image with optional text");
    eprintln!("  /quit                     Leave the chat");
}

pub async fn run_chat(mut conversation: Conversation, greeting: &str) -> Result<(), Box<dyn Error>> {
    let mut updates = conversation.subscribe();
    let mut stdout = io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!(
        "💬 chatwire ({}), /help for commands, /quit to leave",
        conversation.settings().model
    );
    if !greeting.trim().is_empty() {
        println!("{greeting}");
    }

    loop {
        print!("{PROMPT}");
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };

        let input = match parse_line(&line) {
            ChatCommand::Quit => break,
            ChatCommand::Empty => continue,
            ChatCommand::Help => {
                print_help();
                continue;
            }
            ChatCommand::Invalid(message) => {
                eprintln!("⚠️  {message}");
                continue;
            }
            ChatCommand::Send(input) => input,
        };

        let outcome = match run_turn(&mut conversation, &mut updates, input, &mut stdout).await? {
            Ok(outcome) => outcome,
            Err(err) => {
                eprintln!("⚠️  {err}");
                continue;
            }
        };

        match &outcome.summary {
            SummaryOutcome::Summarized => eprintln!("ℹ️  Earlier conversation was summarized"),
            SummaryOutcome::Failed(err) => eprintln!("⚠️  Could not summarize history: {err}"),
            SummaryOutcome::NotNeeded => {}
        }
        if let TurnResult::Failed(err) = &outcome.result {
            eprintln!("❌ Error: {err}");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_commands() {
        assert_eq!(parse_line("  /quit "), ChatCommand::Quit);
        assert_eq!(parse_line("/exit"), ChatCommand::Quit);
        assert_eq!(parse_line("/help"), ChatCommand::Help);
        assert_eq!(parse_line("   "), ChatCommand::Empty);
    }

    #[test]
    fn plain_lines_are_sent() {
        assert_eq!(
            parse_line("my brakes squeal"),
            ChatCommand::Send(UserInput::text("my brakes squeal"))
        );
    }

    #[test]
    fn image_lines_attach_the_reference() {
        assert_eq!(
            parse_line("/image https://example.com/dash.jpg what is this light?"),
            ChatCommand::Send(
                UserInput::text("what is this light?").with_image("https://example.com/dash.jpg")
            )
        );
        assert_eq!(
            parse_line("/image https://example.com/dash.jpg"),
            ChatCommand::Send(UserInput::text("").with_image("https://example.com/dash.jpg"))
        );
    }

    #[test]
    fn bare_image_command_shows_usage() {
        assert_eq!(
            parse_line("/image"),
            ChatCommand::Invalid(IMAGE_USAGE.to_string())
        );
        assert_eq!(
            parse_line("  /image   "),
            ChatCommand::Invalid(IMAGE_USAGE.to_string())
        );
    }

    #[test]
    fn unresolvable_images_are_reported() {
        assert!(matches!(
            parse_line("/image /no/such/file.png hello"),
            ChatCommand::Invalid(_)
        ));
    }
}
