//! One-shot "say" command

use std::error::Error;
use std::io;

use crate::cli::printer::run_turn;
use crate::core::conversation::{Conversation, TurnResult, UserInput};
use crate::utils::image::resolve_image_reference;

pub async fn run_say(
    mut conversation: Conversation,
    prompt: Vec<String>,
    image: Option<String>,
) -> Result<(), Box<dyn Error>> {
    let prompt = prompt.join(" ");
    if prompt.trim().is_empty() && image.is_none() {
        eprintln!("Usage: chatwire say [--image <url|path>] <prompt>");
        std::process::exit(1);
    }

    let mut input = UserInput::text(prompt);
    if let Some(image) = image {
        input = input.with_image(resolve_image_reference(&image)?);
    }

    let mut updates = conversation.subscribe();
    let mut stdout = io::stdout();
    let outcome = run_turn(&mut conversation, &mut updates, input, &mut stdout).await??;

    if let TurnResult::Failed(err) = outcome.result {
        eprintln!("❌ Error: {err}");
        std::process::exit(1);
    }
    Ok(())
}
