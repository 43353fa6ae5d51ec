//! Command-line interface parsing and handling
//!
//! This module parses command-line arguments, builds a conversation from the
//! configuration and the environment, and dispatches to the subcommands.

pub mod chat;
pub mod model_list;
pub mod printer;
pub mod say;

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::cli::chat::run_chat;
use crate::cli::model_list::list_models;
use crate::cli::say::run_say;
use crate::core::config::data::path_display;
use crate::core::config::Config;
use crate::core::conversation::Conversation;
use crate::core::http::ReqwestTransport;
use crate::utils::logging::init_tracing;

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const BASE_URL_ENV: &str = "OPENAI_BASE_URL";

#[derive(Parser, Debug)]
#[command(name = "chatwire")]
#[command(version)]
#[command(about = "Streaming chat client for responses-style LLM APIs")]
#[command(
    long_about = "chatwire talks to a responses-style LLM API, streams replies to the terminal, \
and keeps the conversation under the model's token budget by summarizing older turns.\n\n\
Environment Variables:\n\
  OPENAI_API_KEY    Your API key (required for chat and say)\n\
  OPENAI_BASE_URL   Custom API base URL (optional, defaults to https://api.openai.com/v1)\n\
  CHATWIRE_LOG      Log filter for diagnostics on stderr (e.g. chatwire=debug)"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use (defaults to the configured model)
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start an interactive chat on stdin (default)
    Chat,
    /// Send a single prompt and print the streamed reply
    Say {
        /// Attach an image by URL or local file path
        #[arg(short = 'i', long, value_name = "URL|PATH")]
        image: Option<String>,
        /// Prompt text
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// List built-in models and their context thresholds
    Models,
    /// Set configuration values
    Set {
        /// Configuration key to set (model)
        key: String,
        /// Value to set for the key
        value: String,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset (model)
        key: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    tokio::runtime::Runtime::new()?.block_on(async_main())
}

async fn async_main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Chat => {
            let conversation = build_conversation(&config, args.model.as_deref())?;
            run_chat(conversation, config.greeting()).await
        }
        Commands::Say { image, prompt } => {
            let conversation = build_conversation(&config, args.model.as_deref())?;
            run_say(conversation, prompt, image).await
        }
        Commands::Models => {
            list_models(&config, args.model.as_deref());
            Ok(())
        }
        Commands::Set { key, value } => {
            let path = config_path(args.config.as_deref())?;
            let updated = set_config_value(config, &key, Some(value.trim()))?;
            updated.save_to_path(&path)?;
            println!("✅ Set {key} to: {} ({})", value.trim(), path_display(&path));
            Ok(())
        }
        Commands::Unset { key } => {
            let path = config_path(args.config.as_deref())?;
            let updated = set_config_value(config, &key, None)?;
            updated.save_to_path(&path)?;
            println!("✅ Unset {key} ({})", path_display(&path));
            Ok(())
        }
    }
}

fn config_path(explicit: Option<&Path>) -> Result<PathBuf, Box<dyn Error>> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => Ok(Config::get_config_path()?),
    }
}

fn set_config_value(
    mut config: Config,
    key: &str,
    value: Option<&str>,
) -> Result<Config, Box<dyn Error>> {
    match key {
        "model" | "default-model" => {
            if value.is_some_and(str::is_empty) {
                return Err("model must not be empty".into());
            }
            config.model = value.map(str::to_string);
            Ok(config)
        }
        _ => Err(format!("❌ Unknown config key: {key}").into()),
    }
}

/// Builds a conversation from the configuration plus `OPENAI_API_KEY` and
/// `OPENAI_BASE_URL`.
pub fn build_conversation(
    config: &Config,
    cli_model: Option<&str>,
) -> Result<Conversation, Box<dyn Error>> {
    let api_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or(
            "❌ OPENAI_API_KEY environment variable not set\n\nPlease set your API key:\n   export OPENAI_API_KEY=\"your-api-key-here\"\n   export OPENAI_BASE_URL=\"https://api.openai.com/v1\"  # Optional",
        )?;
    let env_base_url = std::env::var(BASE_URL_ENV).ok();
    let base_url = config.base_url(env_base_url.as_deref());

    let transport = ReqwestTransport::new(&base_url, api_key, config.connect_timeout())?;
    let model = config.model_id(cli_model);
    tracing::debug!(model = %model, base_url = %base_url, "conversation configured");

    let settings = config.conversation_settings(model);
    Ok(Conversation::new(Arc::new(transport), settings).with_greeting(config.greeting()))
}
