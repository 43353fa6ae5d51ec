//! chatwire is a streaming client for responses-style LLM APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the request and response payloads and the built-in
//!   model catalog.
//! - [`core`] owns the message model, the SSE decoder, the HTTP transport,
//!   token budgeting, summarization, and the conversation orchestrator.
//! - [`cli`] parses arguments and drives one-shot and interactive sessions.
//! - [`utils`] holds logging setup and image reference helpers.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
