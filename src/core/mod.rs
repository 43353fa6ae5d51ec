pub mod budget;
pub mod chat_stream;
pub mod config;
pub mod conversation;
pub mod error;
pub mod http;
pub mod message;
pub mod request;
pub mod sse;
pub mod summarizer;
pub mod transport;
