//! The seam between the protocol engine and whatever moves bytes.
//!
//! A transport sends one [`ChatRequest`] and hands back the status code plus
//! the body as a stream of lines. Splitting bytes into lines is the
//! transport's job; everything above it only ever sees whole lines.

use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use futures_util::{Stream, StreamExt};

use crate::api::ChatRequest;
use crate::core::error::ClientError;

pub type LineStream = Pin<Box<dyn Stream<Item = Result<String, ClientError>> + Send>>;

pub struct HttpResponse {
    pub status: u16,
    pub lines: LineStream,
}

impl HttpResponse {
    pub fn new(status: u16, lines: LineStream) -> Self {
        Self { status, lines }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Reads the remaining body. Stops at the first read failure.
    pub async fn collect_lines(mut self) -> Result<Vec<String>, ClientError> {
        let mut lines = Vec::new();
        while let Some(line) = self.lines.next().await {
            lines.push(line?);
        }
        Ok(lines)
    }

    pub async fn text(self) -> Result<String, ClientError> {
        Ok(self.collect_lines().await?.join("\n"))
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &ChatRequest) -> Result<HttpResponse, ClientError>;
}
