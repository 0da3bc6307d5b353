//! Backend gateway: the two calls the session makes against the chat service.

pub mod http;

use async_trait::async_trait;

use crate::error::{ChatError, ConnectivityError};

pub use http::HttpGateway;

/// Result of a health probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthOutcome {
    Ready,
    /// Backend answered but reports it cannot serve chats; carries its status text.
    NotReady(String),
    Unreachable(ConnectivityError),
}

/// A chat service the session can talk to.
///
/// Every call is a single attempt. Failures are returned, never retried.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn check_health(&self) -> HealthOutcome;

    async fn send_chat(&self, text: &str) -> Result<String, ChatError>;
}
