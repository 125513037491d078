//! Resilient session client for the support-chat proxy.
//!
//! Mediates between an interactive consumer and a conversational backend
//! reachable only through a proxy endpoint, with:
//! - Availability probing and a degraded mode
//! - Bounded retry with a fixed backoff schedule
//! - Ordered, append-only conversation history
//! - Structured intent extraction from free-text replies

pub mod history;
pub mod identity;
pub mod intent;
pub mod proxy;
pub mod retry;
pub mod session;

use async_trait::async_trait;

pub use history::{MessageHistory, Role, Turn};
pub use identity::{load_or_create_guest_id, member_user_id, FileIdentityStore, IdentityStore};
pub use intent::{extract_intent, ParsedReply};
pub use proxy::{ProxyClient, ProxyConfig};
pub use retry::{RetryDecision, MAX_RETRIES};
pub use session::{ChatSession, InitOutcome, SessionState};

/// Transport seam between the session and the backend proxy.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Point-in-time availability query against the proxy's status endpoint.
    async fn probe_status(&self) -> Result<ProbeStatus, ChatError>;

    /// Deliver one user message; the proxy forwards it upstream and returns
    /// the assistant's reply.
    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ChatError>;
}

/// Outgoing chat request body.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

/// Successful reply, already discriminated at the transport boundary.
/// A `success: false` envelope never reaches this type — it becomes a
/// business-flagged [`ChatError::Http`].
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub reply_text: String,
    /// Conversation identifier assigned by the backend; reused on every
    /// subsequent send within the same session.
    pub conversation_id: Option<String>,
}

/// Result of the proxy status probe.
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProbeStatus {
    pub available: bool,
    pub mode: Option<String>,
    pub message: Option<String>,
}

/// Proxy bootstrap info, used for diagnostics only.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bootstrap {
    pub bot_id: String,
    pub mode: Option<String>,
    pub server_time: Option<String>,
    #[serde(default)]
    pub available: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// The proxy (or upstream) answered with a failure. `business` marks
    /// application-level rejections, which are never retried.
    #[error("HTTP {status}: {message}")]
    Http {
        status: u16,
        message: String,
        business: bool,
    },
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("service degraded; run a manual retry first")]
    Degraded,
    #[error("session is busy with another request")]
    Busy,
}

impl ChatError {
    /// HTTP status of the failure, when one was observed.
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure is an application-level rejection.
    pub fn is_business(&self) -> bool {
        matches!(self, ChatError::Http { business: true, .. })
    }
}
