//! HTTP client for the backend support proxy.
//!
//! The proxy fronts the upstream conversational provider; this client never
//! talks to the provider directly and never sees its credentials. Success
//! and failure are discriminated here, at the transport boundary: callers
//! receive either a [`ChatReply`] or a tagged [`ChatError`], never a raw
//! envelope.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::{Bootstrap, ChatError, ChatReply, ChatRequest, ChatTransport, ProbeStatus};

const STATUS_PATH: &str = "/status";
const CHAT_PATH: &str = "/chat";
const BOOTSTRAP_PATH: &str = "/bootstrap";

/// Proxy client configuration.
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// Base URL of the support proxy, e.g. `https://api.example.com/api/support/chat`.
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ProxyConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Create config from the `SUPPORT_PROXY_URL` environment variable.
    pub fn from_env() -> Result<Self, ChatError> {
        let base_url = std::env::var("SUPPORT_PROXY_URL")
            .map_err(|_| ChatError::Network("SUPPORT_PROXY_URL not set".into()))?;
        Ok(Self::new(base_url))
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Reply envelope as the proxy serializes it, success or failure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ChatEnvelope {
    success: bool,
    reply_text: Option<String>,
    conversation_id: Option<String>,
    error: Option<String>,
    is_business_error: Option<bool>,
}

/// Support proxy client.
pub struct ProxyClient {
    config: ProxyConfig,
    http: reqwest::Client,
}

impl ProxyClient {
    pub fn new(config: ProxyConfig) -> Self {
        Self {
            http: reqwest::Client::builder()
                .connect_timeout(config.connect_timeout)
                .timeout(config.request_timeout)
                .build()
                .expect("failed to build HTTP client"),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Fetch proxy bootstrap/diagnostic info.
    pub async fn bootstrap(&self) -> Result<Bootstrap, ChatError> {
        let url = self.endpoint(BOOTSTRAP_PATH);
        debug!(%url, "bootstrap request");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
                message: format!("HTTP {status}"),
                business: false,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))
    }

    /// Turn one HTTP exchange into a tagged result. Pure so the envelope
    /// shapes can be tested without a server.
    fn parse_chat_envelope(status: u16, body: &str) -> Result<ChatReply, ChatError> {
        let envelope: ChatEnvelope = match serde_json::from_str(body) {
            Ok(envelope) => envelope,
            Err(e) if (200..300).contains(&status) => {
                return Err(ChatError::Parse(e.to_string()));
            }
            // Error bodies are best-effort JSON; fall back to the status.
            Err(_) => {
                return Err(ChatError::Http {
                    status,
                    message: format!("HTTP {status}"),
                    business: false,
                });
            }
        };

        if (200..300).contains(&status) {
            if envelope.success {
                return Ok(ChatReply {
                    reply_text: envelope.reply_text.unwrap_or_default(),
                    conversation_id: envelope.conversation_id,
                });
            }
            // 2xx with an explicit failure flag is an application-level
            // rejection, never a transport fault.
            return Err(ChatError::Http {
                status,
                message: envelope.error.unwrap_or_else(|| "send failed".into()),
                business: true,
            });
        }

        Err(ChatError::Http {
            status,
            message: envelope.error.unwrap_or_else(|| format!("HTTP {status}")),
            business: envelope.is_business_error.unwrap_or(false),
        })
    }
}

#[async_trait]
impl ChatTransport for ProxyClient {
    async fn probe_status(&self) -> Result<ProbeStatus, ChatError> {
        let url = self.endpoint(STATUS_PATH);
        debug!(%url, "status probe");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChatError::Http {
                status: status.as_u16(),
                message: format!("HTTP {status}"),
                business: false,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ChatError::Parse(e.to_string()))
    }

    async fn send_chat(&self, request: &ChatRequest) -> Result<ChatReply, ChatError> {
        let url = self.endpoint(CHAT_PATH);
        debug!(
            %url,
            message_len = request.message.len(),
            has_conversation = request.conversation_id.is_some(),
            "chat request"
        );

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;

        Self::parse_chat_envelope(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_joins_without_double_slash() {
        let client = ProxyClient::new(ProxyConfig::new("https://api.example.com/support/"));
        assert_eq!(
            client.endpoint(CHAT_PATH),
            "https://api.example.com/support/chat"
        );
    }

    #[test]
    fn config_builders_override_timeouts() {
        let config = ProxyConfig::new("http://localhost:8080/support")
            .with_connect_timeout(Duration::from_secs(2))
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.connect_timeout, Duration::from_secs(2));
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn success_envelope_becomes_reply() {
        let body = r#"{"success":true,"replyText":"hello","conversationId":"conv_1"}"#;
        let reply = ProxyClient::parse_chat_envelope(200, body).unwrap();
        assert_eq!(reply.reply_text, "hello");
        assert_eq!(reply.conversation_id.as_deref(), Some("conv_1"));
    }

    #[test]
    fn success_envelope_without_conversation_id() {
        let body = r#"{"success":true,"replyText":"hi"}"#;
        let reply = ProxyClient::parse_chat_envelope(200, body).unwrap();
        assert!(reply.conversation_id.is_none());
    }

    #[test]
    fn ok_status_with_failure_flag_is_business_error() {
        let body = r#"{"success":false,"error":"bot not published"}"#;
        let err = ProxyClient::parse_chat_envelope(200, body).unwrap_err();
        match err {
            ChatError::Http {
                status,
                message,
                business,
            } => {
                assert_eq!(status, 200);
                assert_eq!(message, "bot not published");
                assert!(business);
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[test]
    fn error_body_keeps_business_flag() {
        let body = r#"{"success":false,"error":"invalid request","isBusinessError":true}"#;
        let err = ProxyClient::parse_chat_envelope(400, body).unwrap_err();
        assert!(err.is_business());
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn error_body_without_flag_is_not_business() {
        let body = r#"{"success":false,"error":"upstream unavailable"}"#;
        let err = ProxyClient::parse_chat_envelope(503, body).unwrap_err();
        assert!(!err.is_business());
        assert_eq!(err.status(), Some(503));
    }

    #[test]
    fn unparseable_error_body_falls_back_to_status() {
        let err = ProxyClient::parse_chat_envelope(502, "<html>bad gateway</html>").unwrap_err();
        match err {
            ChatError::Http {
                status,
                message,
                business,
            } => {
                assert_eq!(status, 502);
                assert!(message.contains("502"));
                assert!(!business);
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[test]
    fn unparseable_success_body_is_a_parse_error() {
        let err = ProxyClient::parse_chat_envelope(200, "not json").unwrap_err();
        assert!(matches!(err, ChatError::Parse(_)));
    }

    #[test]
    fn bootstrap_deserializes_documented_shape() {
        let body = r#"{
            "botId": "7469370000000000000",
            "mode": "openapi",
            "serverTime": "2026-01-31T12:00:00",
            "available": true
        }"#;
        let bootstrap: Bootstrap = serde_json::from_str(body).unwrap();
        assert_eq!(bootstrap.bot_id, "7469370000000000000");
        assert_eq!(bootstrap.mode.as_deref(), Some("openapi"));
        assert!(bootstrap.available);
    }
}
