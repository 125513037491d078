//! Session state machine.
//!
//! A `ChatSession` owns one logical conversation: its state, conversation
//! identity, ordered history, and the bounded-retry delivery pipeline. One
//! instance serves one consumer; there is no cross-session sharing.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::history::{MessageHistory, Turn};
use crate::intent::extract_intent;
use crate::retry::{self, MAX_RETRIES};
use crate::{ChatError, ChatRequest, ChatTransport};

/// Shown instead of an assistant reply that cleaned down to nothing.
const EMPTY_REPLY_PLACEHOLDER: &str = "(no reply)";

/// Where the session currently is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Not yet initialized.
    Idle,
    /// Availability probe in flight.
    Loading,
    /// Ready to send.
    Ready,
    /// Sends are pre-emptively rejected until a manual retry succeeds.
    Degraded,
    /// Initialization failed outside of degraded mode.
    Error,
}

/// Result of `initialize` / `manual_retry`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    Ready {
        /// True when the session was already ready and no probe ran.
        cached: bool,
    },
    Degraded {
        message: String,
    },
}

impl InitOutcome {
    pub fn is_ready(&self) -> bool {
        matches!(self, InitOutcome::Ready { .. })
    }
}

/// Guard that clears the in-flight flag on drop, so it is always released
/// even on an early return or a cancelled future.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    /// Attempt to mark the session in-flight. Returns `Err` if a send is
    /// already running.
    fn acquire(flag: &'a AtomicBool) -> Result<Self, ChatError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(ChatError::Busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// One logical conversation against the support proxy.
pub struct ChatSession<T: ChatTransport> {
    transport: T,
    /// Caller identifier sent with every message (member or guest id).
    user_id: String,
    state: SessionState,
    /// Assigned by the backend on the first successful exchange, reused on
    /// every subsequent send, reset only by clear/destroy.
    conversation_id: Option<String>,
    retry_count: u32,
    max_retries: u32,
    last_error: Option<String>,
    history: MessageHistory,
    /// Set while a send is in flight; overlapping sends are rejected.
    busy: AtomicBool,
}

impl<T: ChatTransport> ChatSession<T> {
    pub fn new(transport: T, user_id: impl Into<String>) -> Self {
        Self {
            transport,
            user_id: user_id.into(),
            state: SessionState::Idle,
            conversation_id: None,
            retry_count: 0,
            max_retries: MAX_RETRIES,
            last_error: None,
            history: MessageHistory::new(),
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Probe the proxy once and move to `Ready` or `Degraded`.
    ///
    /// A no-op returning a cached success when already ready. Probe
    /// transport failures are folded into degraded mode with the error's
    /// message; nothing propagates out of this call.
    pub async fn initialize(&mut self) -> InitOutcome {
        if self.state == SessionState::Ready {
            debug!("already initialized, skipping probe");
            return InitOutcome::Ready { cached: true };
        }

        self.state = SessionState::Loading;
        self.last_error = None;

        let outcome = match self.transport.probe_status().await {
            Ok(status) if status.available => {
                info!(
                    mode = status.mode.as_deref().unwrap_or("unknown"),
                    "proxy available"
                );
                InitOutcome::Ready { cached: false }
            }
            Ok(status) => {
                let message = status
                    .message
                    .unwrap_or_else(|| "service unavailable".into());
                warn!(%message, "proxy reported unavailable, entering degraded mode");
                InitOutcome::Degraded { message }
            }
            Err(e) => {
                let message = e.to_string();
                warn!(%message, "status probe failed, entering degraded mode");
                InitOutcome::Degraded { message }
            }
        };

        // Every path leaves the loading state.
        match &outcome {
            InitOutcome::Ready { .. } => self.state = SessionState::Ready,
            InitOutcome::Degraded { message } => {
                self.last_error = Some(message.clone());
                self.state = SessionState::Degraded;
            }
        }
        outcome
    }

    /// Send one user message and wait for the assistant's reply.
    ///
    /// Transient transport failures (408/502/503/504) are retried in place
    /// with the fixed backoff schedule; the speculative user turn is
    /// retracted before each retry so it never duplicates. Exhausting the
    /// budget on a non-business failure enters degraded mode. Returns the
    /// raw reply text; the recorded assistant turn carries the cleaned text.
    pub async fn send_message(&mut self, text: &str) -> Result<String, ChatError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if self.state == SessionState::Degraded {
            return Err(ChatError::Degraded);
        }

        let _busy = BusyGuard::acquire(&self.busy)?;

        loop {
            self.history.append(Turn::user(text));

            let request = ChatRequest {
                message: text.to_string(),
                user_id: self.user_id.clone(),
                conversation_id: self.conversation_id.clone(),
            };
            debug!(
                message_len = text.len(),
                retry = self.retry_count,
                "sending message"
            );

            match self.transport.send_chat(&request).await {
                Ok(reply) => {
                    if let Some(id) = reply.conversation_id.clone() {
                        self.conversation_id = Some(id);
                    }

                    let parsed = extract_intent(&reply.reply_text);
                    let content = if parsed.clean_text.is_empty() {
                        EMPTY_REPLY_PLACEHOLDER.to_string()
                    } else {
                        parsed.clean_text
                    };
                    self.history.append(Turn::assistant(content));

                    debug!(
                        conversation_id = self.conversation_id.as_deref().unwrap_or(""),
                        reply_len = reply.reply_text.len(),
                        has_intent = parsed.intent.is_some(),
                        "reply received"
                    );
                    self.retry_count = 0;
                    return Ok(reply.reply_text);
                }
                Err(err) => {
                    let status = err.status();
                    let business = err.is_business();
                    warn!(?status, business, error = %err, "send failed");

                    let decision =
                        retry::decide(status, business, self.retry_count, self.max_retries);
                    if decision.retry {
                        self.retry_count += 1;
                        // Retract the speculative user turn; the next
                        // iteration appends it again.
                        self.history.remove_last();
                        debug!(
                            retry = self.retry_count,
                            max = self.max_retries,
                            delay_ms = decision.delay.as_millis() as u64,
                            "retrying send"
                        );
                        tokio::time::sleep(decision.delay).await;
                        continue;
                    }

                    let message = surface_message(&err);
                    self.history.append(Turn::error(message.clone()));
                    self.last_error = Some(message);

                    if !business && self.retry_count >= self.max_retries {
                        warn!("retry budget exhausted, entering degraded mode");
                        self.state = SessionState::Degraded;
                    }
                    return Err(err);
                }
            }
        }
    }

    /// Reset failure counters and re-run the initialization path. Always
    /// re-attempts, including from `Degraded` and `Error`.
    pub async fn manual_retry(&mut self) -> InitOutcome {
        info!("manual retry requested");
        self.retry_count = 0;
        self.last_error = None;
        self.state = SessionState::Idle;
        self.initialize().await
    }

    /// Drop the transcript and the conversation identity; the session state
    /// is untouched, so a ready session stays ready.
    pub fn clear_messages(&mut self) {
        self.history.clear();
        self.conversation_id = None;
        debug!("conversation cleared");
    }

    /// Tear the session down to its initial state.
    pub fn destroy(&mut self) {
        self.history.clear();
        self.conversation_id = None;
        self.retry_count = 0;
        self.last_error = None;
        self.state = SessionState::Idle;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Human-readable label for the current state.
    pub fn status_text(&self) -> &'static str {
        match self.state {
            SessionState::Idle => "not started",
            SessionState::Loading => "initializing...",
            SessionState::Ready => "ready",
            SessionState::Degraded => "service temporarily unavailable",
            SessionState::Error => "initialization failed",
        }
    }

    pub fn history(&self) -> &[Turn] {
        self.history.as_slice()
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation_id.as_deref()
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}

/// Text surfaced to the transcript for a failed send. HTTP failures show
/// the proxy's message rather than the status line.
fn surface_message(err: &ChatError) -> String {
    match err {
        ChatError::Http { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
