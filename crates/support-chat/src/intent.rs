//! Structured intent extraction.
//!
//! Assistant replies may embed a machine-readable payload inside a fenced
//! ```` ```json … ``` ```` block. The block is stripped from the display
//! text and parsed separately; a malformed block is dropped with a warning
//! so raw JSON never reaches the human-readable transcript.

use std::sync::OnceLock;

use regex::Regex;
use tracing::warn;

/// A reply split into display text and an optional decoded intent.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedReply {
    /// Original text with the first fenced block removed, trimmed.
    pub clean_text: String,
    /// Decoded payload, `None` when absent or malformed.
    pub intent: Option<serde_json::Value>,
}

fn fence_regex() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"(?is)```json\s*(.*?)\s*```").expect("intent fence regex is valid")
    })
}

/// Split a raw reply into display text and an optional intent.
///
/// Only the first fence is handled; any later fences are left in the clean
/// text untouched.
pub fn extract_intent(raw_text: &str) -> ParsedReply {
    if raw_text.is_empty() {
        return ParsedReply {
            clean_text: String::new(),
            intent: None,
        };
    }

    let Some(captures) = fence_regex().captures(raw_text) else {
        return ParsedReply {
            clean_text: raw_text.to_string(),
            intent: None,
        };
    };

    let body = captures.get(1).map(|m| m.as_str()).unwrap_or_default();
    let intent = match serde_json::from_str(body) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "dropping malformed intent block");
            None
        }
    };

    let whole = captures.get(0).expect("capture 0 always present");
    let mut clean_text = String::with_capacity(raw_text.len() - whole.len());
    clean_text.push_str(&raw_text[..whole.start()]);
    clean_text.push_str(&raw_text[whole.end()..]);

    ParsedReply {
        clean_text: clean_text.trim().to_string(),
        intent,
    }
}
