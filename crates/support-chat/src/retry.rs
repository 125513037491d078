//! Retry decision for failed deliveries.
//!
//! A pure lookup: transient infrastructure statuses are retried with a
//! fixed, monotonically increasing delay table; business failures and
//! failures without an HTTP status never retry. The table is deliberately
//! bounded so the worst case waits roughly 2.6s across a full budget.

use std::time::Duration;

/// Maximum automatic retries per logical message.
pub const MAX_RETRIES: u32 = 3;

/// Statuses treated as transient infrastructure faults: request timeout,
/// bad gateway, service unavailable, gateway timeout.
const RETRYABLE_STATUSES: [u16; 4] = [408, 502, 503, 504];

/// Backoff per attempt index; attempts past the end clamp to the last entry.
const RETRY_DELAYS_MS: [u64; 3] = [300, 800, 1500];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryDecision {
    pub retry: bool,
    pub delay: Duration,
}

/// Decide whether a failed attempt should be retried.
///
/// `status` is the observed HTTP status, if any — connect-level failures
/// carry none and are not retried. `attempts_so_far` counts retries already
/// spent on this logical message.
pub fn decide(
    status: Option<u16>,
    business: bool,
    attempts_so_far: u32,
    max_retries: u32,
) -> RetryDecision {
    let delay = Duration::from_millis(
        RETRY_DELAYS_MS[(attempts_so_far as usize).min(RETRY_DELAYS_MS.len() - 1)],
    );

    let retryable_status = status.is_some_and(|s| RETRYABLE_STATUSES.contains(&s));
    let retry = retryable_status && !business && attempts_so_far < max_retries;

    RetryDecision { retry, delay }
}
