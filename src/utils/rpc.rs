use crate::error::ScanError;
use std::future::IntoFuture;
use tokio::time::{timeout, Duration};

pub const RPC_CALL_TIMEOUT_MS: u64 = 8_000;
const RPC_ERR_MAX_LEN: usize = 260;

/// Clamp a configured per-call timeout into a sane window.
pub fn clamp_call_timeout_ms(raw: Option<u64>) -> u64 {
    raw.filter(|v| (250..=60_000).contains(v))
        .unwrap_or(RPC_CALL_TIMEOUT_MS)
}

pub fn is_rate_limited_rpc_error(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("429")
        || msg.contains("rate limit")
        || msg.contains("too many requests")
        || msg.contains("compute units per second")
        || msg.contains("throughput")
        || msg.contains("limit exceeded")
        || msg.contains("capacity exceeded")
        || msg.contains("quota exceeded")
}

fn is_timeout_rpc_error(message: &str) -> bool {
    let msg = message.to_ascii_lowercase();
    msg.contains("timed out") || msg.contains("timeout") || msg.contains("deadline")
}

pub fn parse_retry_after_ms(message: &str) -> Option<u64> {
    // Providers vary; the value is only surfaced as a hint to the caller.
    let msg = message.to_ascii_lowercase();
    let start = msg
        .find("retry-after")
        .or_else(|| msg.find("retry after"))?;
    let tail = &msg[start..];

    let mut digits = String::new();
    for ch in tail.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
        } else if !digits.is_empty() {
            break;
        }
    }
    let value: u64 = digits.parse().ok()?;

    let unit_hint = tail
        .split_once(&digits)
        .map(|(_, suffix)| suffix.trim_start())
        .unwrap_or("");
    if unit_hint.starts_with("ms") || unit_hint.starts_with("millis") {
        return Some(value);
    }
    // HTTP Retry-After is seconds.
    Some(value.saturating_mul(1_000))
}

/// Map a provider error string into the scan taxonomy.
pub fn classify_rpc_error(context: &str, message: &str) -> ScanError {
    let message = crate::utils::error::compact_error_message(message, RPC_ERR_MAX_LEN);
    if is_rate_limited_rpc_error(&message) {
        return ScanError::RateLimited {
            context: context.to_string(),
            retry_after_ms: parse_retry_after_ms(&message),
            message,
        };
    }
    if is_timeout_rpc_error(&message) {
        return ScanError::Timeout {
            context: context.to_string(),
            waited_ms: 0,
        };
    }
    ScanError::Transport {
        context: context.to_string(),
        message,
    }
}

/// Run one provider call under a hard deadline. No retry: a failure is returned as-is.
pub async fn with_call_timeout<T, E, Fut>(
    context: &str,
    timeout_ms: u64,
    call: Fut,
) -> Result<T, ScanError>
where
    Fut: IntoFuture<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    match timeout(Duration::from_millis(timeout_ms), call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(classify_rpc_error(context, &err.to_string())),
        Err(_) => Err(ScanError::Timeout {
            context: context.to_string(),
            waited_ms: timeout_ms,
        }),
    }
}
