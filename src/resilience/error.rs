//! Error taxonomy for guarded calls and manual control.

use thiserror::Error;

/// Maximum accepted length for a manual trip/reset reason.
pub const MAX_REASON_LEN: usize = 256;

/// Failure reported by a downstream operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownstreamError {
    /// Connection, DNS, or I/O failure before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),

    /// The worker answered with a non-success status.
    #[error("worker returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// Any other operation failure.
    #[error("{0}")]
    Failed(String),
}

impl DownstreamError {
    /// Shorthand for an opaque failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Errors returned by `execute_call` and friends.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BreakerError {
    /// Fail-fast rejection; the downstream was not invoked.
    #[error("circuit breaker '{breaker}' is open")]
    Open { breaker: String },

    /// The downstream call exceeded `call_timeout_ms`.
    #[error("call timed out after {timeout_ms} ms")]
    Timeout { timeout_ms: u64 },

    /// The wrapped operation itself failed.
    #[error("downstream failure: {0}")]
    Downstream(#[from] DownstreamError),

    /// No operation is registered under this identifier.
    #[error("operation '{0}' is not configured")]
    NotConfigured(String),

    /// The operation refused its arguments before any downstream call.
    #[error("operation '{operation}' rejected the request: {reason}")]
    InvalidRequest { operation: String, reason: String },
}

impl BreakerError {
    /// Whether `execute_call_with_retry` may try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BreakerError::Timeout { .. } | BreakerError::Downstream(_))
    }
}

/// Local validation failures of the manual control operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    #[error("invalid reason: {0}")]
    InvalidReason(String),
}

/// Normalise and validate an operator-supplied reason.
pub fn validate_reason(reason: &str) -> Result<String, ControlError> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(ControlError::InvalidReason("reason must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_REASON_LEN {
        return Err(ControlError::InvalidReason(format!(
            "reason must be at most {MAX_REASON_LEN} characters"
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        assert!(BreakerError::Timeout { timeout_ms: 10 }.is_retryable());
        assert!(BreakerError::Downstream(DownstreamError::failed("boom")).is_retryable());
        assert!(!BreakerError::Open { breaker: "w".into() }.is_retryable());
        assert!(!BreakerError::NotConfigured("x".into()).is_retryable());
        assert!(!BreakerError::InvalidRequest {
            operation: "x".into(),
            reason: "wrong shape".into(),
        }
        .is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = BreakerError::Downstream(DownstreamError::Status {
            status: 503,
            body: "busy".into(),
        });
        assert_eq!(err.to_string(), "downstream failure: worker returned status 503: busy");
        assert_eq!(
            BreakerError::Open { breaker: "ai-worker".into() }.to_string(),
            "circuit breaker 'ai-worker' is open"
        );
    }

    #[test]
    fn test_reason_validation() {
        assert_eq!(validate_reason("  maintenance ").unwrap(), "maintenance");
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN + 1)).is_err());
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN)).is_ok());
    }
}
