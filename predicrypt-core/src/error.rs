//! Error types for predicrypt-core

use thiserror::Error;

/// Result type alias for predicrypt operations
pub type Result<T> = std::result::Result<T, MarketError>;

/// Error types for market operations
#[derive(Error, Debug)]
pub enum MarketError {
    /// Bad local parameters; the caller must correct them
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No active session to act on behalf of
    #[error("Not authenticated: no active session")]
    NotAuthenticated,

    /// Identity provider unreachable or proof material expired
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    /// Ledger-side business rule rejection
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),

    /// Network errors while talking to the ledger
    #[error("Transport error: {0}")]
    Transport(String),

    /// Reading or decoding ledger objects failed
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Betting attempted at or after the market deadline
    #[error("Betting closed for market {0}")]
    BettingClosed(String),

    /// The market already has an outcome
    #[error("Market {0} is already resolved")]
    AlreadyResolved(String),

    /// Resolution attempted too early or by someone other than the creator
    #[error("Resolution not allowed: {0}")]
    ResolutionNotAllowed(String),

    /// Claim attempted with a bet that did not win this market
    #[error("Ineligible claim: {0}")]
    IneligibleClaim(String),

    /// Client configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serde JSON errors
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl MarketError {
    /// Whether the same call may succeed later without the caller changing anything.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::SigningFailed(_) | Self::Transport(_) | Self::Fetch(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_kinds() {
        assert!(MarketError::SigningFailed("proof expired".into()).is_retryable());
        assert!(MarketError::Transport("timeout".into()).is_retryable());
        assert!(MarketError::Fetch("bad field".into()).is_retryable());

        assert!(!MarketError::InvalidInput("empty title".into()).is_retryable());
        assert!(!MarketError::NotAuthenticated.is_retryable());
        assert!(!MarketError::SubmissionRejected("abort".into()).is_retryable());
        assert!(!MarketError::AlreadyResolved("0x1".into()).is_retryable());
        assert!(!MarketError::IneligibleClaim("0x2".into()).is_retryable());
    }

    #[test]
    fn test_error_messages() {
        let err = MarketError::BettingClosed("0xabc".to_string());
        assert_eq!(err.to_string(), "Betting closed for market 0xabc");
        assert_eq!(
            MarketError::NotAuthenticated.to_string(),
            "Not authenticated: no active session"
        );
    }
}
