//! Generation backend trait and failure taxonomy

use crate::request::{GenerationRequest, GenerationResult};

/// External image-generation capability
///
/// Implementations wrap a diffusion service with structural conditioning.
/// The pipeline never interprets pixel content; it only consumes this
/// request/response contract.
#[async_trait::async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Submit one generation request
    async fn generate(&self, request: &GenerationRequest)
        -> Result<GenerationResult, BackendError>;

    /// Identifier of the model this backend targets
    fn model_id(&self) -> &str;
}

/// Typed backend failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Attempt exceeded its deadline
    #[error("backend attempt timed out")]
    Timeout,

    /// Backend asked us to slow down
    #[error("backend rate limited")]
    RateLimited,

    /// Backend unavailable (5xx-equivalent)
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Content-policy rejection — never retried
    #[error("backend rejected request: {reason}")]
    Rejected {
        /// Backend-reported reason
        reason: String,
    },

    /// Request the backend could not parse — never retried
    #[error("malformed request: {0}")]
    Malformed(String),
}

impl BackendError {
    /// Whether this failure is transient and eligible for retry
    #[inline]
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited | Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(BackendError::Timeout.is_transient());
        assert!(BackendError::RateLimited.is_transient());
        assert!(BackendError::Unavailable("503".to_string()).is_transient());
        assert!(!BackendError::Rejected { reason: "policy".to_string() }.is_transient());
        assert!(!BackendError::Malformed("bad prompt".to_string()).is_transient());
    }
}
