use thiserror::Error;

/// Errors an adapter can produce.
///
/// None of these escape the dispatch facade: [`crate::service`] degrades
/// them to empty results, or to `{"error": message}` records when raw
/// output was requested.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// A required credential is absent. Detected before any network call.
    #[error("{key} not configured")]
    MissingConfig { key: &'static str },

    /// The vendor does not offer this capability.
    #[error("{message}")]
    Unsupported { message: String },

    /// Connection failure, timeout, or non-2xx status.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The response parsed as JSON but did not have the expected shape.
    #[error("unexpected response shape: {reason}")]
    Malformed { reason: String },

    /// The caller's input could not be used for this operation.
    #[error("{reason}")]
    InvalidInput { reason: String },
}

impl ProviderError {
    pub(crate) fn unsupported(provider: &str, operation: &str) -> Self {
        ProviderError::Unsupported {
            message: format!("{provider} does not support {operation}"),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ProviderError::Malformed {
            reason: reason.into(),
        }
    }
}
