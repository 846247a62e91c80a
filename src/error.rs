use serde_json::Value;
use thiserror::Error;

/// Status code reported when an adapter rejects an operation it does not implement.
pub const STATUS_NOT_IMPLEMENTED: u16 = 501;

/// Status code used for failures with no upstream HTTP status (transport faults,
/// malformed payloads, serialization problems).
pub const STATUS_UNCLASSIFIED: u16 = 500;

/// Aggregates every failure mode exposed by the unified LLM client.
///
/// Exactly two kinds exist at the boundary: configuration problems detected while
/// constructing a client, and API failures raised by a backend call. Callers can
/// match on the variant to decide whether to surface a setup error to an operator
/// or branch on the status of a runtime failure.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Raised synchronously at construction when required fields for the selected
    /// backend kind are missing or the kind itself is unrecognized. Always fatal
    /// to that client instance; never retried.
    #[error("invalid configuration for {field}: {reason}")]
    Configuration {
        /// Name of the configuration field that failed validation.
        field: &'static str,
        /// Additional context explaining why the field is invalid.
        reason: String,
    },
    /// Raised when a backend call fails for any reason: HTTP-level failure,
    /// network failure, malformed response, or an adapter explicitly rejecting an
    /// unsupported operation.
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        /// Lowercase provider identifier, or `transport` for failures below the
        /// adapter layer.
        provider: &'static str,
        /// Backend HTTP status when known, [`STATUS_NOT_IMPLEMENTED`] for missing
        /// optional capabilities, [`STATUS_UNCLASSIFIED`] otherwise.
        status: u16,
        /// Human-readable message extracted from the backend error payload.
        message: String,
        /// Original failure payload preserved for diagnostics.
        details: Option<Value>,
    },
}

impl LlmError {
    /// Creates an [`LlmError::Configuration`] for the given field.
    ///
    /// # Examples
    ///
    /// ```
    /// use tsunagi::error::LlmError;
    ///
    /// let err = LlmError::configuration("endpoint", "required by the ollama backend");
    /// assert!(matches!(err, LlmError::Configuration { field: "endpoint", .. }));
    /// ```
    pub fn configuration(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field,
            reason: reason.into(),
        }
    }

    /// Creates an [`LlmError::Api`] without a details payload.
    ///
    /// # Examples
    ///
    /// ```
    /// use tsunagi::error::LlmError;
    ///
    /// let err = LlmError::api("openai", 429, "rate limited");
    /// assert_eq!(err.status(), Some(429));
    /// ```
    pub fn api(provider: &'static str, status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            provider,
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an [`LlmError::Api`] carrying the original failure payload.
    pub fn api_with_details(
        provider: &'static str,
        status: u16,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self::Api {
            provider,
            status,
            message: message.into(),
            details: Some(details),
        }
    }

    /// Creates the API error an adapter returns for a capability it does not
    /// implement, such as embeddings on a chat-only backend.
    pub fn not_implemented(provider: &'static str, feature: &str) -> Self {
        Self::api(
            provider,
            STATUS_NOT_IMPLEMENTED,
            format!("{feature} is not implemented by the {provider} backend"),
        )
    }

    /// Creates the API error used for transport-layer failures, where no backend
    /// status exists.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::api("transport", STATUS_UNCLASSIFIED, message)
    }

    /// Returns the numeric status for API errors, `None` for configuration errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Configuration { .. } => None,
        }
    }

    /// Returns the provider tag for API errors, `None` for configuration errors.
    pub fn provider(&self) -> Option<&'static str> {
        match self {
            Self::Api { provider, .. } => Some(provider),
            Self::Configuration { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_implemented_uses_dedicated_status() {
        let err = LlmError::not_implemented("anthropic", "embeddings");
        match err {
            LlmError::Api {
                provider,
                status,
                message,
                details,
            } => {
                assert_eq!(provider, "anthropic");
                assert_eq!(status, STATUS_NOT_IMPLEMENTED);
                assert!(message.contains("embeddings"), "message: {message}");
                assert!(details.is_none());
            }
            other => panic!("unexpected error type: {other:?}"),
        }
    }

    #[test]
    fn configuration_errors_carry_no_status() {
        let err = LlmError::configuration("api_key", "required by the openai backend");
        assert_eq!(err.status(), None);
        assert_eq!(err.provider(), None);
    }
}
