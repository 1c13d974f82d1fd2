//! Provider client error types.

/// Errors from identity-verification provider calls.
#[derive(Debug, thiserror::Error)]
pub enum IdvError {
    /// HTTP transport error (connection failure, timeout).
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The provider returned a non-2xx status.
    #[error("provider {endpoint} returned {status}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        endpoint: String,
        source: reqwest::Error,
    },
    /// The provider accepted the request but could not process the capture
    /// (unreadable document, no face detected in the live image, ...).
    #[error("provider rejected {endpoint}: {reason}")]
    Rejected { endpoint: String, reason: String },
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_includes_endpoint_and_status() {
        let err = IdvError::Api {
            endpoint: "/v1/ocr".to_string(),
            status: 422,
            body: "unreadable document".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/v1/ocr"));
        assert!(msg.contains("422"));
    }

    #[test]
    fn rejected_display_includes_reason() {
        let err = IdvError::Rejected {
            endpoint: "/v1/face".to_string(),
            reason: "no face detected".to_string(),
        };
        assert!(err.to_string().contains("no face detected"));
    }
}
