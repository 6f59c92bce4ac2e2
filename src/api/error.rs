use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The server rejected the credential. The session has already been
    /// cleared by the time the caller sees this; do not retry.
    #[error("Session expired - please sign in again")]
    AuthExpired,

    /// No response was obtained at all. The session is left untouched and
    /// the operation may be retried.
    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    /// A well-formed error response with a non-auth status, surfaced
    /// verbatim for the caller to present.
    #[error("Server returned {status}: {message}")]
    Application {
        status: reqwest::StatusCode,
        message: String,
    },

    /// A response that parsed as success but is missing something we
    /// require (e.g. a login response without a token field).
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid carrying excessive data in errors.
    /// The cut lands on a char boundary so non-ASCII bodies cannot panic.
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!(
                "{}... (truncated, {} total bytes)",
                &body[..end],
                body.len()
            )
        }
    }

    /// Build an application error from a non-auth failure status. Prefers
    /// the backend's own `error`/`message`/`msg` field when the body is JSON.
    pub fn application(status: reqwest::StatusCode, body: &str) -> Self {
        let message = extract_server_message(body)
            .unwrap_or_else(|| Self::truncate_body(body));
        ApiError::Application { status, message }
    }

    /// True when the failure is worth retrying without user intervention.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ApiError::Network(_))
    }
}

/// Pull a human-readable message out of a JSON error body, if present.
fn extract_server_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for key in ["error", "message", "msg"] {
        if let Some(msg) = value.get(key).and_then(|v| v.as_str()) {
            if !msg.is_empty() {
                return Some(msg.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn application_error_prefers_server_message() {
        let err = ApiError::application(
            StatusCode::BAD_REQUEST,
            r#"{"error": "Missing email or password"}"#,
        );
        match err {
            ApiError::Application { status, message } => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(message, "Missing email or password");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn application_error_falls_back_to_raw_body() {
        let err = ApiError::application(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        match err {
            ApiError::Application { message, .. } => assert_eq!(message, "boom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn oversized_bodies_are_truncated() {
        let body = "x".repeat(2000);
        let err = ApiError::application(StatusCode::INTERNAL_SERVER_ERROR, &body);
        match err {
            ApiError::Application { message, .. } => {
                assert!(message.len() < 600);
                assert!(message.contains("truncated"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        // Three-byte chars guarantee the cutoff falls mid-character
        let body = "€".repeat(200);
        let err = ApiError::application(StatusCode::INTERNAL_SERVER_ERROR, &body);
        match err {
            ApiError::Application { message, .. } => {
                assert!(message.contains("truncated"));
                assert!(message.contains("600 total bytes"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(!ApiError::AuthExpired.is_retryable());
        assert!(!ApiError::application(StatusCode::NOT_FOUND, "").is_retryable());
        assert!(!ApiError::InvalidResponse("no token".into()).is_retryable());
    }
}
