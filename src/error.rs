//! Error types.
//!
//! Remote failures, markup failures and cancellation are kept apart so the
//! CLI can say which call or which fragment stopped the run.

use thiserror::Error;

/// Errors raised by a quiz service (login, listing and review calls).
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The login endpoint refused the credentials.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Moodle answered with an exception payload.
    #[error("Moodle error ({errorcode}): {message}")]
    Remote { errorcode: String, message: String },

    /// The server returned a non-success HTTP status.
    #[error("HTTP error {status}: {message}")]
    Http { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    Network(String),

    /// The response body was not what the endpoint documents.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors raised while querying a question's markup.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The parser rejected the fragment.
    #[error("unparsable markup: {0}")]
    Markup(String),

    /// A configured selector is not valid CSS.
    #[error("invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },
}

/// Errors that abort a bundling run.
#[derive(Debug, Error)]
pub enum BundleError {
    #[error("{call} failed: {source}")]
    Service {
        call: String,
        #[source]
        source: ServiceError,
    },

    #[error("question in slot {slot} of attempt {attempt_id} could not be parsed: {source}")]
    Parse {
        attempt_id: u64,
        slot: u32,
        #[source]
        source: ParseError,
    },

    #[error("operation cancelled")]
    Cancelled,
}

impl BundleError {
    /// Wrap a service error with the name of the call that produced it.
    pub fn service(call: impl Into<String>, source: ServiceError) -> Self {
        BundleError::Service {
            call: call.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_names_the_call() {
        let err = BundleError::service(
            "mod_quiz_get_user_attempts(quiz 4)",
            ServiceError::Remote {
                errorcode: "invalidtoken".to_string(),
                message: "Invalid token - token not found".to_string(),
            },
        );
        let text = err.to_string();
        assert!(text.starts_with("mod_quiz_get_user_attempts(quiz 4) failed"));
        assert!(text.contains("invalidtoken"));
    }

    #[test]
    fn test_parse_error_names_the_fragment() {
        let err = BundleError::Parse {
            attempt_id: 12,
            slot: 3,
            source: ParseError::Markup("EOF in tag".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "question in slot 3 of attempt 12 could not be parsed: unparsable markup: EOF in tag"
        );
    }
}
