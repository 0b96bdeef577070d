//! ARM error classification and handling
//!
//! Provides typed errors for Resource Manager calls using the `error.code`
//! field of the response body instead of string matching on messages.

use serde_json::Value;
use thiserror::Error;

/// ARM error categories for retry and removal logic
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Resource was not found (safe to skip in removal)
    #[error("Resource not found: {path}")]
    NotFound { path: String },

    /// Rate limit exceeded (retryable with backoff)
    #[error("Rate limit exceeded: {message}")]
    Throttled { message: String },

    /// Non-success response carrying the provider's code and message verbatim
    #[error("{code}: {message} (HTTP {status})")]
    Request {
        status: u16,
        code: String,
        message: String,
    },

    /// The request never produced a response
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Response body was not the expected shape
    #[error("Failed to decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// Response body lacked a field the caller depends on
    #[error("Response from {path} is missing '{field}'")]
    MissingField { path: String, field: &'static str },

    /// A long-running operation ended without succeeding
    #[error("Operation {path} ended as {status}: {code}: {message}")]
    OperationFailed {
        path: String,
        status: String,
        code: String,
        message: String,
    },

    /// An operation URL returned by the provider could not be parsed
    #[error("Invalid operation URL: {0}")]
    OperationUrl(String),

    /// Credentials could not be obtained
    #[error("Failed to acquire access token: {0}")]
    Credentials(String),
}

impl ProviderError {
    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound { .. })
    }

    /// Check if this is a retryable error
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Throttled { .. } => true,
            ProviderError::Request { status, .. } => matches!(status, 502..=504),
            _ => false,
        }
    }

    /// Provider error code, if the response carried one
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Request { code, .. } | ProviderError::OperationFailed { code, .. } => {
                Some(code)
            }
            _ => None,
        }
    }

    /// Get a user-friendly suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<&'static str> {
        self.code().and_then(suggestion_for_code)
    }
}

/// Known ARM error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "ResourceNotFound",
    "ResourceGroupNotFound",
    "ParentResourceNotFound",
    "SubscriptionNotFound",
    "RoleAssignmentNotFound",
    "LockNotFound",
    "NotFound",
];

/// Known ARM error codes for throttling
const THROTTLING_CODES: &[&str] = &[
    "TooManyRequests",
    "SubscriptionRequestsThrottled",
    "TenantRequestsThrottled",
];

/// Classify a non-success ARM response using its status and error body.
pub fn classify_response(status: u16, body: &Value, path: &str) -> ProviderError {
    let (code, message) = error_details(body);

    match (status, code.as_deref()) {
        (404, _) => ProviderError::NotFound {
            path: path.to_string(),
        },
        (_, Some(c)) if NOT_FOUND_CODES.contains(&c) => ProviderError::NotFound {
            path: path.to_string(),
        },
        (429, _) => ProviderError::Throttled {
            message: message.unwrap_or_else(|| "Too many requests".to_string()),
        },
        (_, Some(c)) if THROTTLING_CODES.contains(&c) => ProviderError::Throttled {
            message: message.unwrap_or_else(|| c.to_string()),
        },
        _ => ProviderError::Request {
            status,
            code: code.unwrap_or_else(|| format!("Http{}", status)),
            message: message.unwrap_or_else(|| "No error message in response".to_string()),
        },
    }
}

/// Pull `code` and `message` out of an ARM error body.
///
/// Most providers nest them under `error`; a few return them at the top level.
pub(crate) fn error_details(body: &Value) -> (Option<String>, Option<String>) {
    let inner = body.get("error").unwrap_or(body);
    let field = |name: &str| inner.get(name).and_then(Value::as_str).map(str::to_string);
    (field("code"), field("message"))
}

/// Error code to user-friendly suggestion mapping
const SUGGESTIONS: &[(&str, &str)] = &[
    (
        "ScopeLocked",
        "A management lock still applies to this scope. Remove it and retry.",
    ),
    (
        "AuthorizationFailed",
        "The caller lacks permission for this operation on the scope.",
    ),
    (
        "InvalidAuthenticationToken",
        "The access token is invalid or expired. Re-authenticate and retry.",
    ),
    (
        "ExpiredAuthenticationToken",
        "The access token is invalid or expired. Re-authenticate and retry.",
    ),
    (
        "UserError",
        "The provider rejected the request as invoked; check the resource state.",
    ),
    (
        "RoleAssignmentRequestPolicyValidationFailed",
        "PIM rejected the request. Retry once the grant is older than five minutes.",
    ),
];

/// Get a user-friendly suggestion for a known error code.
fn suggestion_for_code(code: &str) -> Option<&'static str> {
    SUGGESTIONS.iter().find(|(c, _)| *c == code).map(|(_, s)| *s)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn not_found_from_status() {
        let err = classify_response(404, &json!({}), "/subscriptions/x");
        assert!(err.is_not_found());
    }

    #[test]
    fn not_found_codes() {
        for code in NOT_FOUND_CODES {
            let err = classify_response(400, &json!({"error": {"code": code}}), "/x");
            assert!(err.is_not_found(), "Expected NotFound for code: {code}");
        }
    }

    #[test]
    fn throttling() {
        let err = classify_response(429, &json!({}), "/x");
        assert!(err.is_retryable());

        for code in THROTTLING_CODES {
            let err = classify_response(400, &json!({"error": {"code": code}}), "/x");
            assert!(
                matches!(err, ProviderError::Throttled { .. }),
                "Expected Throttled for code: {code}"
            );
        }
    }

    #[test]
    fn request_error_keeps_code_and_message_verbatim() {
        let body = json!({"error": {"code": "ScopeLocked", "message": "The scope is locked."}});
        let err = classify_response(409, &body, "/x");
        match &err {
            ProviderError::Request {
                status,
                code,
                message,
            } => {
                assert_eq!(*status, 409);
                assert_eq!(code, "ScopeLocked");
                assert_eq!(message, "The scope is locked.");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
        assert!(err.to_string().contains("ScopeLocked"));
        assert!(err.suggestion().is_some());
        assert!(!err.is_retryable());
    }

    #[test]
    fn top_level_error_fields() {
        let body = json!({"code": "BadRequest", "message": "nope"});
        let err = classify_response(400, &body, "/x");
        assert_eq!(err.code(), Some("BadRequest"));
    }

    #[test]
    fn missing_code_falls_back_to_status() {
        let err = classify_response(500, &Value::Null, "/x");
        assert_eq!(err.code(), Some("Http500"));
    }

    #[test]
    fn gateway_errors_are_retryable() {
        let err = classify_response(503, &Value::Null, "/x");
        assert!(err.is_retryable());
    }

    #[test]
    fn suggestions_for_known_codes() {
        for (code, _) in SUGGESTIONS {
            assert!(suggestion_for_code(code).is_some(), "No suggestion for code: {code}");
        }
        assert!(suggestion_for_code("SomeUnknownCode").is_none());
    }
}
