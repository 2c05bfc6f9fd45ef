//! Standard error response body.

use serde::{Deserialize, Serialize};

/// The JSON body returned for all error responses.
///
/// ```json
/// { "error": "a pending request already exists", "code": "request_exists", "request_id": 7 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    /// Human-readable description of the problem.
    pub error: String,

    /// Machine-readable error code, one of [`codes`].
    pub code: String,

    /// The pending request that blocked a `POST /requests`.
    ///
    /// Only present with [`codes::REQUEST_EXISTS`]; clients are expected to
    /// accept this request instead of retrying the send.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
}

impl ErrorResponse {
    /// Construct an [`ErrorResponse`] from a code and message.
    pub fn new(code: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: error.into(),
            request_id: None,
        }
    }

    /// Attach the id of the request a client should act on instead.
    pub fn with_request_id(mut self, id: i64) -> Self {
        self.request_id = Some(id);
        self
    }
}

/// Error codes and the HTTP status each one travels with.
///
/// | `code` | HTTP status |
/// |--------|------------|
/// | `invalid_parameter` | 400 |
/// | `invalid_self_reference` | 400 |
/// | `unauthorized` | 401 |
/// | `not_request_receiver` | 403 |
/// | `not_request_sender` | 403 |
/// | `request_not_found` | 404 |
/// | `friendship_not_found` | 404 |
/// | `already_friends` | 409 |
/// | `request_exists` | 409 |
/// | `already_resolved` | 409 |
/// | `storage_conflict` | 409 |
/// | `internal_error` | 500 |
pub mod codes {
    pub const INVALID_PARAMETER: &str = "invalid_parameter";
    pub const INVALID_SELF_REFERENCE: &str = "invalid_self_reference";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const NOT_REQUEST_RECEIVER: &str = "not_request_receiver";
    pub const NOT_REQUEST_SENDER: &str = "not_request_sender";
    pub const REQUEST_NOT_FOUND: &str = "request_not_found";
    pub const FRIENDSHIP_NOT_FOUND: &str = "friendship_not_found";
    pub const ALREADY_FRIENDS: &str = "already_friends";
    pub const REQUEST_EXISTS: &str = "request_exists";
    pub const ALREADY_RESOLVED: &str = "already_resolved";
    pub const STORAGE_CONFLICT: &str = "storage_conflict";
    pub const INTERNAL_ERROR: &str = "internal_error";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_omitted_when_absent() {
        let e = ErrorResponse::new(codes::ALREADY_FRIENDS, "already friends");
        let json = serde_json::to_string(&e).unwrap();
        assert!(!json.contains("request_id"));
    }

    #[test]
    fn request_exists_carries_id() {
        let e = ErrorResponse::new(codes::REQUEST_EXISTS, "pending").with_request_id(7);
        let v = serde_json::to_value(&e).unwrap();
        assert_eq!(v["request_id"], 7);
        assert_eq!(v["code"], "request_exists");
    }
}
