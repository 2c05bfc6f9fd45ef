//! Application-level error type returned by handlers.
//!
//! All variants serialise to [`ErrorResponse`] JSON and map to the
//! appropriate HTTP status code.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use socialgraph_api::{error::codes, ErrorResponse};

use crate::social::SocialError;
use crate::storage::StorageError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    /// A domain outcome from the social core.
    Social(SocialError),
    /// Unusable path, query, or body input.
    BadRequest(String),
    Unauthorized(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(codes::INVALID_PARAMETER, msg),
            ),
            AppError::Unauthorized(msg) => (
                StatusCode::UNAUTHORIZED,
                ErrorResponse::new(codes::UNAUTHORIZED, msg),
            ),
            AppError::Social(e) => social_response(e),
        };
        (status, Json(body)).into_response()
    }
}

fn social_response(e: SocialError) -> (StatusCode, ErrorResponse) {
    let message = e.to_string();
    let (status, code) = match &e {
        SocialError::InvalidSelfReference => {
            (StatusCode::BAD_REQUEST, codes::INVALID_SELF_REFERENCE)
        }
        SocialError::AlreadyFriends => (StatusCode::CONFLICT, codes::ALREADY_FRIENDS),
        SocialError::RequestExists(id) => {
            let body = ErrorResponse::new(codes::REQUEST_EXISTS, message).with_request_id(*id);
            return (StatusCode::CONFLICT, body);
        }
        SocialError::RequestNotFound => (StatusCode::NOT_FOUND, codes::REQUEST_NOT_FOUND),
        SocialError::FriendshipNotFound => (StatusCode::NOT_FOUND, codes::FRIENDSHIP_NOT_FOUND),
        SocialError::NotRequestReceiver => (StatusCode::FORBIDDEN, codes::NOT_REQUEST_RECEIVER),
        SocialError::NotRequestSender => (StatusCode::FORBIDDEN, codes::NOT_REQUEST_SENDER),
        SocialError::AlreadyResolved => (StatusCode::CONFLICT, codes::ALREADY_RESOLVED),
        SocialError::StorageConflict => (StatusCode::CONFLICT, codes::STORAGE_CONFLICT),
        SocialError::Storage(inner) => {
            tracing::error!("storage failure: {inner}");
            // Backend detail stays in the log.
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new(codes::INTERNAL_ERROR, "internal storage error"),
            );
        }
    };
    (status, ErrorResponse::new(code, message))
}

impl From<SocialError> for AppError {
    fn from(e: SocialError) -> Self {
        AppError::Social(e)
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        AppError::Social(e.into())
    }
}
