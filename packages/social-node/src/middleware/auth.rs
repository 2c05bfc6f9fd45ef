//! Caller identity extractor.
//!
//! Authentication happens upstream: a trusted gateway verifies the caller and
//! forwards the user id in a header (`x-user-id` unless configured otherwise).
//! This module only reads that header; it never sees credentials.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};

use crate::{error::AppError, handlers::AppState, model::UserId};

/// Axum extractor for the authenticated user acting on this request.
///
/// Returns 401 if the identity header is absent, empty, or not valid UTF-8.
#[derive(Debug, Clone)]
pub struct Actor(pub UserId);

impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let app_state = AppState::from_ref(state);
        let result = actor_from_headers(parts, &app_state.config.identity_header);
        async move { result }
    }
}

fn actor_from_headers(parts: &Parts, header: &str) -> Result<Actor, AppError> {
    let value = parts
        .headers
        .get(header)
        .ok_or_else(|| AppError::Unauthorized(format!("missing {header} header")))?;
    let id = value
        .to_str()
        .map_err(|_| AppError::Unauthorized(format!("{header} is not valid UTF-8")))?
        .trim();
    if id.is_empty() {
        return Err(AppError::Unauthorized(format!("{header} is empty")));
    }
    Ok(Actor(UserId::from(id)))
}
