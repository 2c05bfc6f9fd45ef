//! HTTP request handlers for the `/api/v1/social` endpoints.
//!
//! Handlers are thin async functions: extract the actor and inputs, call the
//! [`SocialFacade`], and shape the result into the wire types from
//! `socialgraph-api`. No relationship logic lives here.

pub mod follows;
pub mod friends;
pub mod requests;
pub mod stats;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use socialgraph_api::{FriendRequestView, ListQuery, ListResponse};

use crate::{
    config::NodeConfig,
    error::AppError,
    model::{Cursor, FriendRequest, Page, RequestId, UserId},
    social::{Listing, SocialFacade},
};

/// Shared application state threaded through all Axum handlers via [`axum::extract::State`].
#[derive(Clone)]
pub struct AppState {
    pub social: SocialFacade,
    pub config: NodeConfig,
}

/// Turn `?after=&limit=` into a storage page, rejecting malformed cursors.
pub(crate) fn page_from_query<K>(query: &ListQuery, default_limit: u32) -> Result<Page<K>, AppError>
where
    K: fmt::Display + FromStr,
{
    let after = match query.after.as_deref() {
        None | Some("") => None,
        Some(raw) => Some(
            Cursor::decode(raw)
                .ok_or_else(|| AppError::BadRequest(format!("malformed cursor {raw:?}")))?,
        ),
    };
    Ok(Page {
        after,
        limit: query.effective_limit(default_limit),
    })
}

pub(crate) fn list_response<T, K, V>(
    listing: Listing<T, K>,
    view: impl Fn(T) -> V,
) -> ListResponse<V>
where
    K: fmt::Display + FromStr,
{
    let has_more = listing.has_more();
    ListResponse {
        next_cursor: listing.next.map(|c| c.encode()),
        has_more,
        total: listing.total,
        items: listing.items.into_iter().map(view).collect(),
    }
}

pub(crate) fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn request_view(r: FriendRequest) -> FriendRequestView {
    FriendRequestView {
        request_id: r.id,
        sender_id: r.sender_id.into_inner(),
        receiver_id: r.receiver_id.into_inner(),
        status: r.status,
        created_at: timestamp(r.created_at),
        resolved_at: r.resolved_at.map(timestamp),
    }
}

/// Read a user id from a body field or path segment. Surrounding whitespace
/// is dropped so the id compares equal to the one the identity header yields.
pub(crate) fn user_id(raw: &str, field: &str) -> Result<UserId, AppError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AppError::BadRequest(format!("{field} must not be empty")));
    }
    Ok(UserId::from(trimmed))
}

pub(crate) fn parse_request_id(raw: &str) -> Result<RequestId, AppError> {
    raw.parse()
        .map_err(|_| AppError::BadRequest(format!("request id must be an integer, got {raw:?}")))
}
