//! Follow-graph handlers.
//!
//! - `POST   /api/v1/social/follow`: caller follows `target_id`.
//! - `DELETE /api/v1/social/follow/{id}`: caller unfollows `{id}`.
//! - `GET    /api/v1/social/followers/{id}`: users that follow `{id}`.
//! - `GET    /api/v1/social/following/{id}`: users that `{id}` follows.
//!
//! Following needs no consent and the target is not checked for existence;
//! user ids are owned by the identity system.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use socialgraph_api::{FollowBody, FollowEntry, ListQuery, ListResponse};

use crate::error::AppError;
use crate::middleware::auth::Actor;
use crate::model::RelatedUser;

use super::{list_response, page_from_query, timestamp, user_id, AppState};

fn follow_entry(row: RelatedUser) -> FollowEntry {
    FollowEntry {
        user_id: row.user_id.into_inner(),
        since: timestamp(row.since),
    }
}

/// `POST /follow`: idempotent; following twice leaves one edge. Returns 204.
pub async fn follow(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<FollowBody>,
) -> Result<impl IntoResponse, AppError> {
    let target = user_id(&body.target_id, "target_id")?;
    state.social.follow(&actor, &target).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /follow/{id}`: idempotent: returns 204 even if there was no edge.
pub async fn unfollow(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(target): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .social
        .unfollow(&actor, &user_id(&target, "user id")?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /followers/{id}`: newest follower first.
pub async fn list_followers(
    State(state): State<AppState>,
    _actor: Actor,
    Path(user): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<FollowEntry>>, AppError> {
    let page = page_from_query(&query, state.config.default_page_limit)?;
    let listing = state
        .social
        .list_followers(&user_id(&user, "user id")?, &page)
        .await?;
    Ok(Json(list_response(listing, follow_entry)))
}

/// `GET /following/{id}`: most recently followed first.
pub async fn list_following(
    State(state): State<AppState>,
    _actor: Actor,
    Path(user): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<FollowEntry>>, AppError> {
    let page = page_from_query(&query, state.config.default_page_limit)?;
    let listing = state
        .social
        .list_following(&user_id(&user, "user id")?, &page)
        .await?;
    Ok(Json(list_response(listing, follow_entry)))
}
