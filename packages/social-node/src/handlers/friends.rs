//! Friend-list handlers.
//!
//! - `GET    /api/v1/social/friends/{id}`: friends of `{id}`, newest first.
//! - `DELETE /api/v1/social/friends/{id}`: caller unfriends `{id}`.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use socialgraph_api::{FriendEntry, ListQuery, ListResponse};

use crate::error::AppError;
use crate::middleware::auth::Actor;

use super::{list_response, page_from_query, timestamp, user_id, AppState};

pub async fn list_friends(
    State(state): State<AppState>,
    _actor: Actor,
    Path(user): Path<String>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<FriendEntry>>, AppError> {
    let page = page_from_query(&query, state.config.default_page_limit)?;
    let listing = state
        .social
        .list_friends(&user_id(&user, "user id")?, &page)
        .await?;
    Ok(Json(list_response(listing, |row| FriendEntry {
        user_id: row.user_id.into_inner(),
        since: timestamp(row.since),
    })))
}

/// Returns 404 `friendship_not_found` if the two users are not friends.
/// Follow edges between them are left alone.
pub async fn unfriend(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(other): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .social
        .unfriend(&actor, &user_id(&other, "user id")?)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
