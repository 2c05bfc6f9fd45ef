//! Profile-page reads.
//!
//! - `GET /api/v1/social/stats/{id}`: relationship counters for `{id}`.
//! - `GET /api/v1/social/relationship/{id}`: how the caller relates to `{id}`.

use axum::{
    extract::{Path, State},
    Json,
};
use socialgraph_api::{PendingRequestRef, RelationshipView, StatsResponse};

use crate::error::AppError;
use crate::middleware::auth::Actor;

use super::{user_id, AppState};

pub async fn stats(
    State(state): State<AppState>,
    _actor: Actor,
    Path(user): Path<String>,
) -> Result<Json<StatsResponse>, AppError> {
    let user = user_id(&user, "user id")?;
    let stats = state.social.get_stats(&user).await?;
    Ok(Json(StatsResponse {
        user_id: user.into_inner(),
        friend_count: stats.friends,
        follower_count: stats.followers,
        following_count: stats.following,
        pending_incoming_count: stats.pending_incoming,
        pending_outgoing_count: stats.pending_outgoing,
    }))
}

/// Returns 400 `invalid_self_reference` when `{id}` is the caller.
pub async fn relationship(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(other): Path<String>,
) -> Result<Json<RelationshipView>, AppError> {
    let other = user_id(&other, "user id")?;
    let rel = state.social.get_relationship(&actor, &other).await?;
    Ok(Json(RelationshipView {
        user_id: other.into_inner(),
        is_friend: rel.is_friend,
        is_following: rel.is_following,
        is_followed_by: rel.is_followed_by,
        pending_request: rel.pending.map(|(request_id, direction)| PendingRequestRef {
            request_id,
            direction,
        }),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::handlers::test_support::{app, call, json};

    #[tokio::test]
    async fn stats_track_every_counter() {
        let app = app();
        call(&app, "POST", "/follow", Some("alice"), Some(json!({"target_id": "bob"}))).await;
        call(&app, "POST", "/requests", Some("carol"), Some(json!({"receiver_id": "alice"}))).await;
        call(&app, "POST", "/requests", Some("alice"), Some(json!({"receiver_id": "dave"}))).await;

        let body = json(call(&app, "GET", "/stats/alice", Some("bob"), None).await).await;
        assert_eq!(body["user_id"], "alice");
        assert_eq!(body["following_count"], 1);
        assert_eq!(body["follower_count"], 0);
        assert_eq!(body["friend_count"], 0);
        assert_eq!(body["pending_incoming_count"], 1);
        assert_eq!(body["pending_outgoing_count"], 1);
    }

    #[tokio::test]
    async fn relationship_reports_pending_direction() {
        let app = app();
        let sent = json(
            call(&app, "POST", "/requests", Some("alice"), Some(json!({"receiver_id": "bob"}))).await,
        )
        .await;
        call(&app, "POST", "/follow", Some("bob"), Some(json!({"target_id": "alice"}))).await;

        let body = json(call(&app, "GET", "/relationship/alice", Some("bob"), None).await).await;
        assert_eq!(body["is_friend"], false);
        assert_eq!(body["is_following"], true);
        assert_eq!(body["is_followed_by"], false);
        assert_eq!(body["pending_request"]["request_id"], sent["request_id"]);
        assert_eq!(body["pending_request"]["direction"], "incoming");

        let resp = call(&app, "GET", "/relationship/bob", Some("bob"), None).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
