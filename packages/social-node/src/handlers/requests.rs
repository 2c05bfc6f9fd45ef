//! Friend-request handlers.
//!
//! - `POST   /api/v1/social/requests`: send a request to `receiver_id`.
//! - `GET    /api/v1/social/requests/incoming`: caller's pending received requests.
//! - `GET    /api/v1/social/requests/outgoing`: caller's pending sent requests.
//! - `GET    /api/v1/social/requests/{id}`: one request (sender or receiver only).
//! - `POST   /api/v1/social/requests/{id}/accept`: receiver accepts.
//! - `POST   /api/v1/social/requests/{id}/decline`: receiver declines.
//! - `DELETE /api/v1/social/requests/{id}`: sender cancels.
//!
//! A `409 request_exists` response carries the pending request's id in
//! `request_id`; the client should accept that request instead of resending.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use socialgraph_api::{
    FriendRequestView, ListQuery, ListResponse, SendRequestBody, SendRequestResponse,
};

use crate::error::AppError;
use crate::middleware::auth::Actor;

use super::{
    list_response, page_from_query, parse_request_id, request_view, user_id, AppState,
};

/// Returns 201 with the new request id.
pub async fn send(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Json(body): Json<SendRequestBody>,
) -> Result<impl IntoResponse, AppError> {
    let receiver = user_id(&body.receiver_id, "receiver_id")?;
    let request_id = state.social.send_request(&actor, &receiver).await?;
    Ok((StatusCode::CREATED, Json(SendRequestResponse { request_id })))
}

pub async fn list_incoming(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<FriendRequestView>>, AppError> {
    let page = page_from_query(&query, state.config.default_page_limit)?;
    let listing = state.social.list_incoming_requests(&actor, &page).await?;
    Ok(Json(list_response(listing, request_view)))
}

pub async fn list_outgoing(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse<FriendRequestView>>, AppError> {
    let page = page_from_query(&query, state.config.default_page_limit)?;
    let listing = state.social.list_outgoing_requests(&actor, &page).await?;
    Ok(Json(list_response(listing, request_view)))
}

pub async fn get(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<Json<FriendRequestView>, AppError> {
    let request = state
        .social
        .get_request(parse_request_id(&id)?, &actor)
        .await?;
    Ok(Json(request_view(request)))
}

pub async fn accept(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .social
        .accept_request(parse_request_id(&id)?, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn decline(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .social
        .decline_request(parse_request_id(&id)?, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn cancel(
    State(state): State<AppState>,
    Actor(actor): Actor,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state
        .social
        .cancel_request(parse_request_id(&id)?, &actor)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;

    use crate::config::NodeConfig;
    use crate::handlers::test_support::{app, call, json};
    use crate::router::build_router;
    use crate::storage::memory::MemoryStorage;

    async fn send(app: &axum::Router, from: &str, to: &str) -> i64 {
        let resp = call(app, "POST", "/requests", Some(from), Some(json!({"receiver_id": to}))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        json(resp).await["request_id"].as_i64().unwrap()
    }

    #[tokio::test]
    async fn decline_then_resend() {
        let app = app();
        let first = send(&app, "alice", "bob").await;

        let view = json(call(&app, "GET", &format!("/requests/{first}"), Some("bob"), None).await).await;
        assert_eq!(view["status"], "pending");
        assert!(view.get("resolved_at").is_none());

        let resp = call(&app, "POST", &format!("/requests/{first}/decline"), Some("bob"), None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let view = json(call(&app, "GET", &format!("/requests/{first}"), Some("alice"), None).await).await;
        assert_eq!(view["status"], "declined");
        assert!(view["resolved_at"].is_string());

        let second = send(&app, "alice", "bob").await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn crossed_request_returns_existing_id() {
        let app = app();
        let id = send(&app, "alice", "bob").await;

        let resp = call(&app, "POST", "/requests", Some("bob"), Some(json!({"receiver_id": "alice"}))).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let body = json(resp).await;
        assert_eq!(body["code"], "request_exists");
        assert_eq!(body["request_id"], id);

        // The suggested remedy works.
        let resp = call(&app, "POST", &format!("/requests/{id}/accept"), Some("bob"), None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);

        let resp = call(&app, "POST", "/requests", Some("bob"), Some(json!({"receiver_id": "alice"}))).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json(resp).await["code"], "already_friends");
    }

    #[tokio::test]
    async fn error_statuses() {
        let app = app();
        let id = send(&app, "alice", "bob").await;

        let cases = [
            ("POST", format!("/requests/{id}/accept"), "alice", StatusCode::FORBIDDEN, "not_request_receiver"),
            ("DELETE", format!("/requests/{id}"), "bob", StatusCode::FORBIDDEN, "not_request_sender"),
            ("GET", format!("/requests/{id}"), "carol", StatusCode::FORBIDDEN, "not_request_receiver"),
            ("POST", "/requests/999/accept".to_string(), "bob", StatusCode::NOT_FOUND, "request_not_found"),
            ("POST", "/requests/abc/accept".to_string(), "bob", StatusCode::BAD_REQUEST, "invalid_parameter"),
        ];
        for (method, uri, user, status, code) in cases {
            let resp = call(&app, method, &uri, Some(user), None).await;
            assert_eq!(resp.status(), status, "{method} {uri}");
            assert_eq!(json(resp).await["code"], code, "{method} {uri}");
        }

        let resp = call(&app, "DELETE", &format!("/requests/{id}"), Some("alice"), None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
        let resp = call(&app, "POST", &format!("/requests/{id}/accept"), Some("bob"), None).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(json(resp).await["code"], "already_resolved");

        let resp = call(&app, "POST", "/requests", Some("alice"), Some(json!({"receiver_id": "alice"}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["code"], "invalid_self_reference");
    }

    #[tokio::test]
    async fn pending_lists_are_per_caller() {
        let app = app();
        let id = send(&app, "alice", "bob").await;
        send(&app, "carol", "bob").await;

        let incoming = json(call(&app, "GET", "/requests/incoming", Some("bob"), None).await).await;
        assert_eq!(incoming["total"], 2);
        let outgoing = json(call(&app, "GET", "/requests/outgoing", Some("alice"), None).await).await;
        assert_eq!(outgoing["items"][0]["request_id"], id);
        assert_eq!(outgoing["items"][0]["receiver_id"], "bob");
        let none = json(call(&app, "GET", "/requests/incoming", Some("alice"), None).await).await;
        assert_eq!(none["total"], 0);
    }

    #[tokio::test]
    async fn collapsed_authorization_errors_look_like_404() {
        let config = NodeConfig {
            collapse_authorization_errors: true,
            ..NodeConfig::default()
        };
        let app = build_router(Arc::new(MemoryStorage::new()), config);
        let id = send(&app, "alice", "bob").await;

        let resp = call(&app, "POST", &format!("/requests/{id}/accept"), Some("mallory"), None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json(resp).await["code"], "request_not_found");
    }

    #[tokio::test]
    async fn padded_receiver_is_the_same_user() {
        let app = app();
        let resp = call(&app, "POST", "/requests", Some("alice"), Some(json!({"receiver_id": " alice "}))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(resp).await["code"], "invalid_self_reference");

        let id = send(&app, "alice", " bob").await;
        let view = json(call(&app, "GET", &format!("/requests/{id}"), Some("bob"), None).await).await;
        assert_eq!(view["receiver_id"], "bob");
        let resp = call(&app, "POST", &format!("/requests/{id}/accept"), Some("bob"), None).await;
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
}
