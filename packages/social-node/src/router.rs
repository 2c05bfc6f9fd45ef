//! Assembles the Axum [`Router`] from all handler modules.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::{
    config::NodeConfig,
    handlers::{follows, friends, requests, stats, AppState},
    social::SocialFacade,
    storage::Storage,
};

/// Build the complete application router with shared state.
pub fn build_router(storage: Arc<dyn Storage>, config: NodeConfig) -> Router {
    let state = AppState {
        social: SocialFacade::new(storage, config.collapse_authorization_errors),
        config,
    };

    let social = Router::new()
        // Follows
        .route("/follow", post(follows::follow))
        .route("/follow/{id}", delete(follows::unfollow))
        .route("/followers/{id}", get(follows::list_followers))
        .route("/following/{id}", get(follows::list_following))
        // Friends
        .route(
            "/friends/{id}",
            get(friends::list_friends).delete(friends::unfriend),
        )
        // Profile reads
        .route("/stats/{id}", get(stats::stats))
        .route("/relationship/{id}", get(stats::relationship))
        // Friend requests
        .route("/requests", post(requests::send))
        .route("/requests/incoming", get(requests::list_incoming))
        .route("/requests/outgoing", get(requests::list_outgoing))
        .route(
            "/requests/{id}",
            get(requests::get).delete(requests::cancel),
        )
        .route("/requests/{id}/accept", post(requests::accept))
        .route("/requests/{id}/decline", post(requests::decline));

    Router::new()
        .nest("/api/v1/social", social)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
