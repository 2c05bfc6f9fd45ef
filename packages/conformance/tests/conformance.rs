//! End-to-end conformance tests for the social-graph node API.
//!
//! Each test spawns an ephemeral in-process node (real TCP, real HTTP) via
//! [`socialgraph_conformance::spawn_node`] and drives it with `reqwest`.
//! The caller's identity travels in the `x-user-id` header, the way the
//! upstream gateway supplies it in production.
//!
//! # Coverage
//!
//! | Test | Behaviour |
//! |------|-----------|
//! | `decline_then_resend` | declined request does not block a resend |
//! | `accept_unfriend_resend` | accept forms a friendship; unfriend clears it |
//! | `crossed_requests_leave_one_pending` | concurrent A→B / B→A |
//! | `crossed_requests_across_instances` | same race on two nodes sharing SQLite |
//! | `follow_lists_and_unfollow` | follow edges in both lists, then removed |
//! | `follow_is_idempotent` | duplicate follow, unfollow of nothing |
//! | `concurrent_accept_and_decline` | exactly one resolution commits |
//! | `request_visibility` | only sender and receiver can read a request |
//! | `missing_identity_returns_401` | gateway header required |

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, StatusCode};
use serde_json::{json, Value};
use socialgraph_api::{ListResponse, SendRequestResponse, StatsResponse};
use socialgraph_conformance::{spawn_node, spawn_node_with, Client};
use socialgraph_node::{config::NodeConfig, SqliteStorage, Storage};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn send_request(client: &Client, from: &str, to: &str) -> reqwest::Response {
    client
        .request(Method::POST, from, "/requests")
        .json(&json!({ "receiver_id": to }))
        .send()
        .await
        .unwrap()
}

async fn send_ok(client: &Client, from: &str, to: &str) -> i64 {
    let resp = send_request(client, from, to).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json::<SendRequestResponse>().await.unwrap().request_id
}

async fn act(client: &Client, method: Method, user: &str, path: &str) -> reqwest::Response {
    client.request(method, user, path).send().await.unwrap()
}

async fn stats(client: &Client, user: &str) -> StatsResponse {
    act(client, Method::GET, user, &format!("/stats/{user}"))
        .await
        .json()
        .await
        .unwrap()
}

async fn user_ids(client: &Client, viewer: &str, path: &str) -> Vec<String> {
    let list: ListResponse<Value> = act(client, Method::GET, viewer, path)
        .await
        .json()
        .await
        .unwrap();
    list.items
        .iter()
        .map(|item| item["user_id"].as_str().unwrap().to_string())
        .collect()
}

/// Exactly one of two send responses is a 201; the other is a 409
/// `request_exists` naming the winner. Returns the winner's id.
async fn one_winner(first: reqwest::Response, second: reqwest::Response) -> i64 {
    let (won, lost) = match (first.status(), second.status()) {
        (StatusCode::CREATED, StatusCode::CONFLICT) => (first, second),
        (StatusCode::CONFLICT, StatusCode::CREATED) => (second, first),
        other => panic!("expected one 201 and one 409, got {other:?}"),
    };
    let id = won.json::<SendRequestResponse>().await.unwrap().request_id;
    let err: Value = lost.json().await.unwrap();
    assert_eq!(err["code"], "request_exists");
    assert_eq!(err["request_id"], id);
    id
}

// ---------------------------------------------------------------------------
// Friend requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn decline_then_resend() {
    let (base, _) = spawn_node().await;
    let client = Client::new(&base);

    let first = send_ok(&client, "alice", "bob").await;
    let view: Value = act(&client, Method::GET, "bob", &format!("/requests/{first}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["status"], "pending");

    let resp = act(&client, Method::POST, "bob", &format!("/requests/{first}/decline")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let view: Value = act(&client, Method::GET, "alice", &format!("/requests/{first}"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(view["status"], "declined");

    let second = send_ok(&client, "alice", "bob").await;
    assert_ne!(first, second);
}

#[tokio::test]
async fn accept_unfriend_resend() {
    let (base, _) = spawn_node().await;
    let client = Client::new(&base);

    let id = send_ok(&client, "alice", "bob").await;
    let resp = act(&client, Method::POST, "bob", &format!("/requests/{id}/accept")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(stats(&client, "alice").await.friend_count, 1);
    assert_eq!(stats(&client, "bob").await.friend_count, 1);
    assert_eq!(user_ids(&client, "alice", "/friends/alice").await, vec!["bob"]);

    let resp = act(&client, Method::DELETE, "alice", "/friends/bob").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(stats(&client, "alice").await.friend_count, 0);
    assert_eq!(stats(&client, "bob").await.friend_count, 0);

    let resp = act(&client, Method::DELETE, "alice", "/friends/bob").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    send_ok(&client, "alice", "bob").await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crossed_requests_leave_one_pending() {
    let (base, _) = spawn_node().await;
    let client = Client::new(&base);

    let (ab, ba) = tokio::join!(
        send_request(&client, "alice", "bob"),
        send_request(&client, "bob", "alice"),
    );
    let winner = one_winner(ab, ba).await;

    let alice = stats(&client, "alice").await;
    let bob = stats(&client, "bob").await;
    assert_eq!(alice.pending_incoming_count + alice.pending_outgoing_count, 1);
    assert_eq!(bob.pending_incoming_count + bob.pending_outgoing_count, 1);

    let rel: Value = act(&client, Method::GET, "alice", "/relationship/bob")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(rel["pending_request"]["request_id"], winner);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crossed_requests_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("social.db");
    let timeout = Duration::from_secs(5);
    let first: Arc<dyn Storage> = Arc::new(SqliteStorage::open(&path, timeout).unwrap());
    let second: Arc<dyn Storage> = Arc::new(SqliteStorage::open(&path, timeout).unwrap());

    let node_a = Client::new(&spawn_node_with(first, NodeConfig::default()).await);
    let node_b = Client::new(&spawn_node_with(second, NodeConfig::default()).await);

    let (ab, ba) = tokio::join!(
        send_request(&node_a, "alice", "bob"),
        send_request(&node_b, "bob", "alice"),
    );
    let winner = one_winner(ab, ba).await;

    // Either instance can resolve the surviving request.
    let view: Value = act(&node_a, Method::GET, "alice", &format!("/requests/{winner}"))
        .await
        .json()
        .await
        .unwrap();
    let receiver = view["receiver_id"].as_str().unwrap().to_string();
    let resp = act(&node_b, Method::POST, &receiver, &format!("/requests/{winner}/accept")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert_eq!(stats(&node_a, "alice").await.friend_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accept_and_decline() {
    let (base, _) = spawn_node().await;
    let client = Client::new(&base);
    let id = send_ok(&client, "alice", "bob").await;

    let accept = format!("/requests/{id}/accept");
    let decline = format!("/requests/{id}/decline");
    let (a, d) = tokio::join!(
        act(&client, Method::POST, "bob", &accept),
        act(&client, Method::POST, "bob", &decline),
    );
    let statuses = [a.status(), d.status()];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::NO_CONTENT).count(),
        1,
        "{statuses:?}"
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::CONFLICT).count(),
        1,
        "{statuses:?}"
    );

    let friends = stats(&client, "alice").await.friend_count;
    let view: Value = act(&client, Method::GET, "alice", &format!("/requests/{id}"))
        .await
        .json()
        .await
        .unwrap();
    match view["status"].as_str().unwrap() {
        "accepted" => assert_eq!(friends, 1),
        "declined" => assert_eq!(friends, 0),
        other => panic!("unexpected status {other}"),
    }
}

#[tokio::test]
async fn request_visibility() {
    let (base, _) = spawn_node().await;
    let client = Client::new(&base);
    let id = send_ok(&client, "alice", "bob").await;

    let resp = act(&client, Method::GET, "mallory", &format!("/requests/{id}")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = act(&client, Method::POST, "alice", &format!("/requests/{id}/accept")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["code"], "not_request_receiver");

    let resp = act(&client, Method::DELETE, "alice", &format!("/requests/{id}")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = act(&client, Method::DELETE, "alice", &format!("/requests/{id}")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Follows
// ---------------------------------------------------------------------------

#[tokio::test]
async fn follow_lists_and_unfollow() {
    let (base, _) = spawn_node().await;
    let client = Client::new(&base);

    let resp = client
        .request(Method::POST, "alice", "/follow")
        .json(&json!({ "target_id": "bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    assert_eq!(user_ids(&client, "alice", "/following/alice").await, vec!["bob"]);
    assert_eq!(user_ids(&client, "alice", "/followers/bob").await, vec!["alice"]);

    let resp = act(&client, Method::DELETE, "alice", "/follow/bob").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(user_ids(&client, "alice", "/following/alice").await.is_empty());
    assert!(user_ids(&client, "alice", "/followers/bob").await.is_empty());
}

#[tokio::test]
async fn follow_is_idempotent() {
    let (base, storage) = spawn_node().await;
    let client = Client::new(&base);

    let resp = act(&client, Method::DELETE, "alice", "/follow/bob").await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    for _ in 0..2 {
        let resp = client
            .request(Method::POST, "alice", "/follow")
            .json(&json!({ "target_id": "bob" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    }
    let following = storage
        .count_following(&"alice".into())
        .await
        .unwrap();
    assert_eq!(following, 1);
}

#[tokio::test]
async fn missing_identity_returns_401() {
    let (base, _) = spawn_node().await;
    let client = Client::new(&base);

    let resp = client
        .anonymous(Method::POST, "/follow")
        .json(&json!({ "target_id": "bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let err: Value = resp.json().await.unwrap();
    assert_eq!(err["code"], "unauthorized");
}
