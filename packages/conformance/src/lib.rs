//! Shared helpers for the social-graph conformance test suite.
//!
//! Provides [`spawn_node`], which binds a `TcpListener` on an ephemeral
//! port, wires up an in-process node, and returns the local URL together with
//! the storage it uses, and [`Client`], a thin `reqwest` wrapper that sends
//! the identity header the node expects from its upstream gateway.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Method, RequestBuilder};
use socialgraph_node::{
    build_router, config::NodeConfig, storage::memory::MemoryStorage, Storage,
};

/// Header the spawned nodes read the caller's user id from.
pub const IDENTITY_HEADER: &str = "x-user-id";

/// Start an ephemeral in-process node backed by `MemoryStorage`.
///
/// Returns `(base_url, storage)`, where `base_url` is e.g.
/// `http://127.0.0.1:51234`.
///
/// # Panics
///
/// Panics if the TCP listener cannot be bound.
pub async fn spawn_node() -> (String, Arc<dyn Storage>) {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let base_url = spawn_node_with(Arc::clone(&storage), NodeConfig::default()).await;
    (base_url, storage)
}

/// Start an ephemeral node on top of an existing store and config.
///
/// Two nodes given `SqliteStorage` handles on the same file behave like two
/// service instances sharing one database.
pub async fn spawn_node_with(storage: Arc<dyn Storage>, config: NodeConfig) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("get local addr");

    let config = NodeConfig {
        bind_addr: addr,
        identity_header: IDENTITY_HEADER.into(),
        ..config
    };
    let router = build_router(storage, config);

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("conformance node error");
    });

    format!("http://{addr}")
}

/// HTTP client that talks to one node's `/api/v1/social` surface.
#[derive(Clone)]
pub struct Client {
    base: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .expect("build reqwest client");
        Self {
            base: format!("{base_url}/api/v1/social"),
            http,
        }
    }

    /// Start a request acting as `user`.
    pub fn request(&self, method: Method, user: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.base))
            .header(IDENTITY_HEADER, user)
    }

    /// Start a request without an identity header.
    pub fn anonymous(&self, method: Method, path: &str) -> RequestBuilder {
        self.http.request(method, format!("{}{path}", self.base))
    }
}
