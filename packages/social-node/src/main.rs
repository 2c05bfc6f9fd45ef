//! `socialgraph-node`: follow graph and friend-request service.
//!
//! # Quick start
//!
//! ```sh
//! # In-memory node on the default port:
//! socialgraph-node
//!
//! # Persistent SQLite node (several processes may share the file):
//! SOCIAL_DB=./social.db socialgraph-node
//!
//! # Behind a gateway that forwards the user id in a custom header:
//! SOCIAL_IDENTITY_HEADER=x-authenticated-user socialgraph-node
//! ```
//!
//! # Environment variables
//!
//! See [`socialgraph_node::config::NodeConfig`] for the full list.

use std::process::ExitCode;
use std::sync::Arc;

use socialgraph_node::{build_router, MemoryStorage, NodeConfig, SqliteStorage, Storage};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "socialgraph_node=info,tower_http=debug".into()
            }),
        )
        .init();

    let config = match NodeConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let storage: Arc<dyn Storage> = match &config.db_path {
        Some(path) => match SqliteStorage::open(path, config.busy_timeout) {
            Ok(store) => {
                tracing::info!("storage: SQLite at {path}");
                Arc::new(store)
            }
            Err(e) => {
                tracing::error!("storage: failed to open SQLite database at {path}: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => {
            tracing::info!("storage: in-memory (data will not survive restart)");
            Arc::new(MemoryStorage::new())
        }
    };

    let bind_addr = config.bind_addr;
    let app = build_router(storage, config);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("failed to bind {bind_addr}: {e}");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!("listening on {bind_addr}");

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("server error: {e}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
