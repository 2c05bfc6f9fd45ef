//! Public surface for the `socialgraph-node` crate.
//!
//! Exposes the router builder, config, and storage types so that external
//! crates (e.g. the conformance test suite) can spin up an in-process node
//! without spawning a subprocess.

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod model;
pub mod router;
pub mod social;
pub mod storage;

pub use config::NodeConfig;
pub use router::build_router;
pub use social::{SocialError, SocialFacade};
pub use storage::{memory::MemoryStorage, sqlite::SqliteStorage, Storage};
