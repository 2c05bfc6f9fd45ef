//! Counter snapshot: `GET /stats/{id}`.

use serde::{Deserialize, Serialize};

/// Per-user relationship counters.
///
/// Each field comes from its own count query, so the struct as a whole is not
/// an atomic snapshot: a write committing between two counts can show up in
/// one field and not yet in another.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatsResponse {
    pub user_id: String,
    pub friend_count: u64,
    pub follower_count: u64,
    pub following_count: u64,
    pub pending_incoming_count: u64,
    pub pending_outgoing_count: u64,
}
