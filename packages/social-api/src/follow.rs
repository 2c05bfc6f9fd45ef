//! Follow-graph types: `POST /follow`, `DELETE /follow/{id}`,
//! `GET /followers/{id}`, `GET /following/{id}`.
//!
//! Following is one-directional and needs no consent from the target. It is
//! independent of friendship: unfriending never removes a follow edge.

use serde::{Deserialize, Serialize};

/// Request body for `POST /follow`. The follower is always the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowBody {
    /// The user to follow.
    pub target_id: String,
}

/// A single entry in a followers or following list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FollowEntry {
    /// The user on the other end of the edge.
    pub user_id: String,

    /// RFC 3339 timestamp at which the edge was created.
    pub since: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn follow_body_shape() {
        let body: FollowBody = serde_json::from_str(r#"{"target_id":"42"}"#).unwrap();
        assert_eq!(body.target_id, "42");
    }
}
