//! Friendship and friend-request types.
//!
//! Friendships are symmetric and are only ever formed by accepting a
//! request. A request moves `pending → accepted | declined | cancelled` once
//! and is then history; see [`RequestStatus`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a friend request.
///
/// Only `Pending` accepts transitions. `Accepted` rows are deleted (never
/// reopened) when the resulting friendship is dissolved.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Declined,
    Cancelled,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Declined => "declined",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "declined" => Ok(RequestStatus::Declined),
            "cancelled" => Ok(RequestStatus::Cancelled),
            other => Err(format!("unknown request status: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request body for `POST /requests`. The sender is always the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendRequestBody {
    pub receiver_id: String,
}

/// Response body for a successful `POST /requests` (201).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SendRequestResponse {
    pub request_id: i64,
}

/// A friend request as seen by its sender or receiver.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendRequestView {
    pub request_id: i64,
    pub sender_id: String,
    pub receiver_id: String,
    pub status: RequestStatus,

    /// RFC 3339 creation timestamp.
    pub created_at: String,

    /// RFC 3339 timestamp of the accept/decline/cancel; absent while pending.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

// ---------------------------------------------------------------------------
// Friends
// ---------------------------------------------------------------------------

/// A single entry in a friend list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FriendEntry {
    /// The friend (never the user whose list this is).
    pub user_id: String,

    /// RFC 3339 timestamp at which the request was accepted.
    pub since: String,
}

// ---------------------------------------------------------------------------
// Relationship
// ---------------------------------------------------------------------------

/// Which way a pending request points, from the caller's point of view.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RequestDirection {
    /// The other user sent it; the caller may accept or decline.
    Incoming,
    /// The caller sent it; the caller may cancel.
    Outgoing,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingRequestRef {
    pub request_id: i64,
    pub direction: RequestDirection,
}

/// Response body for `GET /relationship/{id}`: how the caller relates to `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipView {
    pub user_id: String,
    pub is_friend: bool,
    /// The caller follows `user_id`.
    pub is_following: bool,
    /// `user_id` follows the caller.
    pub is_followed_by: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_request: Option<PendingRequestRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serialises_lowercase() {
        let json = serde_json::to_string(&RequestStatus::Cancelled).unwrap();
        assert_eq!(json, "\"cancelled\"");
        assert_eq!("declined".parse::<RequestStatus>().unwrap(), RequestStatus::Declined);
        assert!("rejected".parse::<RequestStatus>().is_err());
    }

    #[test]
    fn only_pending_is_open() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Accepted.is_terminal());
        assert!(RequestStatus::Declined.is_terminal());
        assert!(RequestStatus::Cancelled.is_terminal());
    }

    #[test]
    fn pending_view_omits_resolved_at() {
        let view = FriendRequestView {
            request_id: 1,
            sender_id: "a".into(),
            receiver_id: "b".into(),
            status: RequestStatus::Pending,
            created_at: "2026-01-01T00:00:00Z".into(),
            resolved_at: None,
        };
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("resolved_at"));
        assert!(json.contains("\"status\":\"pending\""));
    }
}
