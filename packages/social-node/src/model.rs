//! Domain records held by the relationship store.
//!
//! Every record refers to users by [`UserId`] only; user profiles belong to
//! the identity system and are never embedded here.

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

pub use socialgraph_api::{RequestDirection, RequestStatus};

use crate::social::SocialError;

/// Store-assigned friend request identifier.
pub type RequestId = i64;

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Opaque user reference issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for UserId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// FriendPair
// ---------------------------------------------------------------------------

/// Canonical unordered pair: the storage key of a friendship and the
/// uniqueness key of a pending request.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FriendPair {
    low: UserId,
    high: UserId,
}

impl FriendPair {
    /// Order `a` and `b`; fails with [`SocialError::InvalidSelfReference`] if they are equal.
    pub fn new(a: &UserId, b: &UserId) -> Result<Self, SocialError> {
        match a.cmp(b) {
            std::cmp::Ordering::Less => Ok(Self {
                low: a.clone(),
                high: b.clone(),
            }),
            std::cmp::Ordering::Greater => Ok(Self {
                low: b.clone(),
                high: a.clone(),
            }),
            std::cmp::Ordering::Equal => Err(SocialError::InvalidSelfReference),
        }
    }

    pub fn low(&self) -> &UserId {
        &self.low
    }

    pub fn high(&self) -> &UserId {
        &self.high
    }

    pub fn contains(&self, user: &UserId) -> bool {
        &self.low == user || &self.high == user
    }

    /// The member of the pair that is not `user`.
    pub fn other(&self, user: &UserId) -> &UserId {
        if &self.low == user {
            &self.high
        } else {
            &self.low
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FriendRequest {
    pub id: RequestId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub status: RequestStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FriendRequest {
    pub fn pair(&self) -> Result<FriendPair, SocialError> {
        FriendPair::new(&self.sender_id, &self.receiver_id)
    }

    pub fn involves(&self, user: &UserId) -> bool {
        &self.sender_id == user || &self.receiver_id == user
    }
}

/// A row of a follower, following, or friend list: the user on the other
/// end of the relation and when the relation started.
#[derive(Debug, Clone, PartialEq)]
pub struct RelatedUser {
    pub user_id: UserId,
    pub since: DateTime<Utc>,
}

/// Point-in-time counters for one user; each field is an independent count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocialStats {
    pub friends: u64,
    pub followers: u64,
    pub following: u64,
    pub pending_incoming: u64,
    pub pending_outgoing: u64,
}

/// How one user relates to another, from the first user's point of view.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub is_friend: bool,
    pub is_following: bool,
    pub is_followed_by: bool,
    pub pending: Option<(RequestId, RequestDirection)>,
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Keyset position inside a newest-first list: the `(created_at, key)` of the
/// last row already returned. `key` breaks timestamp ties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    pub at: DateTime<Utc>,
    pub key: K,
}

impl<K: fmt::Display + FromStr> Cursor<K> {
    pub fn new(at: DateTime<Utc>, key: K) -> Self {
        Self { at, key }
    }

    /// Wire form: `<unix micros>_<key>`.
    pub fn encode(&self) -> String {
        format!("{}_{}", self.at.timestamp_micros(), self.key)
    }

    /// Parse the wire form; `None` if it is malformed.
    pub fn decode(raw: &str) -> Option<Self> {
        let (micros, key) = raw.split_once('_')?;
        let at = DateTime::from_timestamp_micros(micros.parse().ok()?)?;
        let key = key.parse().ok()?;
        Some(Self { at, key })
    }
}

#[derive(Debug, Clone)]
pub struct Page<K> {
    pub after: Option<Cursor<K>>,
    pub limit: u32,
}

impl<K> Page<K> {
    pub fn first(limit: u32) -> Self {
        Self { after: None, limit }
    }
}

/// Current time at the microsecond precision the stores persist, so cursors
/// built from returned rows compare exactly against stored rows.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
