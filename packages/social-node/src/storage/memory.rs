//! In-memory storage implementation.
//!
//! All data is held in RAM behind a [`RwLock`] and is lost when the process
//! exits. Use this for tests, the conformance suite, and ephemeral nodes.
//!
//! Transactions run against a cloned draft of the whole state while the
//! write lock is held; the draft replaces the live state only when the work
//! succeeds, which gives all-or-nothing semantics without an undo log.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{Storage, StorageError, StoreTx, TxWork};
use crate::model::{
    now, FriendPair, FriendRequest, Page, RelatedUser, RequestDirection, RequestId,
    RequestStatus, UserId,
};

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct Inner {
    /// (follower, followee) → created_at.
    follows: HashMap<(UserId, UserId), DateTime<Utc>>,
    friendships: BTreeMap<FriendPair, DateTime<Utc>>,
    requests: BTreeMap<RequestId, FriendRequest>,
    last_request_id: RequestId,
}

impl Inner {
    fn related_by_follow<F>(&self, select: F) -> Vec<(DateTime<Utc>, UserId, RelatedUser)>
    where
        F: Fn(&UserId, &UserId) -> Option<UserId>,
    {
        self.follows
            .iter()
            .filter_map(|((follower, followee), at)| {
                select(follower, followee).map(|user_id| {
                    (
                        *at,
                        user_id.clone(),
                        RelatedUser {
                            user_id,
                            since: *at,
                        },
                    )
                })
            })
            .collect()
    }

    fn pending_between(&self, pair: &FriendPair) -> Option<FriendRequest> {
        self.requests
            .values()
            .find(|r| {
                r.status == RequestStatus::Pending
                    && r.pair().map(|p| &p == pair).unwrap_or(false)
            })
            .cloned()
    }

    fn pending_for<'a>(
        &'a self,
        user: &'a UserId,
        direction: RequestDirection,
    ) -> impl Iterator<Item = &'a FriendRequest> + 'a {
        self.requests.values().filter(move |r| {
            r.status == RequestStatus::Pending
                && match direction {
                    RequestDirection::Incoming => &r.receiver_id == user,
                    RequestDirection::Outgoing => &r.sender_id == user,
                }
        })
    }
}

/// Sort newest first by `(at, key)` and cut one keyset page.
fn newest_first<K: Ord, T>(mut rows: Vec<(DateTime<Utc>, K, T)>, page: &Page<K>) -> (Vec<T>, bool) {
    rows.sort_by(|a, b| (&b.0, &b.1).cmp(&(&a.0, &a.1)));
    let limit = page.limit as usize;
    let mut items: Vec<T> = rows
        .into_iter()
        .filter(|(at, key, _)| match &page.after {
            Some(c) => (at, key) < (&c.at, &c.key),
            None => true,
        })
        .take(limit + 1)
        .map(|(_, _, row)| row)
        .collect();
    let has_more = items.len() > limit;
    if has_more {
        items.truncate(limit);
    }
    (items, has_more)
}

// ---------------------------------------------------------------------------
// MemoryStorage
// ---------------------------------------------------------------------------

/// Thread-safe, in-memory implementation of [`Storage`].
pub struct MemoryStorage {
    inner: RwLock<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StorageError> {
        self.inner
            .read()
            .map_err(|_| StorageError::Internal("memory store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StorageError> {
        self.inner
            .write()
            .map_err(|_| StorageError::Internal("memory store lock poisoned".into()))
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Transaction handle
// ---------------------------------------------------------------------------

struct MemoryTx<'a> {
    draft: &'a mut Inner,
}

impl StoreTx for MemoryTx<'_> {
    fn has_friendship(&mut self, pair: &FriendPair) -> Result<bool, StorageError> {
        Ok(self.draft.friendships.contains_key(pair))
    }

    fn add_friendship(
        &mut self,
        pair: &FriendPair,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        if self.draft.friendships.contains_key(pair) {
            return Err(StorageError::Conflict(format!(
                "friendship {}/{} already exists",
                pair.low(),
                pair.high()
            )));
        }
        self.draft.friendships.insert(pair.clone(), at);
        Ok(())
    }

    fn remove_friendship(&mut self, pair: &FriendPair) -> Result<bool, StorageError> {
        Ok(self.draft.friendships.remove(pair).is_some())
    }

    fn get_request(&mut self, id: RequestId) -> Result<Option<FriendRequest>, StorageError> {
        Ok(self.draft.requests.get(&id).cloned())
    }

    fn pending_between(
        &mut self,
        pair: &FriendPair,
    ) -> Result<Option<FriendRequest>, StorageError> {
        Ok(self.draft.pending_between(pair))
    }

    fn insert_request(
        &mut self,
        sender: &UserId,
        receiver: &UserId,
        at: DateTime<Utc>,
    ) -> Result<RequestId, StorageError> {
        let pair = FriendPair::new(sender, receiver)
            .map_err(|_| StorageError::Conflict("sender and receiver are the same user".into()))?;
        if let Some(existing) = self.draft.pending_between(&pair) {
            return Err(StorageError::Conflict(format!(
                "pending request {} already links this pair",
                existing.id
            )));
        }
        self.draft.last_request_id += 1;
        let id = self.draft.last_request_id;
        self.draft.requests.insert(
            id,
            FriendRequest {
                id,
                sender_id: sender.clone(),
                receiver_id: receiver.clone(),
                status: RequestStatus::Pending,
                created_at: at,
                resolved_at: None,
            },
        );
        Ok(id)
    }

    fn resolve_request(
        &mut self,
        id: RequestId,
        status: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        match self.draft.requests.get_mut(&id) {
            Some(r) if r.status == RequestStatus::Pending => {
                r.status = status;
                r.resolved_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn remove_accepted_requests(&mut self, pair: &FriendPair) -> Result<u64, StorageError> {
        let before = self.draft.requests.len();
        self.draft.requests.retain(|_, r| {
            !(r.status == RequestStatus::Accepted
                && r.pair().map(|p| &p == pair).unwrap_or(false))
        });
        Ok((before - self.draft.requests.len()) as u64)
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for MemoryStorage {
    // --- Follows -------------------------------------------------------------

    async fn add_follow(&self, follower: &UserId, followee: &UserId) -> Result<(), StorageError> {
        if follower == followee {
            return Err(StorageError::Conflict("a user cannot follow themselves".into()));
        }
        let mut inner = self.write()?;
        inner
            .follows
            .entry((follower.clone(), followee.clone()))
            .or_insert_with(now);
        Ok(())
    }

    async fn remove_follow(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<(), StorageError> {
        let mut inner = self.write()?;
        inner.follows.remove(&(follower.clone(), followee.clone()));
        Ok(())
    }

    async fn has_follow(&self, follower: &UserId, followee: &UserId) -> Result<bool, StorageError> {
        let inner = self.read()?;
        Ok(inner
            .follows
            .contains_key(&(follower.clone(), followee.clone())))
    }

    async fn list_following(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError> {
        let inner = self.read()?;
        let rows = inner.related_by_follow(|follower, followee| {
            (follower == user).then(|| followee.clone())
        });
        Ok(newest_first(rows, page))
    }

    async fn list_followers(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError> {
        let inner = self.read()?;
        let rows = inner.related_by_follow(|follower, followee| {
            (followee == user).then(|| follower.clone())
        });
        Ok(newest_first(rows, page))
    }

    async fn count_following(&self, user: &UserId) -> Result<u64, StorageError> {
        let inner = self.read()?;
        Ok(inner.follows.keys().filter(|(f, _)| f == user).count() as u64)
    }

    async fn count_followers(&self, user: &UserId) -> Result<u64, StorageError> {
        let inner = self.read()?;
        Ok(inner.follows.keys().filter(|(_, f)| f == user).count() as u64)
    }

    // --- Friendships ---------------------------------------------------------

    async fn has_friendship(&self, pair: &FriendPair) -> Result<bool, StorageError> {
        let inner = self.read()?;
        Ok(inner.friendships.contains_key(pair))
    }

    async fn list_friends(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError> {
        let inner = self.read()?;
        let rows = inner
            .friendships
            .iter()
            .filter(|(pair, _)| pair.contains(user))
            .map(|(pair, at)| {
                let friend = pair.other(user).clone();
                (
                    *at,
                    friend.clone(),
                    RelatedUser {
                        user_id: friend,
                        since: *at,
                    },
                )
            })
            .collect();
        Ok(newest_first(rows, page))
    }

    async fn count_friends(&self, user: &UserId) -> Result<u64, StorageError> {
        let inner = self.read()?;
        Ok(inner.friendships.keys().filter(|p| p.contains(user)).count() as u64)
    }

    // --- Friend requests -----------------------------------------------------

    async fn get_request(&self, id: RequestId) -> Result<Option<FriendRequest>, StorageError> {
        let inner = self.read()?;
        Ok(inner.requests.get(&id).cloned())
    }

    async fn pending_between(
        &self,
        pair: &FriendPair,
    ) -> Result<Option<FriendRequest>, StorageError> {
        let inner = self.read()?;
        Ok(inner.pending_between(pair))
    }

    async fn list_pending(
        &self,
        user: &UserId,
        direction: RequestDirection,
        page: &Page<RequestId>,
    ) -> Result<(Vec<FriendRequest>, bool), StorageError> {
        let inner = self.read()?;
        let rows = inner
            .pending_for(user, direction)
            .map(|r| (r.created_at, r.id, r.clone()))
            .collect();
        Ok(newest_first(rows, page))
    }

    async fn count_pending(
        &self,
        user: &UserId,
        direction: RequestDirection,
    ) -> Result<u64, StorageError> {
        let inner = self.read()?;
        Ok(inner.pending_for(user, direction).count() as u64)
    }

    // --- Transactions --------------------------------------------------------

    async fn run_transaction(&self, work: TxWork) -> Result<(), StorageError> {
        let mut live = self.write()?;
        let mut draft = live.clone();
        work(&mut MemoryTx { draft: &mut draft })?;
        *live = draft;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
