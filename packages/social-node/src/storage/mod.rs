//! Relationship store: follow edges, friendships, and the friend-request table.
//!
//! The [`Storage`] trait is the contract between the social core and
//! persistence. It enforces uniqueness (one follow edge per ordered pair, one
//! friendship per canonical pair, one pending request per canonical pair) as
//! the last line of defence against races; the state machine itself lives in
//! [`crate::social::requests`].
//!
//! # Implementations
//!
//! | Type | When to use |
//! |------|-------------|
//! | [`MemoryStorage`] | Tests, conformance suite, ephemeral nodes |
//! | [`SqliteStorage`] | Production; one database file, shareable across processes |
//!
//! [`MemoryStorage`]: memory::MemoryStorage
//! [`SqliteStorage`]: sqlite::SqliteStorage

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{
    FriendPair, FriendRequest, Page, RelatedUser, RequestDirection, RequestId, RequestStatus,
    UserId,
};

// ---------------------------------------------------------------------------
// StorageError
// ---------------------------------------------------------------------------

/// Errors that storage operations can return.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A uniqueness or check constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The transaction's work returned an error and everything was rolled back.
    #[error("transaction aborted")]
    Aborted,

    /// An unexpected error in the underlying storage backend.
    #[error("internal storage error: {0}")]
    Internal(String),
}

// ---------------------------------------------------------------------------
// StoreTx
// ---------------------------------------------------------------------------

/// Operations available inside a transaction opened by
/// [`Storage::run_transaction`].
///
/// Everything done through one `StoreTx` commits or rolls back together.
/// Calls are synchronous: the transaction never spans an `.await`.
pub trait StoreTx {
    fn has_friendship(&mut self, pair: &FriendPair) -> Result<bool, StorageError>;

    /// Insert the friendship row. [`StorageError::Conflict`] if it exists.
    fn add_friendship(&mut self, pair: &FriendPair, at: DateTime<Utc>)
        -> Result<(), StorageError>;

    /// Delete the friendship row; `false` if there was none.
    fn remove_friendship(&mut self, pair: &FriendPair) -> Result<bool, StorageError>;

    fn get_request(&mut self, id: RequestId) -> Result<Option<FriendRequest>, StorageError>;

    /// The pending request between the pair, in either direction.
    fn pending_between(&mut self, pair: &FriendPair)
        -> Result<Option<FriendRequest>, StorageError>;

    /// Insert a `Pending` request and return its id.
    /// [`StorageError::Conflict`] if the pair already has a pending request.
    fn insert_request(
        &mut self,
        sender: &UserId,
        receiver: &UserId,
        at: DateTime<Utc>,
    ) -> Result<RequestId, StorageError>;

    /// Move a request out of `Pending`. Returns `false` without writing when
    /// the row is missing or no longer pending.
    fn resolve_request(
        &mut self,
        id: RequestId,
        status: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError>;

    /// Delete every `Accepted` request between the pair; returns how many.
    fn remove_accepted_requests(&mut self, pair: &FriendPair) -> Result<u64, StorageError>;
}

/// A unit of transactional work. Returning `Err` rolls the transaction back.
pub type TxWork = Box<dyn FnOnce(&mut dyn StoreTx) -> Result<(), StorageError> + Send>;

// ---------------------------------------------------------------------------
// Storage trait
// ---------------------------------------------------------------------------

/// The persistence contract for the social graph.
///
/// All methods are `async` and must be `Send + Sync + 'static` so the store
/// can be held in an `Arc<dyn Storage>` and shared by every handler. Lists are
/// newest first, ordered by `(created_at, key)` descending.
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    // --- Follows -------------------------------------------------------------

    /// Record that `follower` follows `followee`. Idempotent.
    async fn add_follow(&self, follower: &UserId, followee: &UserId) -> Result<(), StorageError>;

    /// Remove a follow edge. Idempotent (no error if it didn't exist).
    async fn remove_follow(&self, follower: &UserId, followee: &UserId)
        -> Result<(), StorageError>;

    async fn has_follow(&self, follower: &UserId, followee: &UserId) -> Result<bool, StorageError>;

    /// Users that `user` follows. Returns `(rows, has_more)`.
    async fn list_following(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError>;

    /// Users that follow `user`. Returns `(rows, has_more)`.
    async fn list_followers(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError>;

    async fn count_following(&self, user: &UserId) -> Result<u64, StorageError>;

    async fn count_followers(&self, user: &UserId) -> Result<u64, StorageError>;

    // --- Friendships ---------------------------------------------------------

    async fn has_friendship(&self, pair: &FriendPair) -> Result<bool, StorageError>;

    /// Friends of `user`, keyed by the friend's id. Returns `(rows, has_more)`.
    async fn list_friends(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError>;

    async fn count_friends(&self, user: &UserId) -> Result<u64, StorageError>;

    // --- Friend requests -----------------------------------------------------

    async fn get_request(&self, id: RequestId) -> Result<Option<FriendRequest>, StorageError>;

    async fn pending_between(&self, pair: &FriendPair)
        -> Result<Option<FriendRequest>, StorageError>;

    /// Pending requests received (`Incoming`) or sent (`Outgoing`) by `user`.
    async fn list_pending(
        &self,
        user: &UserId,
        direction: RequestDirection,
        page: &Page<RequestId>,
    ) -> Result<(Vec<FriendRequest>, bool), StorageError>;

    async fn count_pending(
        &self,
        user: &UserId,
        direction: RequestDirection,
    ) -> Result<u64, StorageError>;

    // --- Transactions --------------------------------------------------------

    /// Run `work` inside one atomic transaction.
    ///
    /// Commits when `work` returns `Ok`; otherwise every write made through
    /// the [`StoreTx`] is discarded and the error is returned unchanged.
    async fn run_transaction(&self, work: TxWork) -> Result<(), StorageError>;
}

impl dyn Storage {
    /// Typed wrapper over [`Storage::run_transaction`] that hands back the
    /// value produced by `work`.
    ///
    /// `work` may fail with any error that a [`StorageError`] converts into.
    /// Its own error is returned as-is and rolls the transaction back; a
    /// backend failure comes back converted.
    pub async fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StorageError> + Send + 'static,
        F: FnOnce(&mut dyn StoreTx) -> Result<T, E> + Send + 'static,
    {
        let (out_tx, mut out_rx) = tokio::sync::oneshot::channel();
        let outcome = self
            .run_transaction(Box::new(move |tx: &mut dyn StoreTx| -> Result<(), StorageError> {
                let result = work(tx);
                let commit = result.is_ok();
                // The receiver outlives the transaction; a failed send cannot happen.
                let _ = out_tx.send(result);
                if commit {
                    Ok(())
                } else {
                    Err(StorageError::Aborted)
                }
            }))
            .await;

        match (out_rx.try_recv(), outcome) {
            (Ok(Err(e)), _) => Err(e),
            (Ok(Ok(value)), Ok(())) => Ok(value),
            (_, Err(e)) => Err(e.into()),
            (Err(_), Ok(())) => Err(StorageError::Internal(
                "transaction committed without running its work".into(),
            )
            .into()),
        }
    }
}
