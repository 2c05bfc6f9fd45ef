//! SQLite-backed storage implementation.
//!
//! Uses `rusqlite` (with bundled SQLite) wrapped in `Arc<Mutex<Connection>>`
//! to satisfy the `Send + Sync` requirements. All blocking calls are offloaded
//! to a thread-pool via `tokio::task::spawn_blocking`.
//!
//! A file-backed store holds two connections: writes and transactions go
//! through the writer, plain reads through the reader. Under WAL a reader
//! sees the last committed state and never waits for an open transaction.
//! An in-memory store has a single connection serving both roles.
//!
//! Several node processes may open the same database file. Correctness across
//! them comes from the schema constraints and from `BEGIN IMMEDIATE`
//! transactions (one writer at a time, others wait up to the busy timeout),
//! not from the in-process mutex.
//!
//! # Schema
//!
//! - `follows`: directed (follower, followee) edges.
//! - `friendships`: one row per canonical pair, `user_low < user_high`.
//! - `friend_requests`: request history; a partial unique index allows at
//!   most one `pending` row per canonical pair.
//!
//! Timestamps are stored as integer microseconds since the Unix epoch.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{Storage, StorageError, StoreTx, TxWork};
use crate::model::{
    now, FriendPair, FriendRequest, Page, RelatedUser, RequestDirection, RequestId,
    RequestStatus, UserId,
};

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS follows (
    follower_id TEXT    NOT NULL,
    followee_id TEXT    NOT NULL,
    created_at  INTEGER NOT NULL,
    PRIMARY KEY (follower_id, followee_id),
    CHECK (follower_id <> followee_id)
);
CREATE INDEX IF NOT EXISTS idx_follows_follower ON follows(follower_id, created_at);
CREATE INDEX IF NOT EXISTS idx_follows_followee ON follows(followee_id, created_at);

CREATE TABLE IF NOT EXISTS friendships (
    user_low   TEXT    NOT NULL,
    user_high  TEXT    NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (user_low, user_high),
    CHECK (user_low < user_high)
);
CREATE INDEX IF NOT EXISTS idx_friendships_high ON friendships(user_high);

CREATE TABLE IF NOT EXISTS friend_requests (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    sender_id   TEXT    NOT NULL,
    receiver_id TEXT    NOT NULL,
    pair_low    TEXT    NOT NULL,
    pair_high   TEXT    NOT NULL,
    status      TEXT    NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'accepted', 'declined', 'cancelled')),
    created_at  INTEGER NOT NULL,
    resolved_at INTEGER,
    CHECK (sender_id <> receiver_id)
);
-- At most one pending request per unordered pair, whichever way it points.
CREATE UNIQUE INDEX IF NOT EXISTS uq_friend_requests_pending
    ON friend_requests(pair_low, pair_high) WHERE status = 'pending';
CREATE INDEX IF NOT EXISTS idx_friend_requests_receiver
    ON friend_requests(receiver_id, status, created_at);
CREATE INDEX IF NOT EXISTS idx_friend_requests_sender
    ON friend_requests(sender_id, status, created_at);
";

const REQUEST_COLUMNS: &str = "id, sender_id, receiver_id, status, created_at, resolved_at";

// ---------------------------------------------------------------------------
// SqliteStorage
// ---------------------------------------------------------------------------

/// SQLite-backed implementation of [`Storage`].
pub struct SqliteStorage {
    writer: Arc<Mutex<Connection>>,
    reader: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Open (or create) the SQLite database at `path` and apply the schema.
    ///
    /// `busy_timeout` bounds how long a transaction waits for another
    /// connection (possibly in another process) to release the write lock.
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self, rusqlite::Error> {
        let path = path.as_ref();
        let writer = Connection::open(path)?;
        writer.busy_timeout(busy_timeout)?;
        writer.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;
        writer.execute_batch(SCHEMA)?;

        let reader = Connection::open(path)?;
        reader.busy_timeout(busy_timeout)?;

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            reader: Arc::new(Mutex::new(reader)),
        })
    }

    /// Open an in-memory SQLite database (data is lost when dropped).
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            writer: Arc::clone(&conn),
            reader: conn,
        })
    }

    /// Run a read-only `f` against the reader connection.
    async fn read<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        blocking(Arc::clone(&self.reader), f).await
    }

    /// Run `f` against the writer connection.
    async fn write<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
    {
        blocking(Arc::clone(&self.writer), f).await
    }
}

/// Lock `conn` and run `f` on the blocking thread-pool.
async fn blocking<T, F>(conn: Arc<Mutex<Connection>>, f: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T, StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let conn = lock(&conn)?;
        f(&conn)
    })
    .await
    .map_err(join_err)?
}

// ---------------------------------------------------------------------------
// Error and value conversions
// ---------------------------------------------------------------------------

fn map_err(e: rusqlite::Error) -> StorageError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StorageError::Conflict(e.to_string())
        }
        _ => StorageError::Internal(e.to_string()),
    }
}

fn join_err(e: tokio::task::JoinError) -> StorageError {
    StorageError::Internal(format!("task join error: {e}"))
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, StorageError> {
    conn.lock()
        .map_err(|_| StorageError::Internal("sqlite connection lock poisoned".into()))
}

fn timestamp(idx: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_micros(micros)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, micros))
}

fn request_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<FriendRequest> {
    let status: String = row.get(3)?;
    let status = status.parse::<RequestStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(FriendRequest {
        id: row.get(0)?,
        sender_id: row.get::<_, String>(1)?.into(),
        receiver_id: row.get::<_, String>(2)?.into(),
        status,
        created_at: timestamp(4, row.get(4)?)?,
        resolved_at: row
            .get::<_, Option<i64>>(5)?
            .map(|v| timestamp(5, v))
            .transpose()?,
    })
}

/// Split the `limit + 1` rows a keyset query fetched into `(page, has_more)`.
fn split_page<T>(mut rows: Vec<T>, limit: u32) -> (Vec<T>, bool) {
    let limit = limit as usize;
    let has_more = rows.len() > limit;
    if has_more {
        rows.truncate(limit);
    }
    (rows, has_more)
}

// ---------------------------------------------------------------------------
// Shared queries (used both inside and outside transactions)
// ---------------------------------------------------------------------------

fn select_request(conn: &Connection, id: RequestId) -> Result<Option<FriendRequest>, StorageError> {
    conn.query_row(
        &format!("SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE id = ?1"),
        params![id],
        request_from_row,
    )
    .optional()
    .map_err(map_err)
}

fn select_pending_between(
    conn: &Connection,
    pair: &FriendPair,
) -> Result<Option<FriendRequest>, StorageError> {
    conn.query_row(
        &format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests
             WHERE pair_low = ?1 AND pair_high = ?2 AND status = 'pending'"
        ),
        params![pair.low().as_str(), pair.high().as_str()],
        request_from_row,
    )
    .optional()
    .map_err(map_err)
}

fn friendship_exists(conn: &Connection, pair: &FriendPair) -> Result<bool, StorageError> {
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM friendships WHERE user_low = ?1 AND user_high = ?2",
            params![pair.low().as_str(), pair.high().as_str()],
            |row| row.get(0),
        )
        .map_err(map_err)?;
    Ok(count > 0)
}

/// Run a newest-first keyset query whose rows are `(user_id, created_at)`.
///
/// `sql` binds `?1` = user, `?2`/`?3` = cursor (NULL for the first page),
/// `?4` = limit + 1.
fn select_related(
    conn: &Connection,
    sql: &str,
    user: &UserId,
    page: &Page<UserId>,
) -> Result<(Vec<RelatedUser>, bool), StorageError> {
    let (at, key) = match &page.after {
        Some(c) => (Some(c.at.timestamp_micros()), Some(c.key.as_str())),
        None => (None, None),
    };
    let mut stmt = conn.prepare(sql).map_err(map_err)?;
    let rows = stmt
        .query_map(
            params![user.as_str(), at, key, page.limit as i64 + 1],
            |row| {
                Ok(RelatedUser {
                    user_id: row.get::<_, String>(0)?.into(),
                    since: timestamp(1, row.get(1)?)?,
                })
            },
        )
        .map_err(map_err)?
        .collect::<Result<Vec<_>, _>>()
        .map_err(map_err)?;
    Ok(split_page(rows, page.limit))
}

fn count(conn: &Connection, sql: &str, user: &UserId) -> Result<u64, StorageError> {
    let n: i64 = conn
        .query_row(sql, params![user.as_str()], |row| row.get(0))
        .map_err(map_err)?;
    Ok(n as u64)
}

fn pending_column(direction: RequestDirection) -> &'static str {
    match direction {
        RequestDirection::Incoming => "receiver_id",
        RequestDirection::Outgoing => "sender_id",
    }
}

// ---------------------------------------------------------------------------
// Transaction handle
// ---------------------------------------------------------------------------

struct SqliteTx<'a> {
    conn: &'a Connection,
}

impl StoreTx for SqliteTx<'_> {
    fn has_friendship(&mut self, pair: &FriendPair) -> Result<bool, StorageError> {
        friendship_exists(self.conn, pair)
    }

    fn add_friendship(
        &mut self,
        pair: &FriendPair,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO friendships (user_low, user_high, created_at) VALUES (?1, ?2, ?3)",
                params![pair.low().as_str(), pair.high().as_str(), at.timestamp_micros()],
            )
            .map_err(map_err)?;
        Ok(())
    }

    fn remove_friendship(&mut self, pair: &FriendPair) -> Result<bool, StorageError> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM friendships WHERE user_low = ?1 AND user_high = ?2",
                params![pair.low().as_str(), pair.high().as_str()],
            )
            .map_err(map_err)?;
        Ok(removed > 0)
    }

    fn get_request(&mut self, id: RequestId) -> Result<Option<FriendRequest>, StorageError> {
        select_request(self.conn, id)
    }

    fn pending_between(
        &mut self,
        pair: &FriendPair,
    ) -> Result<Option<FriendRequest>, StorageError> {
        select_pending_between(self.conn, pair)
    }

    fn insert_request(
        &mut self,
        sender: &UserId,
        receiver: &UserId,
        at: DateTime<Utc>,
    ) -> Result<RequestId, StorageError> {
        let pair = FriendPair::new(sender, receiver)
            .map_err(|_| StorageError::Conflict("sender and receiver are the same user".into()))?;
        self.conn
            .execute(
                "INSERT INTO friend_requests
                    (sender_id, receiver_id, pair_low, pair_high, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, 'pending', ?5)",
                params![
                    sender.as_str(),
                    receiver.as_str(),
                    pair.low().as_str(),
                    pair.high().as_str(),
                    at.timestamp_micros(),
                ],
            )
            .map_err(map_err)?;
        Ok(self.conn.last_insert_rowid())
    }

    fn resolve_request(
        &mut self,
        id: RequestId,
        status: RequestStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let changed = self
            .conn
            .execute(
                "UPDATE friend_requests SET status = ?2, resolved_at = ?3
                 WHERE id = ?1 AND status = 'pending'",
                params![id, status.as_str(), at.timestamp_micros()],
            )
            .map_err(map_err)?;
        Ok(changed == 1)
    }

    fn remove_accepted_requests(&mut self, pair: &FriendPair) -> Result<u64, StorageError> {
        let removed = self
            .conn
            .execute(
                "DELETE FROM friend_requests
                 WHERE pair_low = ?1 AND pair_high = ?2 AND status = 'accepted'",
                params![pair.low().as_str(), pair.high().as_str()],
            )
            .map_err(map_err)?;
        Ok(removed as u64)
    }
}

// ---------------------------------------------------------------------------
// Storage impl
// ---------------------------------------------------------------------------

#[async_trait]
impl Storage for SqliteStorage {
    // --- Follows -------------------------------------------------------------

    async fn add_follow(&self, follower: &UserId, followee: &UserId) -> Result<(), StorageError> {
        let follower = follower.clone();
        let followee = followee.clone();
        self.write(move |conn| {
            conn.execute(
                "INSERT INTO follows (follower_id, followee_id, created_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(follower_id, followee_id) DO NOTHING",
                params![follower.as_str(), followee.as_str(), now().timestamp_micros()],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn remove_follow(
        &self,
        follower: &UserId,
        followee: &UserId,
    ) -> Result<(), StorageError> {
        let follower = follower.clone();
        let followee = followee.clone();
        self.write(move |conn| {
            conn.execute(
                "DELETE FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                params![follower.as_str(), followee.as_str()],
            )
            .map_err(map_err)?;
            Ok(())
        })
        .await
    }

    async fn has_follow(&self, follower: &UserId, followee: &UserId) -> Result<bool, StorageError> {
        let follower = follower.clone();
        let followee = followee.clone();
        self.read(move |conn| {
            let count: i64 = conn
                .query_row(
                    "SELECT COUNT(*) FROM follows WHERE follower_id = ?1 AND followee_id = ?2",
                    params![follower.as_str(), followee.as_str()],
                    |row| row.get(0),
                )
                .map_err(map_err)?;
            Ok(count > 0)
        })
        .await
    }

    async fn list_following(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError> {
        let user = user.clone();
        let page = page.clone();
        self.read(move |conn| {
            select_related(
                conn,
                "SELECT followee_id, created_at FROM follows
                 WHERE follower_id = ?1
                   AND (?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND followee_id < ?3))
                 ORDER BY created_at DESC, followee_id DESC
                 LIMIT ?4",
                &user,
                &page,
            )
        })
        .await
    }

    async fn list_followers(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError> {
        let user = user.clone();
        let page = page.clone();
        self.read(move |conn| {
            select_related(
                conn,
                "SELECT follower_id, created_at FROM follows
                 WHERE followee_id = ?1
                   AND (?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND follower_id < ?3))
                 ORDER BY created_at DESC, follower_id DESC
                 LIMIT ?4",
                &user,
                &page,
            )
        })
        .await
    }

    async fn count_following(&self, user: &UserId) -> Result<u64, StorageError> {
        let user = user.clone();
        self.read(move |conn| {
            count(conn, "SELECT COUNT(*) FROM follows WHERE follower_id = ?1", &user)
        })
        .await
    }

    async fn count_followers(&self, user: &UserId) -> Result<u64, StorageError> {
        let user = user.clone();
        self.read(move |conn| {
            count(conn, "SELECT COUNT(*) FROM follows WHERE followee_id = ?1", &user)
        })
        .await
    }

    // --- Friendships ---------------------------------------------------------

    async fn has_friendship(&self, pair: &FriendPair) -> Result<bool, StorageError> {
        let pair = pair.clone();
        self.read(move |conn| friendship_exists(conn, &pair))
            .await
    }

    async fn list_friends(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<(Vec<RelatedUser>, bool), StorageError> {
        let user = user.clone();
        let page = page.clone();
        self.read(move |conn| {
            select_related(
                conn,
                "SELECT friend_id, created_at FROM (
                     SELECT CASE WHEN user_low = ?1 THEN user_high ELSE user_low END AS friend_id,
                            created_at
                     FROM friendships
                     WHERE user_low = ?1 OR user_high = ?1
                 )
                 WHERE (?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND friend_id < ?3))
                 ORDER BY created_at DESC, friend_id DESC
                 LIMIT ?4",
                &user,
                &page,
            )
        })
        .await
    }

    async fn count_friends(&self, user: &UserId) -> Result<u64, StorageError> {
        let user = user.clone();
        self.read(move |conn| {
            count(
                conn,
                "SELECT COUNT(*) FROM friendships WHERE user_low = ?1 OR user_high = ?1",
                &user,
            )
        })
        .await
    }

    // --- Friend requests -----------------------------------------------------

    async fn get_request(&self, id: RequestId) -> Result<Option<FriendRequest>, StorageError> {
        self.read(move |conn| select_request(conn, id)).await
    }

    async fn pending_between(
        &self,
        pair: &FriendPair,
    ) -> Result<Option<FriendRequest>, StorageError> {
        let pair = pair.clone();
        self.read(move |conn| select_pending_between(conn, &pair))
            .await
    }

    async fn list_pending(
        &self,
        user: &UserId,
        direction: RequestDirection,
        page: &Page<RequestId>,
    ) -> Result<(Vec<FriendRequest>, bool), StorageError> {
        let user = user.clone();
        let page = page.clone();
        self.read(move |conn| {
            let column = pending_column(direction);
            let (at, key) = match &page.after {
                Some(c) => (Some(c.at.timestamp_micros()), Some(c.key)),
                None => (None, None),
            };
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {REQUEST_COLUMNS} FROM friend_requests
                     WHERE {column} = ?1 AND status = 'pending'
                       AND (?2 IS NULL OR created_at < ?2 OR (created_at = ?2 AND id < ?3))
                     ORDER BY created_at DESC, id DESC
                     LIMIT ?4"
                ))
                .map_err(map_err)?;
            let rows = stmt
                .query_map(
                    params![user.as_str(), at, key, page.limit as i64 + 1],
                    request_from_row,
                )
                .map_err(map_err)?
                .collect::<Result<Vec<_>, _>>()
                .map_err(map_err)?;
            Ok(split_page(rows, page.limit))
        })
        .await
    }

    async fn count_pending(
        &self,
        user: &UserId,
        direction: RequestDirection,
    ) -> Result<u64, StorageError> {
        let user = user.clone();
        self.read(move |conn| {
            let column = pending_column(direction);
            count(
                conn,
                &format!(
                    "SELECT COUNT(*) FROM friend_requests WHERE {column} = ?1 AND status = 'pending'"
                ),
                &user,
            )
        })
        .await
    }

    // --- Transactions --------------------------------------------------------

    async fn run_transaction(&self, work: TxWork) -> Result<(), StorageError> {
        let conn = Arc::clone(&self.writer);
        tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
            let mut conn = lock(&conn)?;
            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(map_err)?;
            work(&mut SqliteTx { conn: &*tx })?;
            tx.commit().map_err(map_err)?;
            Ok(())
        })
        .await
        .map_err(join_err)?
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
