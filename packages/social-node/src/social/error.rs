//! The closed error taxonomy of the social core.

use crate::model::RequestId;
use crate::storage::StorageError;

/// Every caller-correctable outcome of a social operation.
///
/// All variants except [`SocialError::Storage`] are recoverable conditions the
/// caller can act on. `NotRequestReceiver` / `NotRequestSender` are kept apart
/// from `RequestNotFound` here; the facade decides whether to collapse them.
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("a user cannot target themselves")]
    InvalidSelfReference,

    #[error("users are already friends")]
    AlreadyFriends,

    /// A pending request already links the pair, in either direction.
    #[error("a pending friend request already exists (id {0})")]
    RequestExists(RequestId),

    #[error("friend request not found")]
    RequestNotFound,

    #[error("friendship not found")]
    FriendshipNotFound,

    #[error("only the receiver may act on this request")]
    NotRequestReceiver,

    #[error("only the sender may cancel this request")]
    NotRequestSender,

    #[error("friend request is already resolved")]
    AlreadyResolved,

    /// A uniqueness constraint fired that the pre-checks did not anticipate.
    #[error("concurrent modification, retry the operation")]
    StorageConflict,

    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for SocialError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::Conflict(_) => SocialError::StorageConflict,
            other => SocialError::Storage(other),
        }
    }
}
