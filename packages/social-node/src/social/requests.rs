//! Friend Request Manager: the only writer of friend requests and friendships.
//!
//! Each operation validates and writes inside a single store transaction, so
//! the checks and the write see the same snapshot. Concurrency safety across
//! node instances comes from the store (immediate transactions plus unique
//! indexes); nothing here takes an in-process lock.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use crate::model::{now, FriendPair, FriendRequest, RequestId, RequestStatus, UserId};
use crate::storage::{Storage, StorageError};

use super::SocialError;

/// A move out of `Pending`, together with who is allowed to make it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transition {
    Accept,
    Decline,
    Cancel,
}

impl Transition {
    fn target(self) -> RequestStatus {
        match self {
            Transition::Accept => RequestStatus::Accepted,
            Transition::Decline => RequestStatus::Declined,
            Transition::Cancel => RequestStatus::Cancelled,
        }
    }

    fn verb(self) -> &'static str {
        match self {
            Transition::Accept => "accepted",
            Transition::Decline => "declined",
            Transition::Cancel => "cancelled",
        }
    }

    /// Check existence, then authorization, then state, in that order.
    fn validate(
        self,
        request: Option<FriendRequest>,
        actor: &UserId,
    ) -> Result<FriendRequest, SocialError> {
        let request = request.ok_or(SocialError::RequestNotFound)?;
        match self {
            Transition::Accept | Transition::Decline if &request.receiver_id != actor => {
                return Err(SocialError::NotRequestReceiver)
            }
            Transition::Cancel if &request.sender_id != actor => {
                return Err(SocialError::NotRequestSender)
            }
            _ => {}
        }
        if request.status != RequestStatus::Pending {
            return Err(SocialError::AlreadyResolved);
        }
        Ok(request)
    }
}

/// Owns the friend-request state machine
/// (`Pending → Accepted | Declined | Cancelled`) and the friendship rows an
/// accepted request creates.
#[derive(Clone)]
pub struct FriendRequestManager {
    store: Arc<dyn Storage>,
}

impl FriendRequestManager {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    /// Create a `Pending` request from `sender` to `receiver`.
    ///
    /// Fails with [`SocialError::RequestExists`] carrying the id of the
    /// pending request already linking the pair, whichever way it points.
    pub async fn send_request(
        &self,
        sender: &UserId,
        receiver: &UserId,
    ) -> Result<RequestId, SocialError> {
        let pair = FriendPair::new(sender, receiver)?;

        let result = self
            .retry_once("send", || {
                let (sender, receiver, pair) = (sender.clone(), receiver.clone(), pair.clone());
                self.store.transaction::<RequestId, SocialError, _>(move |tx| {
                    if tx.has_friendship(&pair)? {
                        return Err(SocialError::AlreadyFriends);
                    }
                    if let Some(existing) = tx.pending_between(&pair)? {
                        return Err(SocialError::RequestExists(existing.id));
                    }
                    Ok(tx.insert_request(&sender, &receiver, now())?)
                })
            })
            .await;

        match result {
            Ok(id) => {
                info!("friend_request: {id} sent by {sender} to {receiver}");
                Ok(id)
            }
            Err(SocialError::StorageConflict) => Err(self.explain_conflict(&pair).await),
            Err(e) => Err(e),
        }
    }

    /// Receiver accepts: the request becomes `Accepted` and the friendship row
    /// is created in the same transaction.
    ///
    /// If the friendship already exists the transaction is abandoned, the
    /// request stays `Pending`, and the caller gets [`SocialError::AlreadyFriends`].
    pub async fn accept_request(&self, id: RequestId, actor: &UserId) -> Result<(), SocialError> {
        self.resolve(id, actor, Transition::Accept).await
    }

    /// Receiver declines.
    pub async fn decline_request(&self, id: RequestId, actor: &UserId) -> Result<(), SocialError> {
        self.resolve(id, actor, Transition::Decline).await
    }

    /// Sender withdraws a request that is still pending.
    pub async fn cancel_request(&self, id: RequestId, actor: &UserId) -> Result<(), SocialError> {
        self.resolve(id, actor, Transition::Cancel).await
    }

    /// Delete the friendship between `actor` and `other` together with the
    /// accepted request rows behind it, so the pair can start over.
    pub async fn unfriend(&self, actor: &UserId, other: &UserId) -> Result<(), SocialError> {
        let pair = FriendPair::new(actor, other)?;

        let retired = self
            .retry_once("unfriend", || {
                let pair = pair.clone();
                self.store.transaction::<u64, SocialError, _>(move |tx| {
                    if !tx.remove_friendship(&pair)? {
                        return Err(SocialError::FriendshipNotFound);
                    }
                    Ok(tx.remove_accepted_requests(&pair)?)
                })
            })
            .await?;

        info!("friendship: {actor} unfriended {other} ({retired} accepted request(s) retired)");
        Ok(())
    }

    async fn resolve(
        &self,
        id: RequestId,
        actor: &UserId,
        transition: Transition,
    ) -> Result<(), SocialError> {
        let result = self
            .retry_once(transition.verb(), || {
                let actor = actor.clone();
                self.store.transaction::<FriendRequest, SocialError, _>(move |tx| {
                    let request = transition.validate(tx.get_request(id)?, &actor)?;
                    let at = now();
                    if !tx.resolve_request(id, transition.target(), at)? {
                        return Err(SocialError::AlreadyResolved);
                    }
                    if transition == Transition::Accept {
                        match tx.add_friendship(&request.pair()?, at) {
                            Ok(()) => {}
                            Err(StorageError::Conflict(_)) => return Err(SocialError::AlreadyFriends),
                            Err(e) => return Err(e.into()),
                        }
                    }
                    Ok(request)
                })
            })
            .await;

        match result {
            Ok(request) => {
                info!(
                    "friend_request: {id} {} by {actor} ({} -> {})",
                    transition.verb(),
                    request.sender_id,
                    request.receiver_id
                );
                Ok(())
            }
            Err(SocialError::StorageConflict) => {
                Err(self.explain_resolve_conflict(id, actor, transition).await)
            }
            Err(e) => Err(e),
        }
    }

    /// Explain a resolve conflict that survived the retry, from the request
    /// as it is now. A pending row elsewhere on the pair is never reported:
    /// the caller asked about `id`, not about the pair.
    async fn explain_resolve_conflict(
        &self,
        id: RequestId,
        actor: &UserId,
        transition: Transition,
    ) -> SocialError {
        let request = match self.store.get_request(id).await {
            Ok(request) => request,
            Err(e) => return e.into(),
        };
        let request = match transition.validate(request, actor) {
            Ok(request) => request,
            Err(e) => return e,
        };
        if transition != Transition::Accept {
            return SocialError::StorageConflict;
        }
        let pair = match request.pair() {
            Ok(pair) => pair,
            Err(e) => return e,
        };
        match self.store.has_friendship(&pair).await {
            Ok(true) => SocialError::AlreadyFriends,
            Ok(false) => SocialError::StorageConflict,
            Err(e) => e.into(),
        }
    }

    /// Run `attempt` and, if it loses a uniqueness race, run it once more.
    async fn retry_once<T, F, Fut>(&self, op: &str, mut attempt: F) -> Result<T, SocialError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SocialError>>,
    {
        match attempt().await {
            Err(SocialError::StorageConflict) => {
                warn!("friend_request: {op} hit a storage conflict; retrying once");
                attempt().await
            }
            other => other,
        }
    }

    /// Turn a send conflict that survived the retry into the error the caller
    /// can act on, based on what the pair looks like now.
    async fn explain_conflict(&self, pair: &FriendPair) -> SocialError {
        match self.store.pending_between(pair).await {
            Ok(Some(existing)) => return SocialError::RequestExists(existing.id),
            Ok(None) => {}
            Err(e) => return e.into(),
        }
        match self.store.has_friendship(pair).await {
            Ok(true) => SocialError::AlreadyFriends,
            Ok(false) => SocialError::StorageConflict,
            Err(e) => e.into(),
        }
    }
}
