//! Social Facade: the operation surface the transport layer calls.
//!
//! Follow and unfollow are handled here directly since follow edges carry no
//! state. Everything else is delegated to the manager or the query service.
//! The only translation applied on the way out is the optional collapse of
//! "not yours" into "not found".

use std::sync::Arc;

use tracing::info;

use crate::model::{
    FriendRequest, Page, RelatedUser, Relationship, RequestId, SocialStats, UserId,
};
use crate::storage::Storage;

use super::{FriendRequestManager, Listing, SocialError, SocialQueryService};

#[derive(Clone)]
pub struct SocialFacade {
    store: Arc<dyn Storage>,
    requests: FriendRequestManager,
    queries: SocialQueryService,
    collapse_authorization_errors: bool,
}

impl SocialFacade {
    /// When `collapse_authorization_errors` is set, `NotRequestReceiver` and
    /// `NotRequestSender` are reported as `RequestNotFound` so outside callers
    /// cannot discover request ids they are not party to.
    pub fn new(store: Arc<dyn Storage>, collapse_authorization_errors: bool) -> Self {
        Self {
            requests: FriendRequestManager::new(Arc::clone(&store)),
            queries: SocialQueryService::new(Arc::clone(&store)),
            store,
            collapse_authorization_errors,
        }
    }

    fn external<T>(&self, result: Result<T, SocialError>) -> Result<T, SocialError> {
        result.map_err(|e| match e {
            SocialError::NotRequestReceiver | SocialError::NotRequestSender
                if self.collapse_authorization_errors =>
            {
                SocialError::RequestNotFound
            }
            other => other,
        })
    }

    // --- Follows -------------------------------------------------------------

    pub async fn follow(&self, actor: &UserId, target: &UserId) -> Result<(), SocialError> {
        if actor == target {
            return Err(SocialError::InvalidSelfReference);
        }
        self.store.add_follow(actor, target).await?;
        info!("follow: {actor} -> {target}");
        Ok(())
    }

    pub async fn unfollow(&self, actor: &UserId, target: &UserId) -> Result<(), SocialError> {
        if actor == target {
            return Err(SocialError::InvalidSelfReference);
        }
        self.store.remove_follow(actor, target).await?;
        info!("unfollow: {actor} -/-> {target}");
        Ok(())
    }

    // --- Friend requests -----------------------------------------------------

    pub async fn send_request(
        &self,
        actor: &UserId,
        receiver: &UserId,
    ) -> Result<RequestId, SocialError> {
        self.external(self.requests.send_request(actor, receiver).await)
    }

    pub async fn accept_request(&self, id: RequestId, actor: &UserId) -> Result<(), SocialError> {
        self.external(self.requests.accept_request(id, actor).await)
    }

    pub async fn decline_request(&self, id: RequestId, actor: &UserId) -> Result<(), SocialError> {
        self.external(self.requests.decline_request(id, actor).await)
    }

    pub async fn cancel_request(&self, id: RequestId, actor: &UserId) -> Result<(), SocialError> {
        self.external(self.requests.cancel_request(id, actor).await)
    }

    pub async fn unfriend(&self, actor: &UserId, other: &UserId) -> Result<(), SocialError> {
        self.external(self.requests.unfriend(actor, other).await)
    }

    pub async fn get_request(
        &self,
        id: RequestId,
        actor: &UserId,
    ) -> Result<FriendRequest, SocialError> {
        self.external(self.queries.get_request(id, actor).await)
    }

    // --- Reads ---------------------------------------------------------------

    pub async fn list_friends(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<Listing<RelatedUser, UserId>, SocialError> {
        self.queries.list_friends(user, page).await
    }

    pub async fn list_followers(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<Listing<RelatedUser, UserId>, SocialError> {
        self.queries.list_followers(user, page).await
    }

    pub async fn list_following(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<Listing<RelatedUser, UserId>, SocialError> {
        self.queries.list_following(user, page).await
    }

    pub async fn list_incoming_requests(
        &self,
        user: &UserId,
        page: &Page<RequestId>,
    ) -> Result<Listing<FriendRequest, RequestId>, SocialError> {
        self.queries.list_incoming_requests(user, page).await
    }

    pub async fn list_outgoing_requests(
        &self,
        user: &UserId,
        page: &Page<RequestId>,
    ) -> Result<Listing<FriendRequest, RequestId>, SocialError> {
        self.queries.list_outgoing_requests(user, page).await
    }

    pub async fn get_stats(&self, user: &UserId) -> Result<SocialStats, SocialError> {
        self.queries.get_stats(user).await
    }

    pub async fn get_relationship(
        &self,
        actor: &UserId,
        other: &UserId,
    ) -> Result<Relationship, SocialError> {
        self.queries.get_relationship(actor, other).await
    }
}
