//! Social Query Service: the read side.
//!
//! Lists are newest first with keyset cursors, so rows inserted while a
//! client pages through a list never shift later pages. Counters are read
//! independently; a [`SocialStats`] is a snapshot, not a consistent cut.

use std::sync::Arc;

use tracing::debug;

use crate::model::{
    Cursor, FriendPair, FriendRequest, Page, RelatedUser, Relationship, RequestDirection,
    RequestId, SocialStats, UserId,
};
use crate::storage::Storage;

use super::SocialError;

/// One page of a list plus the position to continue from.
#[derive(Debug, Clone)]
pub struct Listing<T, K> {
    pub items: Vec<T>,
    /// Cursor after the last item; `None` on the final page.
    pub next: Option<Cursor<K>>,
    /// Size of the whole list, not just this page.
    pub total: u64,
}

impl<T, K> Listing<T, K> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

#[derive(Clone)]
pub struct SocialQueryService {
    store: Arc<dyn Storage>,
}

impl SocialQueryService {
    pub fn new(store: Arc<dyn Storage>) -> Self {
        Self { store }
    }

    pub async fn list_friends(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<Listing<RelatedUser, UserId>, SocialError> {
        let (rows, has_more) = self.store.list_friends(user, page).await?;
        let total = self.store.count_friends(user).await?;
        debug!("query: {} friend(s) of {user}", rows.len());
        Ok(related_listing(rows, has_more, total))
    }

    pub async fn list_followers(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<Listing<RelatedUser, UserId>, SocialError> {
        let (rows, has_more) = self.store.list_followers(user, page).await?;
        let total = self.store.count_followers(user).await?;
        debug!("query: {} follower(s) of {user}", rows.len());
        Ok(related_listing(rows, has_more, total))
    }

    pub async fn list_following(
        &self,
        user: &UserId,
        page: &Page<UserId>,
    ) -> Result<Listing<RelatedUser, UserId>, SocialError> {
        let (rows, has_more) = self.store.list_following(user, page).await?;
        let total = self.store.count_following(user).await?;
        debug!("query: {user} follows {} user(s) on this page", rows.len());
        Ok(related_listing(rows, has_more, total))
    }

    /// Pending requests `user` has received.
    pub async fn list_incoming_requests(
        &self,
        user: &UserId,
        page: &Page<RequestId>,
    ) -> Result<Listing<FriendRequest, RequestId>, SocialError> {
        self.list_pending(user, RequestDirection::Incoming, page).await
    }

    /// Pending requests `user` has sent.
    pub async fn list_outgoing_requests(
        &self,
        user: &UserId,
        page: &Page<RequestId>,
    ) -> Result<Listing<FriendRequest, RequestId>, SocialError> {
        self.list_pending(user, RequestDirection::Outgoing, page).await
    }

    async fn list_pending(
        &self,
        user: &UserId,
        direction: RequestDirection,
        page: &Page<RequestId>,
    ) -> Result<Listing<FriendRequest, RequestId>, SocialError> {
        let (items, has_more) = self.store.list_pending(user, direction, page).await?;
        let total = self.store.count_pending(user, direction).await?;
        let next = if has_more {
            items.last().map(|r| Cursor::new(r.created_at, r.id))
        } else {
            None
        };
        Ok(Listing { items, next, total })
    }

    pub async fn get_stats(&self, user: &UserId) -> Result<SocialStats, SocialError> {
        let (friends, followers, following, pending_incoming, pending_outgoing) = tokio::try_join!(
            self.store.count_friends(user),
            self.store.count_followers(user),
            self.store.count_following(user),
            self.store.count_pending(user, RequestDirection::Incoming),
            self.store.count_pending(user, RequestDirection::Outgoing),
        )?;
        Ok(SocialStats {
            friends,
            followers,
            following,
            pending_incoming,
            pending_outgoing,
        })
    }

    /// How `other` relates to `actor`. Directions are from `actor`'s side:
    /// a request `actor` sent is `Outgoing`.
    pub async fn get_relationship(
        &self,
        actor: &UserId,
        other: &UserId,
    ) -> Result<Relationship, SocialError> {
        let pair = FriendPair::new(actor, other)?;
        let (is_friend, is_following, is_followed_by, pending) = tokio::try_join!(
            self.store.has_friendship(&pair),
            self.store.has_follow(actor, other),
            self.store.has_follow(other, actor),
            self.store.pending_between(&pair),
        )?;
        let pending = pending.map(|r| {
            let direction = if &r.sender_id == actor {
                RequestDirection::Outgoing
            } else {
                RequestDirection::Incoming
            };
            (r.id, direction)
        });
        Ok(Relationship {
            is_friend,
            is_following,
            is_followed_by,
            pending,
        })
    }

    /// A single request, visible to its sender and receiver only.
    pub async fn get_request(
        &self,
        id: RequestId,
        actor: &UserId,
    ) -> Result<FriendRequest, SocialError> {
        let request = self
            .store
            .get_request(id)
            .await?
            .ok_or(SocialError::RequestNotFound)?;
        if !request.involves(actor) {
            return Err(SocialError::NotRequestReceiver);
        }
        Ok(request)
    }
}

fn related_listing(
    items: Vec<RelatedUser>,
    has_more: bool,
    total: u64,
) -> Listing<RelatedUser, UserId> {
    let next = if has_more {
        items
            .last()
            .map(|r| Cursor::new(r.since, r.user_id.clone()))
    } else {
        None
    };
    Listing { items, next, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::social::FriendRequestManager;
    use crate::storage::memory::MemoryStorage;
    use crate::storage::sqlite::SqliteStorage;

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    fn backends() -> Vec<Arc<dyn Storage>> {
        vec![
            Arc::new(MemoryStorage::new()),
            Arc::new(SqliteStorage::open_in_memory().unwrap()),
        ]
    }

    #[tokio::test]
    async fn follow_lists_and_stats() {
        for store in backends() {
            let q = SocialQueryService::new(Arc::clone(&store));
            let (a, b) = (uid("alice"), uid("bob"));
            store.add_follow(&a, &b).await.unwrap();

            let following = q.list_following(&a, &Page::first(1)).await.unwrap();
            assert_eq!(following.items[0].user_id, b);
            assert_eq!(following.total, 1);
            assert!(!following.has_more());

            let followers = q.list_followers(&b, &Page::first(1)).await.unwrap();
            assert_eq!(followers.items[0].user_id, a);

            let stats = q.get_stats(&a).await.unwrap();
            assert_eq!(stats.following, 1);
            assert_eq!(stats.followers, 0);

            store.remove_follow(&a, &b).await.unwrap();
            assert!(q.list_following(&a, &Page::first(10)).await.unwrap().items.is_empty());
            assert!(q.list_followers(&b, &Page::first(10)).await.unwrap().items.is_empty());
        }
    }

    #[tokio::test]
    async fn pages_chain_through_cursor() {
        for store in backends() {
            let q = SocialQueryService::new(Arc::clone(&store));
            let star = uid("star");
            for i in 0..5 {
                store.add_follow(&uid(&format!("fan{i}")), &star).await.unwrap();
            }

            let mut seen = Vec::new();
            let mut page = Page::first(2);
            loop {
                let listing = q.list_followers(&star, &page).await.unwrap();
                assert_eq!(listing.total, 5);
                seen.extend(listing.items.iter().map(|r| r.user_id.clone()));
                match listing.next {
                    Some(cursor) => page = Page { after: Some(cursor), limit: 2 },
                    None => break,
                }
            }
            seen.sort();
            seen.dedup();
            assert_eq!(seen.len(), 5);
        }
    }

    #[tokio::test]
    async fn request_views() {
        for store in backends() {
            let m = FriendRequestManager::new(Arc::clone(&store));
            let q = SocialQueryService::new(Arc::clone(&store));
            let (a, b, c) = (uid("alice"), uid("bob"), uid("carol"));
            let id = m.send_request(&a, &b).await.unwrap();

            let incoming = q.list_incoming_requests(&b, &Page::first(10)).await.unwrap();
            assert_eq!(incoming.items.len(), 1);
            assert_eq!(incoming.items[0].id, id);
            let outgoing = q.list_outgoing_requests(&a, &Page::first(10)).await.unwrap();
            assert_eq!(outgoing.total, 1);
            assert!(q.list_incoming_requests(&a, &Page::first(10)).await.unwrap().items.is_empty());

            let from_a = q.get_relationship(&a, &b).await.unwrap();
            assert_eq!(from_a.pending, Some((id, RequestDirection::Outgoing)));
            let from_b = q.get_relationship(&b, &a).await.unwrap();
            assert_eq!(from_b.pending, Some((id, RequestDirection::Incoming)));
            assert!(!from_b.is_friend);

            assert_eq!(q.get_request(id, &b).await.unwrap().sender_id, a);
            assert!(matches!(
                q.get_request(id, &c).await,
                Err(SocialError::NotRequestReceiver)
            ));
            assert!(matches!(
                q.get_request(id + 1, &a).await,
                Err(SocialError::RequestNotFound)
            ));

            m.accept_request(id, &b).await.unwrap();
            let stats = q.get_stats(&b).await.unwrap();
            assert_eq!(stats.friends, 1);
            assert_eq!(stats.pending_incoming, 0);
            let rel = q.get_relationship(&a, &b).await.unwrap();
            assert!(rel.is_friend);
            assert_eq!(rel.pending, None);
            let friends = q.list_friends(&a, &Page::first(10)).await.unwrap();
            assert_eq!(friends.items[0].user_id, b);
        }
    }

    #[tokio::test]
    async fn relationship_with_self_rejected() {
        let q = SocialQueryService::new(Arc::new(MemoryStorage::new()));
        assert!(matches!(
            q.get_relationship(&uid("alice"), &uid("alice")).await,
            Err(SocialError::InvalidSelfReference)
        ));
    }
}
