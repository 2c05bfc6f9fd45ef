//! The social core: the friend-request state machine, the read-side query
//! service, and the facade the HTTP layer calls.
//!
//! Writes go through [`FriendRequestManager`] (friend requests, friendships)
//! or straight to the store (follow edges, which have no state). Reads go
//! through [`SocialQueryService`], which never writes.

pub mod error;
pub mod facade;
pub mod query;
pub mod requests;

pub use error::SocialError;
pub use facade::SocialFacade;
pub use query::{Listing, SocialQueryService};
pub use requests::FriendRequestManager;
