//! Request and response types for the social-graph API.
//!
//! This crate is the machine-readable contract between the node and its
//! clients. It carries no behaviour beyond small constructors; everything that
//! touches storage lives in `socialgraph-node`.
//!
//! # Endpoints covered
//!
//! All paths are relative to `/api/v1/social`.
//!
//! | Method | Path | Type |
//! |--------|------|------|
//! | POST | `/follow` | [`FollowBody`] → `204` |
//! | DELETE | `/follow/{id}` | → `204` |
//! | GET | `/followers/{id}` | [`ListQuery`] → [`ListResponse<FollowEntry>`] |
//! | GET | `/following/{id}` | [`ListQuery`] → [`ListResponse<FollowEntry>`] |
//! | GET | `/friends/{id}` | [`ListQuery`] → [`ListResponse<FriendEntry>`] |
//! | DELETE | `/friends/{id}` | → `204` |
//! | GET | `/stats/{id}` | → [`StatsResponse`] |
//! | GET | `/relationship/{id}` | → [`RelationshipView`] |
//! | POST | `/requests` | [`SendRequestBody`] → [`SendRequestResponse`] |
//! | GET | `/requests/incoming` | [`ListQuery`] → [`ListResponse<FriendRequestView>`] |
//! | GET | `/requests/outgoing` | [`ListQuery`] → [`ListResponse<FriendRequestView>`] |
//! | GET | `/requests/{id}` | → [`FriendRequestView`] |
//! | POST | `/requests/{id}/accept` | → `204` |
//! | POST | `/requests/{id}/decline` | → `204` |
//! | DELETE | `/requests/{id}` | → `204` |

pub mod error;
pub mod follow;
pub mod friend;
pub mod page;
pub mod stats;

pub use error::ErrorResponse;
pub use follow::{FollowBody, FollowEntry};
pub use friend::{
    FriendEntry, FriendRequestView, PendingRequestRef, RelationshipView, RequestDirection,
    RequestStatus, SendRequestBody, SendRequestResponse,
};
pub use page::{ListQuery, ListResponse};
pub use stats::StatsResponse;
