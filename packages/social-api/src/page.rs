//! Keyset pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

/// Largest page a client may ask for.
pub const MAX_LIMIT: u32 = 100;

/// Query parameters accepted by list endpoints.
///
/// `after` is the opaque `next_cursor` of the previous page. Lists are ordered
/// newest first, so concurrent inserts land ahead of the cursor and never shift
/// rows between pages.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListQuery {
    pub after: Option<String>,
    pub limit: Option<u32>,
}

impl ListQuery {
    /// Effective limit, clamped to `[1, MAX_LIMIT]`. Returns `default` if not specified.
    pub fn effective_limit(&self, default: u32) -> u32 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }
}

/// One page of a list.
///
/// ```json
/// { "items": [ ... ], "next_cursor": "1767225600000000_42", "has_more": true, "total": 57 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListResponse<T> {
    pub items: Vec<T>,

    /// Pass as `?after=` to fetch the next page. Absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,

    pub has_more: bool,

    /// Size of the whole list at the time of the count query. Counted
    /// separately from the page, so it can lag a concurrent write.
    pub total: u64,
}
