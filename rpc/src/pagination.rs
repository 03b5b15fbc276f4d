//! Cursor-based pagination for the idea listing.

use serde::{Deserialize, Serialize};

/// Default page size when `count` is not specified.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Maximum allowed page size.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Pagination parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaginationParams {
    /// Opaque cursor from a previous response (hex-encoded offset).
    pub cursor: Option<String>,
    /// Number of items per page (default 100, max 1000).
    pub count: Option<u32>,
}

impl PaginationParams {
    /// Resolve effective page size, clamped to [1, MAX_PAGE_SIZE].
    pub fn effective_count(&self) -> u32 {
        self.count
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Decode the cursor to a numeric offset. An absent cursor is offset 0; a
    /// malformed one is `None`.
    pub fn decode_offset(&self) -> Option<u64> {
        match self.cursor.as_deref() {
            None | Some("") => Some(0),
            Some(cursor) => decode_cursor(cursor),
        }
    }
}

/// Pagination metadata included in list responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    /// Cursor to pass for the next page, or `None` if this is the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
}

/// Encode a numeric offset into an opaque cursor string.
pub fn encode_cursor(offset: u64) -> String {
    hex::encode(offset.to_be_bytes())
}

/// Decode a cursor string back to a numeric offset.
pub fn decode_cursor(cursor: &str) -> Option<u64> {
    let bytes: [u8; 8] = hex::decode(cursor).ok()?.try_into().ok()?;
    Some(u64::from_be_bytes(bytes))
}

/// Compute the next-page cursor given the current offset and the number of
/// items returned. Returns `None` once the listing is exhausted.
pub fn next_cursor(current_offset: u64, returned: usize, total: usize) -> Option<String> {
    let next = current_offset + returned as u64;
    if returned == 0 || next >= total as u64 {
        None
    } else {
        Some(encode_cursor(next))
    }
}
