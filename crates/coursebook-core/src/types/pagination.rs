//! Cursor pagination for list endpoints.
//!
//! A continuation token is an opaque URL-safe base64 string. It carries the
//! sort key of the last row served plus the snapshot instant taken when the
//! first page was produced, so rows inserted later never leak into pages
//! of a listing that is already in progress.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, ErrorKind};
use crate::result::AppResult;

/// Default page size.
pub const DEFAULT_PAGE_SIZE: u32 = 25;
/// Maximum page size.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Position inside an ordered listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Creation time of the last row served.
    #[serde(rename = "c")]
    pub created_at: DateTime<Utc>,
    /// Identifier of the last row served, breaking ties on `created_at`.
    #[serde(rename = "i")]
    pub id: Uuid,
    /// Snapshot bound: rows created after this instant are excluded.
    #[serde(rename = "s")]
    pub as_of: DateTime<Utc>,
}

impl Cursor {
    /// Encode the cursor as an opaque token.
    pub fn encode(&self) -> String {
        // Serializing three plain fields cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decode a token produced by [`Cursor::encode`].
    pub fn decode(token: &str) -> AppResult<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|e| malformed_token(e))?;
        serde_json::from_slice(&bytes).map_err(|e| malformed_token(e))
    }

    /// Whether a row with this sort key comes strictly after the cursor.
    pub fn is_before(&self, created_at: DateTime<Utc>, id: Uuid) -> bool {
        (created_at, id) > (self.created_at, self.id)
    }
}

fn malformed_token(source: impl std::error::Error + Send + Sync + 'static) -> AppError {
    AppError::with_source(ErrorKind::InvalidArgument, "malformed page token", source)
}

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Where to resume, if this is not the first page.
    pub after: Option<Cursor>,
    /// Snapshot bound shared by every page of one listing.
    pub as_of: DateTime<Utc>,
    /// Number of rows per page.
    pub page_size: u32,
}

impl PageRequest {
    /// Build a request from the raw token and size supplied by a caller.
    ///
    /// An empty token starts a new listing with a fresh snapshot. The page
    /// size is clamped to `[1, MAX_PAGE_SIZE]`.
    pub fn from_token(token: Option<&str>, page_size: Option<u32>) -> AppResult<Self> {
        let page_size = page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => {
                let cursor = Cursor::decode(raw)?;
                Ok(Self {
                    after: Some(cursor),
                    as_of: cursor.as_of,
                    page_size,
                })
            }
            None => Ok(Self {
                after: None,
                as_of: Utc::now(),
                page_size,
            }),
        }
    }

    /// First page of a listing with the default size.
    pub fn first() -> Self {
        Self {
            after: None,
            as_of: Utc::now(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Whether a row belongs to this page window (after the cursor and
    /// within the snapshot).
    pub fn admits(&self, created_at: DateTime<Utc>, id: Uuid) -> bool {
        created_at <= self.as_of && self.after.is_none_or(|c| c.is_before(created_at, id))
    }

    /// Number of rows a store should fetch: one extra to detect a next page.
    pub fn fetch_limit(&self) -> i64 {
        i64::from(self.page_size) + 1
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first()
    }
}

/// One page of results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    /// The items on this page.
    pub items: Vec<T>,
    /// Token for the next page; `None` when the listing is exhausted.
    pub next_page_token: Option<String>,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with [`PageRequest::fetch_limit`].
    ///
    /// `rows` must already be ordered by `(created_at, id)` ascending.
    pub fn from_rows<F>(mut rows: Vec<T>, request: &PageRequest, key: F) -> Self
    where
        F: Fn(&T) -> (DateTime<Utc>, Uuid),
    {
        let size = request.page_size as usize;
        let has_more = rows.len() > size;
        rows.truncate(size);
        let next_page_token = if has_more {
            rows.last().map(|last| {
                let (created_at, id) = key(last);
                Cursor {
                    created_at,
                    id,
                    as_of: request.as_of,
                }
                .encode()
            })
        } else {
            None
        };
        Self {
            items: rows,
            next_page_token,
        }
    }

    /// Transform each item, keeping the token.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page_token: self.next_page_token,
        }
    }
}
