//! Offset pagination for the media listing
//!
//! Pagination is stateless: the client tracks its own offset and sends it
//! back with every request. Offsets only grow by the page size.

use serde::{Deserialize, Serialize};

use crate::error::ValidationErrors;
use crate::types::Id;

/// Default number of items per page when a widget has no explicit value
pub const DEFAULT_PAGE_SIZE: u32 = 5;

/// Largest page a single request may ask for unless configured otherwise
pub const MAX_PAGE_SIZE: u32 = 100;

/// One page request against a category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub category_id: Id,
    pub offset: u64,
    pub page_size: u32,
}

impl PageRequest {
    pub fn new(category_id: Id, offset: u64, page_size: u32) -> Result<Self, ValidationErrors> {
        if page_size == 0 {
            let mut errors = ValidationErrors::new();
            errors.add("maxitems", "must be greater than 0");
            return Err(errors);
        }
        Ok(Self {
            category_id,
            offset,
            page_size,
        })
    }

    /// First page for a category
    pub fn first(category_id: Id, page_size: u32) -> Self {
        Self {
            category_id,
            offset: 0,
            page_size: page_size.max(1),
        }
    }

    /// Parse raw request parameters.
    ///
    /// Returns `None` for anything that is not a usable request (missing or
    /// non-numeric values, negative offset, zero page size). The page size
    /// is clamped to `max_page_size`.
    pub fn parse(
        category: Option<&str>,
        offset: Option<&str>,
        page_size: Option<&str>,
        max_page_size: u32,
    ) -> Option<Self> {
        let category_id = category?.trim().parse::<Id>().ok()?;
        let offset = offset?.trim().parse::<u64>().ok()?;
        let page_size = page_size?.trim().parse::<u32>().ok()?;
        if page_size == 0 {
            return None;
        }
        Some(Self {
            category_id,
            offset,
            page_size: page_size.min(max_page_size.max(1)),
        })
    }

    /// The same request with its page size capped at `max_page_size`
    pub fn clamped(self, max_page_size: u32) -> Self {
        Self {
            page_size: self.page_size.min(max_page_size.max(1)),
            ..self
        }
    }

    /// Offset the client should send for the following page
    pub fn next_offset(&self) -> u64 {
        self.offset.saturating_add(u64::from(self.page_size))
    }

    /// Number of rows to ask the store for: one extra row tells us whether
    /// another page exists
    pub fn fetch_limit(&self) -> u32 {
        self.page_size.saturating_add(1)
    }
}

/// A fetched page of items
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub request: PageRequest,
    pub has_more: bool,
}

impl<T> Page<T> {
    /// Build a page from rows fetched with [`PageRequest::fetch_limit`]
    pub fn from_lookahead(mut rows: Vec<T>, request: PageRequest) -> Self {
        let has_more = rows.len() > request.page_size as usize;
        rows.truncate(request.page_size as usize);
        Self {
            items: rows,
            request,
            has_more,
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self {
            items: Vec::new(),
            request,
            has_more: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}
