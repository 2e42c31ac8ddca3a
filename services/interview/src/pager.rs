//! Page requests and page metadata for the sorted listing.
//!
//! A [`PageRequest`] is handed to the record store as-is; the store owns sort
//! field validation and returns one slice plus the total element count, from
//! which [`Page`] derives the rest of the metadata.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Errors raised while building a page request
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PageRequestError {
    #[error("Page size must be at least 1")]
    ZeroPageSize,
}

/// Sort direction for the paginated listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// Parse a wire direction. `asc` in any case is ascending, anything else
    /// sorts descending.
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("asc") {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    /// SQL keyword for this direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Ascending => write!(f, "asc"),
            SortDirection::Descending => write!(f, "desc"),
        }
    }
}

/// A request for a single sorted page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page_number: u32,
    page_size: u32,
    sort_field: String,
    direction: SortDirection,
}

impl PageRequest {
    /// Build a page request. Page numbers are zero-based.
    pub fn new(
        page_number: u32,
        page_size: u32,
        sort_field: impl Into<String>,
        direction: SortDirection,
    ) -> Result<Self, PageRequestError> {
        if page_size == 0 {
            return Err(PageRequestError::ZeroPageSize);
        }

        Ok(Self {
            page_number,
            page_size,
            sort_field: sort_field.into(),
            direction,
        })
    }

    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn sort_field(&self) -> &str {
        &self.sort_field
    }

    pub fn direction(&self) -> SortDirection {
        self.direction
    }

    /// Number of records to skip before this page starts
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number) * u64::from(self.page_size)
    }
}

/// One page of results plus paging metadata
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub content: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_elements: u64,
    pub total_pages: u64,
    pub last_page: bool,
}

impl<T> Page<T> {
    /// Assemble a page from the slice a store returned for `request`
    pub fn new(request: &PageRequest, content: Vec<T>, total_elements: u64) -> Self {
        let total_pages = total_elements.div_ceil(u64::from(request.page_size));
        // Out-of-range pages report as last, matching the store's "no next page" view.
        let last_page = total_elements == 0 || u64::from(request.page_number) + 1 >= total_pages;

        Self {
            content,
            page_number: request.page_number,
            page_size: request.page_size,
            total_elements,
            total_pages,
            last_page,
        }
    }

    /// Convert the page content, keeping the metadata
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            content: self.content.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_elements: self.total_elements,
            total_pages: self.total_pages,
            last_page: self.last_page,
        }
    }
}
