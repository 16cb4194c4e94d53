//! Page slicing and page metadata for ordered result sets.
//!
//! # Invariants
//! - Page numbers are 1-based; values below 1 are clamped to 1.
//! - Requesting a page past the end yields an empty slice, not an error.
//! - `total_items` counts the filtered sequence that was paginated.
//! - Input order is preserved inside the page.

use futures::{pin_mut, Stream, TryStreamExt};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::ops::RangeInclusive;

/// Page size used when no configuration overrides it.
pub const DEFAULT_PAGE_SIZE: u32 = 2;

pub type PaginationResult<T> = Result<T, PaginationError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaginationError {
    /// Page size must be a positive integer.
    InvalidPageSize(u32),
}

impl Display for PaginationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageSize(size) => {
                write!(f, "page size must be greater than zero, got {size}")
            }
        }
    }
}

impl Error for PaginationError {}

/// Derived metadata for one page of a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PaginationInfo {
    pub items_per_page: u32,
    pub current_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl PaginationInfo {
    /// Computes page metadata, clamping `current_page` to at least 1.
    pub fn new(items_per_page: u32, current_page: u32, total_items: u64) -> PaginationResult<Self> {
        if items_per_page == 0 {
            return Err(PaginationError::InvalidPageSize(items_per_page));
        }
        Ok(Self {
            items_per_page,
            current_page: current_page.max(1),
            total_items,
            total_pages: total_items.div_ceil(u64::from(items_per_page)),
        })
    }

    /// Index of the first item on the current page.
    pub fn offset(&self) -> u64 {
        u64::from(self.current_page.saturating_sub(1)) * u64::from(self.items_per_page)
    }

    /// Page numbers a page-link strip renders, `1..=total_pages`.
    ///
    /// Empty when there are no items.
    pub fn page_numbers(&self) -> RangeInclusive<u64> {
        1..=self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.current_page) < self.total_pages
    }
}

/// One page of items plus its metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub info: PaginationInfo,
}

/// Resolves an optional requested page number (defaults to 1, clamps 0 to 1).
pub fn normalize_page_number(page_number: Option<u32>) -> u32 {
    page_number.unwrap_or(1).max(1)
}

/// Slices an ordered sequence into the requested page.
pub fn paginate<T, I>(items: I, page_size: u32, page_number: u32) -> PaginationResult<Page<T>>
where
    I: IntoIterator<Item = T>,
{
    let mut window = PageWindow::new(page_size, page_number)?;
    for item in items {
        window.push(item);
    }
    window.finish()
}

/// Slices a fallible stream into the requested page, consuming it once.
///
/// The page size is validated before the stream is polled. The first stream
/// error aborts pagination and is returned unchanged.
pub async fn paginate_stream<S, T, E>(
    stream: S,
    page_size: u32,
    page_number: u32,
) -> Result<Page<T>, E>
where
    S: Stream<Item = Result<T, E>>,
    E: From<PaginationError>,
{
    let mut window = PageWindow::new(page_size, page_number)?;
    pin_mut!(stream);
    while let Some(item) = stream.try_next().await? {
        window.push(item);
    }
    Ok(window.finish()?)
}

/// Counts every item while keeping only those inside the page bounds.
struct PageWindow<T> {
    page_size: u32,
    page_number: u32,
    start: u64,
    end: u64,
    seen: u64,
    items: Vec<T>,
}

impl<T> PageWindow<T> {
    fn new(page_size: u32, page_number: u32) -> PaginationResult<Self> {
        let bounds = PaginationInfo::new(page_size, page_number, 0)?;
        let start = bounds.offset();
        Ok(Self {
            page_size,
            page_number: bounds.current_page,
            start,
            end: start + u64::from(page_size),
            seen: 0,
            items: Vec::new(),
        })
    }

    fn push(&mut self, item: T) {
        if (self.start..self.end).contains(&self.seen) {
            self.items.push(item);
        }
        self.seen += 1;
    }

    fn finish(self) -> PaginationResult<Page<T>> {
        Ok(Page {
            items: self.items,
            info: PaginationInfo::new(self.page_size, self.page_number, self.seen)?,
        })
    }
}
