//! Last-page policy implementations
//!
//! Each policy handles one way a source can signal that it has run out.

use super::types::{LastPage, Page};
use crate::error::Error;

// ============================================================================
// Empty Page
// ============================================================================

/// The last page is the first one that comes back empty
///
/// This is the default policy of a sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyPage;

impl<T> LastPage<T> for EmptyPage {
    fn is_last(&self, page: &Page<T>) -> bool {
        page.is_empty()
    }
}

// ============================================================================
// Short Page
// ============================================================================

/// The last page is the first one with fewer items than a full page
///
/// Saves the extra round trip an empty-page policy needs when the source
/// uses a fixed page size. An empty page always ends the source, even with
/// a page size of 0.
#[derive(Debug, Clone, Copy)]
pub struct ShortPage {
    /// Number of items in a full page
    pub page_size: usize,
}

impl ShortPage {
    /// Create a short page policy
    pub fn new(page_size: usize) -> Self {
        Self { page_size }
    }
}

impl<T> LastPage<T> for ShortPage {
    fn is_last(&self, page: &Page<T>) -> bool {
        page.is_empty() || page.len() < self.page_size
    }
}

// ============================================================================
// Max Pages
// ============================================================================

/// The source has a fixed number of pages
///
/// `MaxPages::new(1)` turns a non-paged endpoint such as search into a
/// single-page source.
#[derive(Debug, Clone, Copy)]
pub struct MaxPages {
    /// Number of the final page
    pub max_pages: u32,
}

impl MaxPages {
    /// Create a max pages policy
    pub fn new(max_pages: u32) -> Self {
        Self { max_pages }
    }
}

impl<T> LastPage<T> for MaxPages {
    fn is_last(&self, page: &Page<T>) -> bool {
        page.is_empty() || page.number >= self.max_pages
    }
}

// ============================================================================
// End On Not Found
// ============================================================================

/// Treats HTTP 404 as the end of the source, on top of another policy
///
/// TVMaze answers 404 for an index page past the end instead of returning
/// an empty array.
#[derive(Debug, Clone, Copy, Default)]
pub struct EndOnNotFound<P> {
    inner: P,
}

impl<P> EndOnNotFound<P> {
    /// Wrap another policy
    pub fn new(inner: P) -> Self {
        Self { inner }
    }
}

impl<T, P: LastPage<T>> LastPage<T> for EndOnNotFound<P> {
    fn is_last(&self, page: &Page<T>) -> bool {
        self.inner.is_last(page)
    }

    fn is_end_signal(&self, error: &Error) -> bool {
        error.status() == Some(404) || self.inner.is_end_signal(error)
    }
}
