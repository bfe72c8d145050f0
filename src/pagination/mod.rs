//! Pagination module
//!
//! Incremental "load more" loading for list screens.
//!
//! # Overview
//!
//! A [`PaginationSink`] wraps a page-fetch function and accumulates its pages
//! into one list. The UI calls [`PaginationSink::load_next`] as the user
//! scrolls, observes [`SinkState`] snapshots through
//! [`PaginationSink::subscribe`], and calls [`PaginationSink::reset`] on
//! refresh or when the search term changes.
//!
//! When a source has run out is decided by a [`LastPage`] policy:
//! empty page (default), short page, fixed page count, HTTP 404, or any
//! closure over the fetched [`Page`].

mod sink;
mod strategies;
mod types;

pub use sink::{PaginationSink, SinkBuilder};
pub use strategies::{EmptyPage, EndOnNotFound, MaxPages, ShortPage};
pub use types::{
    FetchFailure, LastPage, LoadOutcome, Page, SinkEvent, SinkObserver, SinkState,
};

#[cfg(test)]
mod tests;
