//! Pagination types and traits
//!
//! Defines the state snapshot published by a sink, the outcome of a load
//! request, and the seams a caller plugs into: the last-page policy and the
//! observer hook.

use crate::error::{Error, ErrorKind};
use serde::Serialize;

/// One fetch's worth of items plus the 1-based page number that produced it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// 1-based page number
    pub number: u32,
    /// Items in the order the source returned them
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Create a page
    pub fn new(number: u32, items: Vec<T>) -> Self {
        Self { number, items }
    }

    /// Number of items on the page
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the page has no items
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A failed fetch as recorded in [`SinkState::last_error`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FetchFailure {
    /// Classification the UI branches on
    pub kind: ErrorKind,
    /// Human readable description
    pub message: String,
}

impl From<&Error> for FetchFailure {
    fn from(error: &Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} error: {}", self.kind, self.message)
    }
}

/// Immutable snapshot of a sink's accumulated state
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SinkState<T> {
    /// Every item received so far, in page order
    pub items: Vec<T>,
    /// Page number the next `load_next` will request
    pub next_page: u32,
    /// A fetch is in flight
    pub is_loading: bool,
    /// The source has no further pages
    pub is_exhausted: bool,
    /// Failure of the most recent fetch, cleared when the next one starts
    pub last_error: Option<FetchFailure>,
}

impl<T> SinkState<T> {
    /// The state of a freshly constructed or reset sink
    pub fn initial() -> Self {
        Self {
            items: Vec::new(),
            next_page: 1,
            is_loading: false,
            is_exhausted: false,
            last_error: None,
        }
    }

    /// Check if a `load_next` call would start a fetch
    pub fn can_load_more(&self) -> bool {
        !self.is_loading && !self.is_exhausted
    }
}

impl<T> Default for SinkState<T> {
    fn default() -> Self {
        Self::initial()
    }
}

/// What a `load_next` call ended up doing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was appended and more pages may follow
    Appended {
        /// Page number that was fetched
        page: u32,
        /// Items appended
        count: usize,
    },
    /// The fetched page was the last one; its items (if any) were appended
    Exhausted {
        /// Page number that was fetched
        page: u32,
        /// Items appended
        count: usize,
    },
    /// The fetch failed and was recorded in `last_error`
    Failed(FetchFailure),
    /// No fetch was started because one is already in flight
    AlreadyLoading,
    /// No fetch was started because the source is exhausted
    AlreadyExhausted,
    /// The fetch was aborted by a reset or teardown
    Cancelled,
    /// The fetch completed after being superseded and was ignored
    Discarded,
}

impl LoadOutcome {
    /// Check if this call started a fetch whose result was applied
    pub fn is_applied(&self) -> bool {
        matches!(
            self,
            Self::Appended { .. } | Self::Exhausted { .. } | Self::Failed(_)
        )
    }

    /// Check if this call was a no-op
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::AlreadyLoading | Self::AlreadyExhausted)
    }
}

/// Transitions reported to a [`SinkObserver`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    /// A fetch for `page` was started with the given generation
    FetchStarted { page: u32, generation: u64 },
    /// A page was appended
    PageAppended { page: u32, count: usize },
    /// The source was found to be exhausted at `page`
    Exhausted { page: u32 },
    /// The fetch for `page` failed
    FetchFailed { page: u32, failure: FetchFailure },
    /// The fetch for `page` reported cancellation
    Cancelled { page: u32 },
    /// A superseded completion for `page` was dropped
    Discarded { page: u32, generation: u64 },
    /// The sink was reset
    Reset,
}

/// Hook for watching sink transitions, e.g. for debug logging or metrics
pub trait SinkObserver: Send + Sync {
    /// Called for each transition, in the order the state changed
    ///
    /// Runs while the sink is locked. Reading snapshots is fine, but calling
    /// `load_next` or `reset` on the same sink from here deadlocks.
    fn on_event(&self, sink: &str, event: &SinkEvent);
}

impl<F> SinkObserver for F
where
    F: Fn(&str, &SinkEvent) + Send + Sync,
{
    fn on_event(&self, sink: &str, event: &SinkEvent) {
        self(sink, event);
    }
}

/// Decides when a source has no more pages
///
/// Different APIs signal the end differently: an empty array, a short page,
/// an explicit flag, or an error status. The sink asks the policy after each
/// fetch instead of assuming one convention.
pub trait LastPage<T>: Send + Sync {
    /// Check if `page` is the last one
    fn is_last(&self, page: &Page<T>) -> bool;

    /// Check if a failed fetch actually means "no more pages"
    fn is_end_signal(&self, _error: &Error) -> bool {
        false
    }
}

impl<T, F> LastPage<T> for F
where
    F: Fn(&Page<T>) -> bool + Send + Sync,
{
    fn is_last(&self, page: &Page<T>) -> bool {
        self(page)
    }
}
