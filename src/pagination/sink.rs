//! Incremental "load more" engine
//!
//! A [`PaginationSink`] owns the accumulated list for one logical list
//! (the show index, one search session) and serializes page loads:
//!
//! - at most one fetch is in flight per sink
//! - every accepted load and every reset bumps a generation counter, and a
//!   completion carrying an older generation is dropped without touching state
//! - every state change is published on a watch channel
//!
//! All mutations happen while holding the control lock, and the lock is never
//! held across an await point. Observer events are sent under the same lock,
//! so they arrive in the order the state changed. Fetches themselves run on
//! tokio tasks.

use super::strategies::EmptyPage;
use super::types::{
    FetchFailure, LastPage, LoadOutcome, Page, SinkEvent, SinkObserver, SinkState,
};
use crate::error::{Error, Result};
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, warn};

type FetchFn<T> = Box<dyn Fn(u32) -> BoxFuture<'static, Result<Vec<T>>> + Send + Sync>;

/// Generation counter and the handle of the fetch it belongs to
#[derive(Default)]
struct Control {
    generation: u64,
    in_flight: Option<AbortHandle>,
}

struct Shared<T> {
    name: String,
    fetch: FetchFn<T>,
    policy: Box<dyn LastPage<T>>,
    observer: Option<Arc<dyn SinkObserver>>,
    control: Mutex<Control>,
    state: watch::Sender<SinkState<T>>,
}

enum Started {
    Skipped(LoadOutcome),
    Running(JoinHandle<LoadOutcome>),
}

/// Incremental page loader for one list
///
/// Dropping the sink aborts any in-flight fetch and ends all subscriptions.
pub struct PaginationSink<T> {
    shared: Arc<Shared<T>>,
}

impl<T> PaginationSink<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Create a sink over `fetch` with the default [`EmptyPage`] policy
    pub fn new<F, Fut>(fetch: F) -> Self
    where
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        Self::builder(fetch).build()
    }

    /// Start building a sink over `fetch`
    ///
    /// `fetch` receives 1-based page numbers. It is called synchronously while
    /// the sink is locked, so it must only build the future and not call back
    /// into the sink.
    pub fn builder<F, Fut>(fetch: F) -> SinkBuilder<T>
    where
        F: Fn(u32) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>>> + Send + 'static,
    {
        SinkBuilder {
            name: "sink".to_string(),
            fetch: Box::new(move |page| fetch(page).boxed()),
            policy: Box::new(EmptyPage),
            observer: None,
        }
    }

    /// Name used in log lines and observer callbacks
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Request the next page
    ///
    /// The guard and the state change happen immediately, when this method is
    /// called: a second call made before the first fetch finishes returns
    /// [`LoadOutcome::AlreadyLoading`] without fetching. The fetch runs on a
    /// spawned task and is applied whether or not the returned future is
    /// awaited; awaiting it yields what happened.
    ///
    /// Must be called from within a tokio runtime.
    pub fn load_next(&self) -> impl Future<Output = LoadOutcome> + Send + 'static {
        let started = start(&self.shared);
        async move {
            match started {
                Started::Skipped(outcome) => outcome,
                Started::Running(handle) => handle.await.unwrap_or(LoadOutcome::Cancelled),
            }
        }
    }

    /// Abort any in-flight fetch and return to the initial state
    pub fn reset(&self) {
        let mut control = self.shared.lock_control();
        control.generation += 1;
        if let Some(handle) = control.in_flight.take() {
            handle.abort();
        }
        self.shared.state.send_replace(SinkState::initial());

        debug!("[{}] reset", self.shared.name);
        self.shared.notify(&SinkEvent::Reset);
    }

    /// Latest published snapshot
    pub fn current_state(&self) -> SinkState<T> {
        self.shared.state.borrow().clone()
    }

    /// Stream of snapshots, starting with the current one
    ///
    /// The stream keeps going across [`reset`](Self::reset) and ends when the
    /// sink is dropped. A subscriber that falls behind skips to the latest
    /// snapshot.
    pub fn subscribe(&self) -> BoxStream<'static, SinkState<T>> {
        let mut receiver = self.shared.state.subscribe();
        receiver.mark_changed();

        futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.changed().await.ok()?;
            let snapshot = receiver.borrow_and_update().clone();
            Some((snapshot, receiver))
        })
        .boxed()
    }
}

impl<T> std::fmt::Debug for PaginationSink<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.state.borrow();
        f.debug_struct("PaginationSink")
            .field("name", &self.shared.name)
            .field("items", &state.items.len())
            .field("next_page", &state.next_page)
            .field("is_loading", &state.is_loading)
            .field("is_exhausted", &state.is_exhausted)
            .finish_non_exhaustive()
    }
}

/// Builder for [`PaginationSink`]
pub struct SinkBuilder<T> {
    name: String,
    fetch: FetchFn<T>,
    policy: Box<dyn LastPage<T>>,
    observer: Option<Arc<dyn SinkObserver>>,
}

impl<T> SinkBuilder<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Set the name used in logs
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the last-page policy
    #[must_use]
    pub fn last_page(mut self, policy: impl LastPage<T> + 'static) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Set an observer for state transitions
    ///
    /// Events are delivered under the sink's lock, so the observer must not
    /// call back into the sink.
    #[must_use]
    pub fn observer(mut self, observer: impl SinkObserver + 'static) -> Self {
        self.observer = Some(Arc::new(observer));
        self
    }

    /// Build the sink
    pub fn build(self) -> PaginationSink<T> {
        let (state, _) = watch::channel(SinkState::initial());
        PaginationSink {
            shared: Arc::new(Shared {
                name: self.name,
                fetch: self.fetch,
                policy: self.policy,
                observer: self.observer,
                control: Mutex::new(Control::default()),
                state,
            }),
        }
    }
}

/// Accept or reject a load request and spawn the fetch
fn start<T>(shared: &Arc<Shared<T>>) -> Started
where
    T: Clone + Send + Sync + 'static,
{
    let handle = {
        let mut control = shared.lock_control();
        let (is_loading, is_exhausted, page) = {
            let state = shared.state.borrow();
            (state.is_loading, state.is_exhausted, state.next_page)
        };

        if is_loading {
            debug!("[{}] load_next ignored, page {page} in flight", shared.name);
            return Started::Skipped(LoadOutcome::AlreadyLoading);
        }
        if is_exhausted {
            debug!("[{}] load_next ignored, source exhausted", shared.name);
            return Started::Skipped(LoadOutcome::AlreadyExhausted);
        }

        control.generation += 1;
        let generation = control.generation;

        shared.state.send_modify(|state| {
            state.is_loading = true;
            state.last_error = None;
        });

        debug!("[{}] fetching page {page} (generation {generation})", shared.name);
        shared.notify(&SinkEvent::FetchStarted { page, generation });

        let fetch = (shared.fetch)(page);
        let weak = Arc::downgrade(shared);
        let handle = tokio::spawn(async move {
            let result = AssertUnwindSafe(fetch)
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(Error::other("page fetch panicked")));

            match weak.upgrade() {
                Some(shared) => shared.finish(generation, page, result),
                None => LoadOutcome::Cancelled,
            }
        });
        control.in_flight = Some(handle.abort_handle());

        handle
    };

    Started::Running(handle)
}

impl<T> Shared<T> {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, event: &SinkEvent) {
        if let Some(observer) = &self.observer {
            observer.on_event(&self.name, event);
        }
    }

    /// Apply a fetch result, unless it has been superseded
    fn finish(&self, generation: u64, page: u32, result: Result<Vec<T>>) -> LoadOutcome {
        let mut control = self.lock_control();
        let (outcome, event) = if control.generation != generation {
            (
                LoadOutcome::Discarded,
                SinkEvent::Discarded { page, generation },
            )
        } else {
            control.in_flight = None;
            self.apply(page, result)
        };

        match &outcome {
            LoadOutcome::Appended { count, .. } => {
                debug!("[{}] page {page} appended {count} items", self.name);
            }
            LoadOutcome::Exhausted { count, .. } => {
                debug!("[{}] page {page} was the last ({count} items)", self.name);
            }
            LoadOutcome::Failed(failure) => {
                warn!("[{}] page {page} failed: {failure}", self.name);
            }
            LoadOutcome::Cancelled => {
                debug!("[{}] page {page} cancelled", self.name);
            }
            LoadOutcome::Discarded => {
                debug!(
                    "[{}] discarded stale completion for page {page} (generation {generation})",
                    self.name
                );
            }
            LoadOutcome::AlreadyLoading | LoadOutcome::AlreadyExhausted => {}
        }

        self.notify(&event);
        outcome
    }

    /// Compute and publish the transition for a current completion
    ///
    /// Caller holds the control lock.
    fn apply(&self, page: u32, result: Result<Vec<T>>) -> (LoadOutcome, SinkEvent) {
        match result {
            Ok(items) => {
                let fetched = Page::new(page, items);
                let last = self.policy.is_last(&fetched);
                let count = fetched.len();

                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.items.extend(fetched.items);
                    if last {
                        state.is_exhausted = true;
                    } else {
                        state.next_page = state.next_page.saturating_add(1);
                    }
                });

                if last {
                    (
                        LoadOutcome::Exhausted { page, count },
                        SinkEvent::Exhausted { page },
                    )
                } else {
                    (
                        LoadOutcome::Appended { page, count },
                        SinkEvent::PageAppended { page, count },
                    )
                }
            }
            Err(error) if error.is_cancelled() => {
                self.state.send_modify(|state| state.is_loading = false);
                (LoadOutcome::Cancelled, SinkEvent::Cancelled { page })
            }
            Err(error) if self.policy.is_end_signal(&error) => {
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.is_exhausted = true;
                });
                (
                    LoadOutcome::Exhausted { page, count: 0 },
                    SinkEvent::Exhausted { page },
                )
            }
            Err(error) => {
                let failure = FetchFailure::from(&error);
                self.state.send_modify(|state| {
                    state.is_loading = false;
                    state.last_error = Some(failure.clone());
                });
                (
                    LoadOutcome::Failed(failure.clone()),
                    SinkEvent::FetchFailed { page, failure },
                )
            }
        }
    }
}

impl<T> Drop for Shared<T> {
    fn drop(&mut self) {
        let control = self
            .control
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = control.in_flight.take() {
            handle.abort();
        }
    }
}
