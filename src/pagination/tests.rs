//! Tests for pagination module

use super::*;
use crate::error::{Error, ErrorKind, Result};
use futures::{FutureExt, StreamExt};
use pretty_assertions::assert_eq;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_test::{assert_ready_eq, task};

// ============================================================================
// Scripted source
// ============================================================================

#[derive(Debug, Clone)]
enum Reply {
    Items(Vec<&'static str>),
    Transport,
    Decoding,
    NotFound,
    Cancelled,
    Panic,
}

/// Page source that answers from a per-page script and records every call
#[derive(Default)]
struct FakeSource {
    replies: Mutex<HashMap<u32, VecDeque<Reply>>>,
    requests: Mutex<Vec<u32>>,
    gate: Option<Arc<Semaphore>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeSource {
    fn new() -> Self {
        Self::default()
    }

    /// Every fetch waits for a permit on the returned semaphore
    fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn reply(self, page: u32, reply: Reply) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(page)
            .or_default()
            .push_back(reply);
        self
    }

    fn items(self, page: u32, items: &[&'static str]) -> Self {
        self.reply(page, Reply::Items(items.to_vec()))
    }

    fn requests(&self) -> Vec<u32> {
        self.requests.lock().unwrap().clone()
    }

    fn record(&self, page: u32) {
        self.requests.lock().unwrap().push(page);
    }

    async fn answer(&self, page: u32) -> Result<Vec<String>> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .get_mut(&page)
            .and_then(VecDeque::pop_front)
            .unwrap_or(Reply::Items(Vec::new()));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match reply {
            Reply::Items(items) => Ok(items.into_iter().map(String::from).collect()),
            Reply::Transport => Err(Error::Timeout { timeout_ms: 10 }),
            Reply::Decoding => Err(Error::decode("Vec<String>", "expected an array")),
            Reply::NotFound => Err(Error::http_status(404, "")),
            Reply::Cancelled => Err(Error::Cancelled),
            Reply::Panic => panic!("source blew up"),
        }
    }
}

fn builder_over(source: &Arc<FakeSource>) -> SinkBuilder<String> {
    let source = source.clone();
    PaginationSink::builder(move |page| {
        source.record(page);
        let source = source.clone();
        async move { source.answer(page).await }
    })
    .name("test")
}

fn sink_over(source: &Arc<FakeSource>) -> PaginationSink<String> {
    builder_over(source).build()
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

// ============================================================================
// Page / SinkState Tests
// ============================================================================

#[test]
fn test_page_len() {
    let page = Page::new(3, vec!["a", "b"]);
    assert_eq!(page.number, 3);
    assert_eq!(page.len(), 2);
    assert!(!page.is_empty());
    assert!(Page::<u8>::new(1, vec![]).is_empty());
}

#[test]
fn test_sink_state_initial() {
    let state = SinkState::<String>::initial();
    assert!(state.items.is_empty());
    assert_eq!(state.next_page, 1);
    assert!(!state.is_loading);
    assert!(!state.is_exhausted);
    assert!(state.last_error.is_none());
    assert!(state.can_load_more());
    assert_eq!(state, SinkState::default());
}

#[test]
fn test_fetch_failure_from_error() {
    let failure = FetchFailure::from(&Error::http_status(500, "boom"));
    assert_eq!(failure.kind, ErrorKind::Transport);
    assert_eq!(failure.message, "HTTP 500: boom");
    assert_eq!(failure.to_string(), "transport error: HTTP 500: boom");
}

#[test]
fn test_load_outcome_predicates() {
    assert!(LoadOutcome::Appended { page: 1, count: 2 }.is_applied());
    assert!(LoadOutcome::AlreadyLoading.is_skipped());
    assert!(LoadOutcome::AlreadyExhausted.is_skipped());
    assert!(!LoadOutcome::Discarded.is_applied());
    assert!(!LoadOutcome::Cancelled.is_skipped());
}

// ============================================================================
// Last-page Policy Tests
// ============================================================================

#[test]
fn test_empty_page_policy() {
    assert!(EmptyPage.is_last(&Page::<u8>::new(4, vec![])));
    assert!(!EmptyPage.is_last(&Page::new(4, vec![1u8])));
    assert!(!LastPage::<u8>::is_end_signal(
        &EmptyPage,
        &Error::http_status(404, "")
    ));
}

#[test]
fn test_short_page_policy() {
    let policy = ShortPage::new(3);
    assert!(!policy.is_last(&Page::new(1, vec![1, 2, 3])));
    assert!(policy.is_last(&Page::new(2, vec![1, 2])));
    assert!(policy.is_last(&Page::<u8>::new(2, vec![])));
}

#[test]
fn test_short_page_policy_with_zero_size_ends_on_empty_page() {
    let policy = ShortPage::new(0);
    assert!(!policy.is_last(&Page::new(1, vec![1])));
    assert!(policy.is_last(&Page::<u8>::new(2, vec![])));
}

#[test]
fn test_max_pages_policy() {
    let policy = MaxPages::new(2);
    assert!(!policy.is_last(&Page::new(1, vec![1])));
    assert!(policy.is_last(&Page::new(2, vec![1])));
    assert!(policy.is_last(&Page::<u8>::new(1, vec![])));
}

#[test]
fn test_end_on_not_found_policy() {
    let policy = EndOnNotFound::new(EmptyPage);
    assert!(LastPage::<u8>::is_end_signal(
        &policy,
        &Error::http_status(404, "")
    ));
    assert!(!LastPage::<u8>::is_end_signal(
        &policy,
        &Error::http_status(500, "")
    ));
    assert!(policy.is_last(&Page::<u8>::new(1, vec![])));
}

#[test]
fn test_closure_policy() {
    let policy = |page: &Page<u8>| page.items.contains(&0);
    assert!(policy.is_last(&Page::new(1, vec![3, 0])));
    assert!(!policy.is_last(&Page::new(1, vec![3])));
}

// ============================================================================
// Sink Tests
// ============================================================================

#[tokio::test]
async fn test_three_pages_then_exhausted() {
    let source = Arc::new(
        FakeSource::new()
            .items(1, &["A", "B", "C"])
            .items(2, &["D"])
            .items(3, &[]),
    );
    let sink = sink_over(&source);

    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Appended { page: 1, count: 3 }
    );
    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Appended { page: 2, count: 1 }
    );
    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Exhausted { page: 3, count: 0 }
    );

    let state = sink.current_state();
    assert_eq!(state.items, strings(&["A", "B", "C", "D"]));
    assert!(state.is_exhausted);
    assert!(!state.is_loading);
    assert_eq!(state.next_page, 3);

    let mut updates = sink.subscribe();
    assert_eq!(updates.next().await, Some(state.clone()));

    assert_eq!(sink.load_next().await, LoadOutcome::AlreadyExhausted);
    assert_eq!(sink.current_state(), state);
    assert!(updates.next().now_or_never().is_none());
    assert_eq!(source.requests(), vec![1, 2, 3]);
}

#[tokio::test]
async fn test_transport_failure_keeps_page_and_retries_it() {
    let source = Arc::new(
        FakeSource::new()
            .reply(1, Reply::Transport)
            .items(1, &["A", "B"]),
    );
    let sink = sink_over(&source);

    let failure = match sink.load_next().await {
        LoadOutcome::Failed(failure) => failure,
        other => panic!("Expected Failed, got {other:?}"),
    };
    assert_eq!(failure.kind, ErrorKind::Transport);

    let state = sink.current_state();
    assert!(!state.is_loading);
    assert_eq!(state.last_error, Some(failure));
    assert!(state.items.is_empty());
    assert_eq!(state.next_page, 1);

    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Appended { page: 1, count: 2 }
    );
    assert!(sink.current_state().last_error.is_none());
    assert_eq!(source.requests(), vec![1, 1]);
}

#[tokio::test]
async fn test_failure_after_success_preserves_items() {
    let source = Arc::new(
        FakeSource::new()
            .items(1, &["A"])
            .reply(2, Reply::Decoding)
            .items(2, &["B"]),
    );
    let sink = sink_over(&source);

    sink.load_next().await;
    let outcome = sink.load_next().await;
    assert!(matches!(outcome, LoadOutcome::Failed(ref f) if f.kind == ErrorKind::Decoding));

    let state = sink.current_state();
    assert_eq!(state.items, strings(&["A"]));
    assert_eq!(state.next_page, 2);

    sink.load_next().await;
    assert_eq!(sink.current_state().items, strings(&["A", "B"]));
    assert_eq!(source.requests(), vec![1, 2, 2]);
}

#[tokio::test]
async fn test_second_call_before_resolution_does_not_fetch() {
    let (source, gate) = FakeSource::new().items(1, &["A"]).gated();
    let source = Arc::new(source);
    let sink = sink_over(&source);

    let first = sink.load_next();
    let mut second = task::spawn(sink.load_next());
    assert_ready_eq!(second.poll(), LoadOutcome::AlreadyLoading);

    gate.add_permits(1);
    assert_eq!(first.await, LoadOutcome::Appended { page: 1, count: 1 });
    assert_eq!(source.requests(), vec![1]);
}

#[tokio::test]
async fn test_loading_snapshot_clears_last_error() {
    let (source, gate) = FakeSource::new()
        .reply(1, Reply::Transport)
        .items(1, &["A"])
        .gated();
    let source = Arc::new(source);
    let sink = sink_over(&source);

    gate.add_permits(1);
    sink.load_next().await;
    assert!(sink.current_state().last_error.is_some());

    let pending = sink.load_next();
    let state = sink.current_state();
    assert!(state.is_loading);
    assert!(state.last_error.is_none());
    assert!(!state.can_load_more());

    gate.add_permits(1);
    pending.await;
    assert!(!sink.current_state().is_loading);
}

#[tokio::test]
async fn test_reset_during_fetch_drops_the_page() {
    let (source, gate) = FakeSource::new()
        .items(1, &["A"])
        .items(2, &["B"])
        .gated();
    let source = Arc::new(source);
    let sink = sink_over(&source);

    gate.add_permits(1);
    sink.load_next().await;

    let page_two = sink.load_next();
    sink.reset();
    gate.add_permits(1);

    assert_eq!(page_two.await, LoadOutcome::Cancelled);
    for _ in 0..5 {
        tokio::task::yield_now().await;
    }

    assert_eq!(sink.current_state(), SinkState::initial());
    assert_eq!(source.requests(), vec![1, 2]);
}

#[tokio::test]
async fn test_reset_restores_initial_state_exactly() {
    let source = Arc::new(
        FakeSource::new()
            .items(1, &["A", "B"])
            .reply(2, Reply::Transport),
    );
    let sink = sink_over(&source);

    sink.load_next().await;
    sink.load_next().await;
    assert_ne!(sink.current_state(), SinkState::initial());

    sink.reset();
    assert_eq!(sink.current_state(), SinkState::initial());
}

#[tokio::test]
async fn test_reset_after_exhaustion_allows_loading_again() {
    let source = Arc::new(FakeSource::new().items(1, &[]).items(1, &["fresh"]));
    let sink = sink_over(&source);

    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Exhausted { page: 1, count: 0 }
    );
    sink.reset();

    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Appended { page: 1, count: 1 }
    );
    assert_eq!(source.requests(), vec![1, 1]);
}

#[tokio::test]
async fn test_not_found_ends_source_when_policy_says_so() {
    let source = Arc::new(
        FakeSource::new()
            .items(1, &["A"])
            .reply(2, Reply::NotFound),
    );
    let sink = builder_over(&source)
        .last_page(EndOnNotFound::new(EmptyPage))
        .build();

    sink.load_next().await;
    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Exhausted { page: 2, count: 0 }
    );

    let state = sink.current_state();
    assert!(state.is_exhausted);
    assert!(state.last_error.is_none());
    assert_eq!(state.items, strings(&["A"]));
}

#[tokio::test]
async fn test_not_found_is_a_failure_by_default() {
    let source = Arc::new(FakeSource::new().reply(1, Reply::NotFound));
    let sink = sink_over(&source);

    let outcome = sink.load_next().await;
    assert!(matches!(outcome, LoadOutcome::Failed(_)));
    assert!(!sink.current_state().is_exhausted);
}

#[tokio::test]
async fn test_short_last_page_is_appended() {
    let source = Arc::new(
        FakeSource::new()
            .items(1, &["A", "B"])
            .items(2, &["C"]),
    );
    let sink = builder_over(&source).last_page(ShortPage::new(2)).build();

    sink.load_next().await;
    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Exhausted { page: 2, count: 1 }
    );

    let state = sink.current_state();
    assert_eq!(state.items, strings(&["A", "B", "C"]));
    assert!(state.is_exhausted);
    assert_eq!(state.next_page, 2);
    assert_eq!(sink.load_next().await, LoadOutcome::AlreadyExhausted);
}

#[tokio::test]
async fn test_closure_policy_on_sink() {
    let source = Arc::new(FakeSource::new().items(1, &["A", "END"]));
    let sink = builder_over(&source)
        .last_page(|page: &Page<String>| page.items.iter().any(|item| item == "END"))
        .build();

    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Exhausted { page: 1, count: 2 }
    );
}

#[tokio::test]
async fn test_cancelled_fetch_is_swallowed() {
    let source = Arc::new(
        FakeSource::new()
            .reply(1, Reply::Cancelled)
            .items(1, &["A"]),
    );
    let sink = sink_over(&source);

    assert_eq!(sink.load_next().await, LoadOutcome::Cancelled);

    let state = sink.current_state();
    assert!(!state.is_loading);
    assert!(state.last_error.is_none());
    assert_eq!(state.next_page, 1);

    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Appended { page: 1, count: 1 }
    );
}

#[tokio::test]
async fn test_panicking_fetch_does_not_wedge_the_sink() {
    let source = Arc::new(FakeSource::new().reply(1, Reply::Panic).items(1, &["A"]));
    let sink = sink_over(&source);

    let outcome = sink.load_next().await;
    assert!(matches!(outcome, LoadOutcome::Failed(ref f) if f.kind == ErrorKind::Other));
    assert!(!sink.current_state().is_loading);

    assert_eq!(
        sink.load_next().await,
        LoadOutcome::Appended { page: 1, count: 1 }
    );
}

#[tokio::test]
async fn test_duplicates_across_pages_are_kept() {
    let source = Arc::new(FakeSource::new().items(1, &["A", "B"]).items(2, &["B", "A"]));
    let sink = sink_over(&source);

    sink.load_next().await;
    sink.load_next().await;
    assert_eq!(sink.current_state().items, strings(&["A", "B", "B", "A"]));
}

#[tokio::test]
async fn test_fetch_runs_without_awaiting() {
    let source = Arc::new(FakeSource::new().items(1, &["A"]));
    let sink = sink_over(&source);

    let mut updates = sink.subscribe();
    drop(sink.load_next());

    loop {
        let state = updates.next().await.unwrap();
        if !state.is_loading && !state.items.is_empty() {
            assert_eq!(state.items, strings(&["A"]));
            break;
        }
    }
}

#[tokio::test]
async fn test_drop_aborts_fetch_and_ends_stream() {
    let (source, _gate) = FakeSource::new().items(1, &["A"]).gated();
    let source = Arc::new(source);
    let sink = sink_over(&source);

    let mut updates = sink.subscribe();
    let pending = sink.load_next();
    drop(sink);

    assert_eq!(pending.await, LoadOutcome::Cancelled);

    let mut remaining = 0;
    while updates.next().await.is_some() {
        remaining += 1;
    }
    assert!(remaining <= 1);
}

// ============================================================================
// Subscription Tests
// ============================================================================

#[tokio::test]
async fn test_subscribe_yields_current_state_first() {
    let source = Arc::new(FakeSource::new().items(1, &["A"]));
    let sink = sink_over(&source);
    sink.load_next().await;

    let mut updates = sink.subscribe();
    let first = updates.next().await.unwrap();
    assert_eq!(first.items, strings(&["A"]));
}

#[tokio::test]
async fn test_subscribe_continues_across_reset() {
    let source = Arc::new(FakeSource::new().items(1, &["A"]).items(1, &["B"]));
    let sink = sink_over(&source);
    let mut updates = sink.subscribe();
    assert_eq!(updates.next().await, Some(SinkState::initial()));

    sink.load_next().await;
    assert_eq!(updates.next().await.unwrap().items, strings(&["A"]));

    sink.reset();
    assert_eq!(updates.next().await, Some(SinkState::initial()));

    sink.load_next().await;
    assert_eq!(updates.next().await.unwrap().items, strings(&["B"]));
}

#[tokio::test]
async fn test_independent_sinks_share_nothing() {
    let first_source = Arc::new(FakeSource::new().items(1, &["A"]));
    let second_source = Arc::new(FakeSource::new().items(1, &["X", "Y"]));
    let first = sink_over(&first_source);
    let second = sink_over(&second_source);

    let (a, b) = tokio::join!(first.load_next(), second.load_next());
    assert_eq!(a, LoadOutcome::Appended { page: 1, count: 1 });
    assert_eq!(b, LoadOutcome::Appended { page: 1, count: 2 });

    second.reset();
    assert_eq!(first.current_state().items, strings(&["A"]));
}

// ============================================================================
// Concurrency Tests
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_rapid_calls_keep_one_fetch_in_flight() {
    let source = Arc::new(
        FakeSource::new()
            .items(1, &["a1", "a2"])
            .items(2, &["b1"])
            .items(3, &["c1", "c2", "c3"])
            .items(4, &[])
            .with_delay(Duration::from_millis(5)),
    );
    let sink = Arc::new(sink_over(&source));

    let mut updates = sink.subscribe();
    let observer = tokio::spawn(async move {
        let mut lengths = Vec::new();
        while let Some(state) = updates.next().await {
            lengths.push(state.items.len());
            if state.is_exhausted {
                break;
            }
        }
        lengths
    });

    while !sink.current_state().is_exhausted {
        let mut handles = Vec::new();
        for _ in 0..8 {
            handles.push(tokio::spawn(sink.load_next()));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    let lengths = observer.await.unwrap();
    assert!(lengths.windows(2).all(|pair| pair[0] <= pair[1]));
    assert_eq!(lengths.last(), Some(&6));

    assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(source.requests(), vec![1, 2, 3, 4]);
    assert_eq!(
        sink.current_state().items,
        strings(&["a1", "a2", "b1", "c1", "c2", "c3"])
    );
}

// ============================================================================
// Observer Tests
// ============================================================================

#[tokio::test]
async fn test_observer_sees_transitions() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let recorded = events.clone();

    let source = Arc::new(
        FakeSource::new()
            .items(1, &["A"])
            .reply(2, Reply::Transport)
            .items(2, &[]),
    );
    let sink = builder_over(&source)
        .observer(move |name: &str, event: &SinkEvent| {
            assert_eq!(name, "test");
            recorded.lock().unwrap().push(event.clone());
        })
        .build();

    sink.load_next().await;
    sink.load_next().await;
    sink.load_next().await;
    sink.reset();

    let events = events.lock().unwrap().clone();
    assert_eq!(events.len(), 7);
    assert_eq!(
        events[0],
        SinkEvent::FetchStarted {
            page: 1,
            generation: 1
        }
    );
    assert_eq!(events[1], SinkEvent::PageAppended { page: 1, count: 1 });
    assert_eq!(
        events[2],
        SinkEvent::FetchStarted {
            page: 2,
            generation: 2
        }
    );
    assert!(matches!(
        events[3],
        SinkEvent::FetchFailed { page: 2, ref failure } if failure.kind == ErrorKind::Transport
    ));
    assert_eq!(
        events[4],
        SinkEvent::FetchStarted {
            page: 2,
            generation: 3
        }
    );
    assert_eq!(events[5], SinkEvent::Exhausted { page: 2 });
    assert_eq!(events[6], SinkEvent::Reset);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_fetch_started_precedes_completion_under_fast_fetches() {
    for _ in 0..1000 {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = events.clone();
        let sink = PaginationSink::builder(|page| async move { Ok(vec![page]) })
            .observer(move |_: &str, event: &SinkEvent| {
                recorded.lock().unwrap().push(event.clone());
            })
            .build();

        sink.load_next().await;

        let events = events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                SinkEvent::FetchStarted {
                    page: 1,
                    generation: 1
                },
                SinkEvent::PageAppended { page: 1, count: 1 },
            ]
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reset_event_never_precedes_a_stale_append() {
    for _ in 0..1000 {
        let events = Arc::new(Mutex::new(Vec::new()));
        let recorded = events.clone();
        let sink = PaginationSink::builder(|page| async move { Ok(vec![page]) })
            .observer(move |_: &str, event: &SinkEvent| {
                recorded.lock().unwrap().push(event.clone());
            })
            .build();

        let stale = sink.load_next();
        tokio::task::yield_now().await;
        sink.reset();
        stale.await;

        let events = events.lock().unwrap().clone();
        let reset_at = events
            .iter()
            .position(|event| *event == SinkEvent::Reset)
            .unwrap();

        // an append reported after the reset would contradict the empty state
        assert!(!events[reset_at..]
            .iter()
            .any(|event| matches!(event, SinkEvent::PageAppended { .. })));
        assert!(sink.current_state().items.is_empty());
    }
}
