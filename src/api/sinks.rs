//! Ready-made sinks over an [`ApiClient`]

use super::client::ApiClient;
use crate::error::Error;
use crate::pagination::{EmptyPage, EndOnNotFound, MaxPages, PaginationSink};
use crate::types::{Show, ShowSearch};
use std::sync::Arc;

/// Sink over the paged show index
///
/// The index ends at the first empty page or at the first 404, which is
/// what TVMaze returns past the last page. A response echoing a different
/// page than the one requested is rejected as a decoding error.
pub fn show_list_sink(client: Arc<dyn ApiClient>) -> PaginationSink<Show> {
    PaginationSink::builder(move |page| {
        let client = client.clone();
        async move {
            let result = client.shows(page).await?;
            if result.page != page {
                return Err(Error::PageMismatch {
                    requested: page,
                    received: result.page,
                });
            }
            Ok(result.shows)
        }
    })
    .name("shows")
    .last_page(EndOnNotFound::new(EmptyPage))
    .build()
}

/// Sink over one search session
///
/// Search is not paged, so the first page holds every hit and exhausts the
/// sink. A new term means a new sink.
pub fn search_sink(
    client: Arc<dyn ApiClient>,
    term: impl Into<String>,
) -> PaginationSink<ShowSearch> {
    let term: Arc<str> = Arc::from(term.into());
    let name = format!("search:{term}");

    PaginationSink::builder(move |_page| {
        let client = client.clone();
        let term = term.clone();
        async move { client.search_shows(&term).await }
    })
    .name(name)
    .last_page(MaxPages::new(1))
    .build()
}
