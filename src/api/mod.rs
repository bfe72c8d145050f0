//! API client module
//!
//! The [`ApiClient`] trait is the contract the pagination layer depends on.
//! [`LiveApiClient`] implements it over HTTP; tests and previews can plug in
//! their own implementation.
//!
//! # Endpoints
//!
//! - `shows(page)` - `GET /shows?page=N`, echoes the requested page
//! - `search_shows(term)` - `GET /search/shows?q=TERM`
//! - `episodes(id)` - `GET /shows/{id}/episodes`

mod client;
mod sinks;

pub use client::{ApiClient, LiveApiClient};
pub use sinks::{search_sink, show_list_sink};
