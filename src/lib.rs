// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]

//! # TVMaze Catalog
//!
//! Client-side data access for the paged TVMaze REST catalog.
//!
//! ## Features
//!
//! - **Typed API client**: shows, search and episodes behind the [`ApiClient`] trait
//! - **Pagination sink**: observable, append-only accumulation of pages
//!   with single-flight loads, reset and stale-result rejection
//! - **Rate limiting**: client-side throttling inside the public quota
//! - **CLI**: `tvmaze shows | search | episodes` emitting JSON lines
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use futures::StreamExt;
//! use tvmaze_catalog::{show_list_sink, ClientConfig, LiveApiClient, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = Arc::new(LiveApiClient::new(&ClientConfig::default())?);
//!     let sink = show_list_sink(client);
//!
//!     // Render every snapshot
//!     let mut states = sink.subscribe();
//!     tokio::spawn(async move {
//!         while let Some(state) = states.next().await {
//!             println!("{} shows, loading={}", state.items.len(), state.is_loading);
//!         }
//!     });
//!
//!     // Scrolled to the bottom
//!     sink.load_next().await;
//!     sink.load_next().await;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Consumer (UI, CLI, tests)                   │
//! │   load_next()    reset()    current_state()    subscribe()  │
//! └─────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┴───────────────────────────────┐
//! │                      PaginationSink<T>                      │
//! │  single-flight  │  generation token  │  last-page policy     │
//! └─────────────────────────────────────────────────────────────┘
//!                               │ fetch(page)
//! ┌─────────────────────────────┴───────────────────────────────┐
//! │            ApiClient  (LiveApiClient or a fake)             │
//! ├──────────────┬───────────────┬──────────────────────────────┤
//! │    Route     │  Rate Limit   │  Status / Decode classify    │
//! └──────────────┴───────────────┴──────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types for the crate
pub mod error;

/// Catalog models and identifiers
pub mod types;

/// HTTP client with rate limiting
pub mod http;

/// Observable page accumulation
pub mod pagination;

/// API contract, live client and ready-made sinks
pub mod api;

/// Client configuration
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

// Re-export commonly used types
pub use api::{search_sink, show_list_sink, ApiClient, LiveApiClient};
pub use config::ClientConfig;
pub use pagination::{LoadOutcome, PaginationSink, SinkState};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
