//! The API contract and its live implementation

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::http::{HttpClient, Route};
use crate::types::{Episode, ShowId, ShowSearch, ShowsPage};
use async_trait::async_trait;
use tracing::debug;

/// Catalog operations the rest of the crate depends on
///
/// Each call resolves once with a decoded value or a classified error.
/// Dropping the returned future cancels the call; a cancelled call never
/// completes. Implementations must not retry: resubmitting is up to the
/// caller.
#[async_trait]
pub trait ApiClient: Send + Sync {
    /// Page `page` (1-based) of the show index
    async fn shows(&self, page: u32) -> Result<ShowsPage>;

    /// Shows matching a free-text term, best match first
    async fn search_shows(&self, term: &str) -> Result<Vec<ShowSearch>>;

    /// Every episode of a show, in airing order
    async fn episodes(&self, show: ShowId) -> Result<Vec<Episode>>;
}

/// [`ApiClient`] backed by the TVMaze HTTP API
#[derive(Debug, Clone)]
pub struct LiveApiClient {
    http: HttpClient,
    first_page_index: u32,
}

impl LiveApiClient {
    /// Create a client from configuration
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::with_config(config.http_config())?;
        Ok(Self::with_http(http).first_page_index(config.first_page_index))
    }

    /// Create a client over an existing HTTP client
    ///
    /// The API's first page index defaults to 0, as on TVMaze.
    pub fn with_http(http: HttpClient) -> Self {
        Self {
            http,
            first_page_index: 0,
        }
    }

    /// Set the index the API uses for its first page
    #[must_use]
    pub fn first_page_index(mut self, index: u32) -> Self {
        self.first_page_index = index;
        self
    }

    /// The underlying HTTP client
    pub fn http(&self) -> &HttpClient {
        &self.http
    }

    /// Map a 1-based page number onto the API's page index
    ///
    /// Page 0 and pages past the end of the index range are rejected.
    fn api_page(&self, page: u32) -> Result<u32> {
        page
            .checked_sub(1)
            .and_then(|offset| offset.checked_add(self.first_page_index))
            .ok_or(Error::InvalidPage { page })
    }
}

#[async_trait]
impl ApiClient for LiveApiClient {
    async fn shows(&self, page: u32) -> Result<ShowsPage> {
        let route = Route::shows(self.api_page(page)?);
        let shows = self.http.get_json(&route).await?;
        Ok(ShowsPage { page, shows })
    }

    async fn search_shows(&self, term: &str) -> Result<Vec<ShowSearch>> {
        let hits: Vec<ShowSearch> = self.http.get_json(&Route::search_shows(term)).await?;
        debug!("search '{term}' matched {} shows", hits.len());
        Ok(hits)
    }

    async fn episodes(&self, show: ShowId) -> Result<Vec<Episode>> {
        self.http.get_json(&Route::show_episodes(show)).await
    }
}
