//! Request descriptors for the catalog endpoints
//!
//! A [`Route`] is plain data: method, path and query items. Turning it into
//! a URL is a pure function of the route and a base URL.

use crate::error::{Error, Result};
use crate::types::{Method, ShowId};
use url::Url;

/// A request descriptor relative to the API base URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Path relative to the base URL, e.g. `/shows`
    pub path: String,
    /// HTTP method
    pub method: Method,
    /// Query items, appended in order after any query on the base URL
    pub query: Vec<(String, String)>,
}

impl Route {
    /// Create a GET route with no query
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: Method::GET,
            query: Vec::new(),
        }
    }

    /// Add a query item
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Page of the show index. `page` is the API's own page index.
    pub fn shows(page: u32) -> Self {
        Self::get("/shows").query("page", page.to_string())
    }

    /// Full-text show search
    pub fn search_shows(term: &str) -> Self {
        Self::get("/search/shows").query("q", term)
    }

    /// All episodes of a show
    pub fn show_episodes(id: ShowId) -> Self {
        Self::get(format!("/shows/{id}/episodes"))
    }

    /// Resolve this route against a base URL
    ///
    /// The path is appended to the base path, so a base of
    /// `https://example.com/api/` yields `https://example.com/api/shows`.
    pub fn url(&self, base: &Url) -> Result<Url> {
        if base.cannot_be_a_base() {
            return Err(Error::invalid_value(
                "base_url",
                format!("'{base}' cannot be used as a base URL"),
            ));
        }

        let mut url = base.clone();
        {
            let base_path = base.path().trim_end_matches('/');
            let path = self.path.trim_start_matches('/');
            url.set_path(&format!("{base_path}/{path}"));
        }

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}
