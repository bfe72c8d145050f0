//! Catalog types shared across the crate
//!
//! Decoded shapes of the TVMaze JSON payloads. Unknown fields are ignored
//! and most fields are optional, since the catalog is sparse for older shows.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of a show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShowId(pub u64);

impl std::fmt::Display for ShowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ShowId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Identifier of an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EpisodeId(pub u64);

impl std::fmt::Display for EpisodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// HTTP Types
// ============================================================================

/// HTTP method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => reqwest::Method::GET,
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::GET => f.write_str("GET"),
        }
    }
}

// ============================================================================
// Shared Pieces
// ============================================================================

/// Poster or still image at two resolutions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Image {
    /// Medium-size image URL
    pub medium: Option<String>,
    /// Original-size image URL
    pub original: Option<String>,
}

impl Image {
    /// Best available URL, preferring the medium size for list cells
    pub fn preferred(&self) -> Option<&str> {
        self.medium.as_deref().or(self.original.as_deref())
    }
}

/// Average audience rating
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
    pub average: Option<f64>,
}

// ============================================================================
// Shows
// ============================================================================

/// A show from the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: ShowId,
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    /// Show type, e.g. "Scripted" or "Reality"
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub genres: Vec<String>,
    /// Running status, e.g. "Running" or "Ended"
    #[serde(default)]
    pub status: Option<String>,
    /// Episode runtime in minutes
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub premiered: Option<NaiveDate>,
    #[serde(rename = "officialSite", default)]
    pub official_site: Option<String>,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub image: Option<Image>,
    /// HTML summary
    #[serde(default)]
    pub summary: Option<String>,
}

impl Show {
    /// Poster URL to display in a list, if any
    pub fn poster_url(&self) -> Option<&str> {
        self.image.as_ref().and_then(Image::preferred)
    }
}

/// One hit of a show search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShowSearch {
    /// Relevance score assigned by the API
    pub score: f64,
    pub show: Show,
}

/// One page of the show index, echoing the page number that was requested
#[derive(Debug, Clone, PartialEq)]
pub struct ShowsPage {
    /// 1-based page number
    pub page: u32,
    pub shows: Vec<Show>,
}

// ============================================================================
// Episodes
// ============================================================================

/// An episode of a show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub id: EpisodeId,
    pub name: String,
    #[serde(default)]
    pub season: Option<u32>,
    /// Episode number within the season, absent for specials
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub airdate: Option<NaiveDate>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl Episode {
    /// Short code such as `S01E05`, when season and number are known
    pub fn code(&self) -> Option<String> {
        match (self.season, self.number) {
            (Some(season), Some(number)) => Some(format!("S{season:02}E{number:02}")),
            _ => None,
        }
    }
}
