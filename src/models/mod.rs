use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

pub mod catalog;
pub mod dvr;
pub mod recommendation;

pub use catalog::{Candidate, CatalogPage, DiscoverStrategy, ExternalIds, Genre, GenreFilter};
pub use dvr::{Acquisition, AcquisitionRequest, LibraryRequest, QueueEntry, RemoteItem};
pub use recommendation::{
    ItemWeights, NewRecommendedItem, RecommendedItem, WatchedItem, WeightEntry,
};

/// Owner of every recommendation created by the planner
pub const ADMIN_USER_ID: i64 = 1;

/// Kind of media a recommendation, watch record or DVR instance deals with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MediaType {
    #[serde(alias = "movie")]
    Movie,
    #[serde(alias = "series")]
    Series,
}

impl MediaType {
    pub const ALL: [MediaType; 2] = [MediaType::Movie, MediaType::Series];

    /// Value stored in the `media_type` columns
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "MOVIE",
            MediaType::Series => "SERIES",
        }
    }

    /// Path segment the catalog uses for this kind (`/discover/movie`, `/discover/tv`)
    pub fn catalog_segment(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "tv",
        }
    }
}

impl Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MOVIE" => Ok(MediaType::Movie),
            "SERIES" | "TV" => Ok(MediaType::Series),
            other => Err(format!("Unknown media type: {}", other)),
        }
    }
}

/// Converts a byte count to gigabytes rounded to two decimals
pub fn bytes_to_gb(bytes: u64) -> f64 {
    let gb = bytes as f64 / (1024.0 * 1024.0 * 1024.0);
    ((gb + f64::EPSILON) * 100.0).round() / 100.0
}
