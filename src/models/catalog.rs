use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A title offered by the catalog, before it is turned into a recommendation
///
/// Movie listings carry `title`, tv listings carry `name`; both land in `title`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    #[serde(alias = "name", default)]
    pub title: String,
    #[serde(default)]
    pub original_language: String,
    #[serde(default)]
    pub popularity: f64,
}

impl Candidate {
    /// Only English titles with some popularity are worth acquiring
    pub fn is_eligible(&self) -> bool {
        self.original_language == "en" && self.popularity > 5.0
    }
}

/// One page of a catalog listing
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogPage {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub results: Vec<Candidate>,
    #[serde(default)]
    pub total_pages: u32,
}

/// Secondary identifiers resolved from a catalog id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
    #[serde(default)]
    pub tvdb_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// Filters for discover-by-genre listings
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenreFilter {
    /// Catalog genre ids, `0` stands for a genre the catalog does not know
    pub genre_ids: Vec<i64>,
    pub min_release_date: Option<NaiveDate>,
    pub max_release_date: Option<NaiveDate>,
}

/// Which catalog listing feeds a discovery pass
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoverStrategy {
    Genre(GenreFilter),
    Popular,
    RecommendFromItem { catalog_id: i64 },
}

impl DiscoverStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            DiscoverStrategy::Genre(_) => "genre",
            DiscoverStrategy::Popular => "popular",
            DiscoverStrategy::RecommendFromItem { .. } => "recommend-from-item",
        }
    }
}
