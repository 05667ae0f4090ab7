use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExternalIds, MediaType};

/// A library item the user has played, as reported by the watch-history sync
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedItem {
    /// Catalog id of the watched library item
    pub catalog_id: i64,
    pub play_count: i32,
    /// 0 to 5
    pub rating: i32,
    pub last_play_date: Option<DateTime<Utc>>,
    pub release_year: Option<i32>,
    pub genres: Vec<String>,
}

impl WatchedItem {
    /// Splits the stored comma-separated genre string
    pub fn parse_genres(raw: &str) -> Vec<String> {
        raw.split(',')
            .map(str::trim)
            .filter(|genre| !genre.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// A persisted recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendedItem {
    pub id: i64,
    pub catalog_id: i64,
    pub external_ids: ExternalIds,
    pub media_type: MediaType,
    /// Observed size in bytes, set once the DVR reports a download or a file
    pub file_size: Option<u64>,
    pub date_added: DateTime<Utc>,
    /// User pin, survives regeneration
    pub keep: bool,
    /// Marked for deletion by the update pass
    pub to_remove: bool,
    pub user_id: i64,
}

/// A recommendation about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecommendedItem {
    pub catalog_id: i64,
    pub external_ids: ExternalIds,
    pub media_type: MediaType,
    pub date_added: DateTime<Utc>,
    pub user_id: i64,
}

/// Score for a genre name or a release year
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightEntry {
    pub key: String,
    pub score: f64,
    /// Resolved catalog genre id, unset for years and unknown genres
    pub external_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ItemWeights {
    pub genre: Vec<WeightEntry>,
    pub production_year: Vec<WeightEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_genres() {
        assert_eq!(
            WatchedItem::parse_genres("Comedy, Drama,Romance"),
            vec!["Comedy", "Drama", "Romance"]
        );
    }

    #[test]
    fn test_parse_genres_skips_empty() {
        assert!(WatchedItem::parse_genres("").is_empty());
        assert_eq!(WatchedItem::parse_genres("Action,,"), vec!["Action"]);
    }
}
