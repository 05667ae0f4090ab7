use std::collections::HashMap;

use crate::{
    error::AppResult,
    models::{Genre, ItemWeights, MediaType, WatchedItem, WeightEntry},
    services::providers::CatalogProvider,
};

const PLAY_COUNT_WEIGHT: f64 = 0.2;
const HIGH_RATING: i32 = 4;
const HIGH_RATING_BONUS: f64 = 0.5;
const LOW_RATING_BONUS: f64 = 0.1;

/// Accumulates scores per key, remembering first-seen order for tie breaks
#[derive(Default)]
struct Tally {
    entries: Vec<WeightEntry>,
    positions: HashMap<String, usize>,
}

impl Tally {
    fn add(&mut self, key: &str, score: f64) {
        match self.positions.get(key) {
            Some(&position) => self.entries[position].score += score,
            None => {
                self.positions.insert(key.to_string(), self.entries.len());
                self.entries.push(WeightEntry {
                    key: key.to_string(),
                    score,
                    external_id: None,
                });
            }
        }
    }

    /// Highest score first; `sort_by` is stable so ties keep insertion order
    fn into_sorted(self) -> Vec<WeightEntry> {
        let mut entries = self.entries;
        entries.sort_by(|a, b| b.score.total_cmp(&a.score));
        entries
    }
}

/// Score contributed to each genre of a watched item
pub fn genre_score(item: &WatchedItem) -> f64 {
    let rating_bonus = if item.rating >= HIGH_RATING {
        HIGH_RATING_BONUS
    } else {
        LOW_RATING_BONUS
    };
    f64::from(item.play_count) * PLAY_COUNT_WEIGHT + rating_bonus
}

/// Scores genres by play count and rating, and release years by occurrence
pub fn weigh_watched(watched: &[WatchedItem]) -> ItemWeights {
    let mut genres = Tally::default();
    let mut years = Tally::default();

    for item in watched {
        let score = genre_score(item);
        for genre in &item.genres {
            genres.add(genre, score);
        }

        if let Some(year) = item.release_year {
            years.add(&year.to_string(), 1.0);
        }
    }

    ItemWeights {
        genre: genres.into_sorted(),
        production_year: years.into_sorted(),
    }
}

/// Fills in catalog ids for genre names the catalog knows; others stay unset
pub fn assign_genre_ids(weights: &mut ItemWeights, catalog_genres: &[Genre]) {
    for entry in &mut weights.genre {
        entry.external_id = catalog_genres
            .iter()
            .find(|genre| genre.name.trim().eq_ignore_ascii_case(entry.key.trim()))
            .map(|genre| genre.id);
    }
}

/// Weighs the watch history and resolves genre ids against the catalog
///
/// A failed genre lookup fails the whole weighting.
pub async fn weigh_genres_and_production_year(
    catalog: &dyn CatalogProvider,
    media_type: MediaType,
    watched: &[WatchedItem],
) -> AppResult<ItemWeights> {
    let mut weights = weigh_watched(watched);
    let catalog_genres = catalog.genres(media_type).await?;
    assign_genre_ids(&mut weights, &catalog_genres);

    let unresolved = weights
        .genre
        .iter()
        .filter(|entry| entry.external_id.is_none())
        .count();
    if unresolved > 0 {
        tracing::debug!(
            media_type = %media_type,
            unresolved,
            "Some watched genres are unknown to the catalog"
        );
    }

    Ok(weights)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, services::providers::MockCatalogProvider};

    fn watched(play_count: i32, rating: i32, year: Option<i32>, genres: &[&str]) -> WatchedItem {
        WatchedItem {
            catalog_id: 1,
            play_count,
            rating,
            last_play_date: None,
            release_year: year,
            genres: genres.iter().map(|g| g.to_string()).collect(),
        }
    }

    fn score_of(entries: &[WeightEntry], key: &str) -> f64 {
        entries.iter().find(|e| e.key == key).unwrap().score
    }

    #[test]
    fn test_genre_score() {
        assert!((genre_score(&watched(3, 5, None, &[])) - 1.1).abs() < 1e-9);
        assert!((genre_score(&watched(1, 2, None, &[])) - 0.3).abs() < 1e-9);
        assert!((genre_score(&watched(2, 4, None, &[])) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_weigh_watched_accumulates_and_sorts() {
        let history = vec![
            watched(1, 1, Some(2001), &["Drama"]),
            watched(3, 5, Some(1999), &["Comedy", "Drama"]),
            watched(2, 4, Some(1999), &["Comedy"]),
        ];

        let weights = weigh_watched(&history);

        assert_eq!(weights.genre[0].key, "Comedy");
        assert!((score_of(&weights.genre, "Comedy") - 2.0).abs() < 1e-9);
        assert!((score_of(&weights.genre, "Drama") - 1.4).abs() < 1e-9);

        assert_eq!(weights.production_year[0].key, "1999");
        assert_eq!(weights.production_year[0].score, 2.0);
        assert_eq!(weights.production_year[1].key, "2001");
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let history = vec![
            watched(1, 1, Some(2010), &["Horror"]),
            watched(1, 1, Some(2005), &["Western"]),
            watched(1, 1, Some(2012), &["Animation"]),
        ];

        let weights = weigh_watched(&history);
        let keys: Vec<_> = weights.genre.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["Horror", "Western", "Animation"]);
        let years: Vec<_> = weights.production_year.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(years, vec!["2010", "2005", "2012"]);
    }

    #[test]
    fn test_output_is_sorted_descending() {
        let history: Vec<WatchedItem> = (0..20)
            .map(|i| {
                let genre = ["Action", "Comedy", "Drama", "Sci-Fi"][i % 4];
                watched((i % 7) as i32 + 1, (i % 6) as i32, Some(1990 + (i % 3) as i32), &[genre])
            })
            .collect();

        let weights = weigh_watched(&history);
        assert!(weights.genre.windows(2).all(|w| w[0].score >= w[1].score));
        assert!(weights
            .production_year
            .windows(2)
            .all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_more_watching_only_increases_weight() {
        let mut history = vec![watched(1, 1, None, &["Comedy"])];
        let mut previous = score_of(&weigh_watched(&history).genre, "Comedy");

        for play_count in 1..6 {
            history.push(watched(play_count, 5, None, &["Comedy"]));
            let current = score_of(&weigh_watched(&history).genre, "Comedy");
            assert!(current > previous);
            previous = current;
        }
    }

    #[test]
    fn test_assign_genre_ids() {
        let mut weights = weigh_watched(&[watched(1, 5, None, &["Comedy", "Mockumentary"])]);
        let catalog = vec![
            Genre {
                id: 35,
                name: "Comedy".to_string(),
            },
            Genre {
                id: 18,
                name: "Drama".to_string(),
            },
        ];

        assign_genre_ids(&mut weights, &catalog);

        assert_eq!(weights.genre[0].external_id, Some(35));
        assert_eq!(weights.genre[1].external_id, None);
    }

    #[tokio::test]
    async fn test_genre_lookup_failure_is_fatal() {
        let mut catalog = MockCatalogProvider::new();
        catalog
            .expect_genres()
            .returning(|_| Err(AppError::ExternalApi("tmdb down".to_string())));

        let result = weigh_genres_and_production_year(
            &catalog,
            MediaType::Movie,
            &[watched(1, 5, None, &["Comedy"])],
        )
        .await;

        assert!(matches!(result, Err(AppError::ExternalApi(_))));
    }
}
