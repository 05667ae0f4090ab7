use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    db::RecommendationRepository,
    error::AppResult,
    models::{
        Candidate, DiscoverStrategy, GenreFilter, ItemWeights, MediaType, NewRecommendedItem,
        WatchedItem, ADMIN_USER_ID,
    },
    services::providers::CatalogProvider,
    settings::{RecommendSettings, SettingsProvider},
};

use super::{
    discovery::{CandidateDiscoverer, Discovery},
    seeds::{recently_watched, select_seeds},
    weights::weigh_genres_and_production_year,
};

/// Genres taken from the top of the weighting
const TOP_GENRES: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendSummary {
    pub media_type: MediaType,
    /// Unpinned rows cleared before planning
    pub removed: u64,
    pub discovered: usize,
    pub created: usize,
    pub already_recommended: usize,
}

/// Regenerates the recommendation list of a media kind
///
/// Unpinned rows are cleared, then three discovery passes (top genres,
/// popularity, recently watched) fill the list. Every pass excludes what the
/// library owns and what earlier passes found.
#[derive(Clone)]
pub struct RecommendationPlanner {
    catalog: Arc<dyn CatalogProvider>,
    discoverer: CandidateDiscoverer,
    recommendations: Arc<dyn RecommendationRepository>,
    settings: Arc<dyn SettingsProvider>,
}

impl RecommendationPlanner {
    pub fn new(
        catalog: Arc<dyn CatalogProvider>,
        recommendations: Arc<dyn RecommendationRepository>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        Self {
            discoverer: CandidateDiscoverer::new(catalog.clone()),
            catalog,
            recommendations,
            settings,
        }
    }

    /// Plans every enabled media kind; a failed kind is logged and does not stop the next
    pub async fn recommend_enabled(&self) -> Vec<RecommendSummary> {
        let mut summaries = Vec::new();
        for media_type in MediaType::ALL {
            if !self.settings.recommend_settings(media_type).enabled {
                tracing::debug!(media_type = %media_type, "Recommendations disabled");
                continue;
            }

            match self.recommend(media_type).await {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    tracing::error!(
                        media_type = %media_type,
                        error = %e,
                        "Recommendation run failed"
                    );
                }
            }
        }
        summaries
    }

    pub async fn recommend(&self, media_type: MediaType) -> AppResult<RecommendSummary> {
        let settings = self.settings.recommend_settings(media_type);

        let removed = self.recommendations.delete_unkept(media_type).await?;
        let watched = self.recommendations.watched_history(media_type).await?;
        let mut exclude: HashSet<i64> = self
            .recommendations
            .owned_catalog_ids(media_type)
            .await?
            .into_iter()
            .collect();

        tracing::info!(
            media_type = %media_type,
            removed,
            watched = watched.len(),
            owned = exclude.len(),
            "Planning recommendations"
        );

        let weights =
            weigh_genres_and_production_year(self.catalog.as_ref(), media_type, &watched).await?;

        let seeds = pick_seeds(&watched, Utc::now());
        let passes = genre_passes(media_type, &weights, &settings)
            .into_iter()
            .chain(std::iter::once(popularity_pass(media_type, &settings)))
            .chain(watched_passes(media_type, &seeds, &settings));

        let mut candidates: Vec<Candidate> = Vec::new();
        for discovery in passes {
            let found = self.discoverer.discover(&discovery, &exclude).await?;
            tracing::debug!(
                media_type = %media_type,
                strategy = discovery.strategy.name(),
                found = found.len(),
                "Pass finished"
            );
            exclude.extend(found.iter().map(|candidate| candidate.id));
            candidates.extend(found);
        }

        let mut summary = RecommendSummary {
            media_type,
            removed,
            discovered: candidates.len(),
            created: 0,
            already_recommended: 0,
        };

        for candidate in candidates {
            if self
                .recommendations
                .find_recommended(candidate.id, media_type)
                .await?
                .is_some()
            {
                summary.already_recommended += 1;
                continue;
            }

            let external_ids = self.catalog.external_ids(media_type, candidate.id).await?;
            self.recommendations
                .insert_recommended(NewRecommendedItem {
                    catalog_id: candidate.id,
                    external_ids,
                    media_type,
                    date_added: Utc::now(),
                    user_id: ADMIN_USER_ID,
                })
                .await?;
            summary.created += 1;
        }

        tracing::info!(
            media_type = %media_type,
            discovered = summary.discovered,
            created = summary.created,
            already_recommended = summary.already_recommended,
            "Recommendations planned"
        );

        Ok(summary)
    }
}

fn pick_seeds(watched: &[WatchedItem], now: DateTime<Utc>) -> Vec<WatchedItem> {
    let recent = recently_watched(watched, now);
    select_seeds(&recent, &mut rand::thread_rng())
}

/// One pass per top genre, sharing the genre budget by score
fn genre_passes(
    media_type: MediaType,
    weights: &ItemWeights,
    settings: &RecommendSettings,
) -> Vec<Discovery> {
    let top = &weights.genre[..weights.genre.len().min(TOP_GENRES)];
    let top_total: f64 = top.iter().map(|entry| entry.score).sum();
    if top_total <= 0.0 {
        return Vec::new();
    }

    let budget =
        f64::from(settings.total_to_recommend) * settings.discover_based_on_genre_percentage;
    top.iter()
        .map(|entry| {
            Discovery::new(
                media_type,
                DiscoverStrategy::Genre(GenreFilter {
                    genre_ids: vec![entry.external_id.unwrap_or(0)],
                    ..Default::default()
                }),
                entry.score / top_total,
                budget,
            )
        })
        .collect()
}

fn popularity_pass(media_type: MediaType, settings: &RecommendSettings) -> Discovery {
    Discovery::new(
        media_type,
        DiscoverStrategy::Popular,
        settings.discover_based_on_popularity_percentage,
        f64::from(settings.total_to_recommend),
    )
}

/// One pass per seed, splitting the watched budget evenly
fn watched_passes(
    media_type: MediaType,
    seeds: &[WatchedItem],
    settings: &RecommendSettings,
) -> Vec<Discovery> {
    if seeds.is_empty() {
        return Vec::new();
    }

    let split = 1.0 / seeds.len() as f64;
    let budget =
        f64::from(settings.total_to_recommend) * settings.discover_based_on_watched_percentage;
    seeds
        .iter()
        .map(|seed| {
            Discovery::new(
                media_type,
                DiscoverStrategy::RecommendFromItem {
                    catalog_id: seed.catalog_id,
                },
                split,
                budget,
            )
        })
        .collect()
}
