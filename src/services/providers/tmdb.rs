/// TMDB catalog provider
///
/// Endpoints used:
/// 1. Listings: /discover/{movie|tv}, /{movie|tv}/popular, /{movie|tv}/{id}/recommendations
/// 2. Secondary ids: /{movie|tv}/{id}/external_ids
/// 3. Genres: /genre/{movie|tv}/list
use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{CatalogPage, DiscoverStrategy, ExternalIds, Genre, GenreFilter, MediaType},
    services::providers::CatalogProvider,
};
use reqwest::Client as HttpClient;
use serde::{de::DeserializeOwned, Deserialize};

const GENRE_CACHE_TTL: u64 = 86400; // 1 day
const EXTERNAL_IDS_CACHE_TTL: u64 = 604800; // 1 week

/// Theatrical-digital releases only
const RELEASE_TYPE: &str = "4";

#[derive(Clone)]
pub struct TmdbProvider {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, cache: Option<Cache>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        }
    }

    /// Query parameters for a discover-by-genre listing
    fn genre_query(media_type: MediaType, filter: &GenreFilter) -> Vec<(&'static str, String)> {
        let genres = filter
            .genre_ids
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let (gte, lte) = match media_type {
            MediaType::Movie => ("primary_release_date.gte", "primary_release_date.lte"),
            MediaType::Series => ("first_air_date.gte", "first_air_date.lte"),
        };

        let mut query = vec![
            ("with_genres", genres),
            ("include_adult", "true".to_string()),
        ];
        if media_type == MediaType::Movie {
            query.push(("with_release_type", RELEASE_TYPE.to_string()));
        }
        if let Some(min) = filter.min_release_date {
            query.push((gte, min.format("%Y-%m-%d").to_string()));
        }
        if let Some(max) = filter.max_release_date {
            query.push((lte, max.format("%Y-%m-%d").to_string()));
        }
        query
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let url = format!("{}{}", self.api_url, path);

        let response = self
            .http_client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str()), ("language", "en")])
            .query(query)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(path = %path, status = %status, "TMDB request failed");
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to deserialize TMDB response");
            AppError::ExternalApi(format!("Failed to parse TMDB response: {}", e))
        })
    }
}

#[async_trait::async_trait]
impl CatalogProvider for TmdbProvider {
    async fn discover(
        &self,
        media_type: MediaType,
        strategy: &DiscoverStrategy,
        page: u32,
    ) -> AppResult<CatalogPage> {
        let segment = media_type.catalog_segment();
        let (path, mut query) = match strategy {
            DiscoverStrategy::Genre(filter) => (
                format!("/discover/{}", segment),
                Self::genre_query(media_type, filter),
            ),
            DiscoverStrategy::Popular => (format!("/{}/popular", segment), Vec::new()),
            DiscoverStrategy::RecommendFromItem { catalog_id } => (
                format!("/{}/{}/recommendations", segment, catalog_id),
                Vec::new(),
            ),
        };
        query.push(("page", page.to_string()));

        let listing: CatalogPage = self.get_json(&path, &query).await?;

        tracing::debug!(
            strategy = strategy.name(),
            media_type = %media_type,
            page,
            total_pages = listing.total_pages,
            results = listing.results.len(),
            provider = "tmdb",
            "Catalog page fetched"
        );

        Ok(listing)
    }

    async fn external_ids(
        &self,
        media_type: MediaType,
        catalog_id: i64,
    ) -> AppResult<ExternalIds> {
        cached!(
            self.cache,
            CacheKey::ExternalIds(media_type, catalog_id),
            EXTERNAL_IDS_CACHE_TTL,
            async move {
                let path = format!(
                    "/{}/{}/external_ids",
                    media_type.catalog_segment(),
                    catalog_id
                );
                self.get_json::<ExternalIds>(&path, &[]).await
            }
        )
    }

    async fn genres(&self, media_type: MediaType) -> AppResult<Vec<Genre>> {
        cached!(
            self.cache,
            CacheKey::Genres(media_type),
            GENRE_CACHE_TTL,
            async move {
                #[derive(Deserialize)]
                struct GenreList {
                    genres: Vec<Genre>,
                }

                let path = format!("/genre/{}/list", media_type.catalog_segment());
                let list: GenreList = self.get_json(&path, &[]).await?;

                tracing::info!(
                    media_type = %media_type,
                    genres = list.genres.len(),
                    provider = "tmdb",
                    "Genre list fetched"
                );

                Ok(list.genres)
            }
        )
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
