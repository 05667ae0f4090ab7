//! Radarr client
//!
//! Movies are keyed by their TMDB id, which is the recommendation's catalog id.
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        dvr::RadarrMovie, Acquisition, AcquisitionRequest, MediaType, QueueEntry, RecommendedItem,
        RemoteItem,
    },
    services::dvr::{
        servarr::{tracked_id, ServarrApi},
        DvrClient,
    },
    settings::ServiceProfile,
};

#[derive(Clone)]
pub struct RadarrClient {
    api: ServarrApi,
}

impl RadarrClient {
    pub fn new(profile: &ServiceProfile) -> Self {
        Self {
            api: ServarrApi::new(profile, "radarr"),
        }
    }

    /// Client against an explicit API root such as `http://host:7878/api/v3`
    pub fn with_url(api_url: String, api_key: String) -> Self {
        Self {
            api: ServarrApi::with_url(api_url, api_key, "radarr"),
        }
    }

    async fn movie_by_tmdb_id(&self, tmdb_id: i64) -> AppResult<Option<RadarrMovie>> {
        let movies: Vec<RadarrMovie> = self
            .api
            .get("/movie", &[("tmdbId", tmdb_id.to_string())])
            .await?;
        Ok(movies.into_iter().next())
    }
}

#[async_trait::async_trait]
impl DvrClient for RadarrClient {
    async fn request_acquisition(&self, request: &AcquisitionRequest) -> AppResult<Acquisition> {
        if request.media_type != MediaType::Movie {
            return Err(AppError::InvalidInput(format!(
                "Radarr cannot acquire {}",
                request.media_type
            )));
        }

        let mut movie: Value = self
            .api
            .get(
                "/movie/lookup/tmdb",
                &[("tmdbId", request.catalog_id.to_string())],
            )
            .await?;

        if tracked_id(&movie).is_some() {
            tracing::debug!(tmdb_id = request.catalog_id, "Movie already tracked by Radarr");
            let existing: RadarrMovie = serde_json::from_value(movie).map_err(|e| {
                AppError::ExternalApi(format!("Failed to parse Radarr movie: {}", e))
            })?;
            return Ok(Acquisition {
                remote: existing.into(),
                newly_added: false,
            });
        }

        let fields = movie.as_object_mut().ok_or_else(|| {
            AppError::ExternalApi(format!(
                "Radarr lookup for tmdb id {} returned no movie",
                request.catalog_id
            ))
        })?;
        fields.insert("qualityProfileId".into(), json!(request.quality_profile_id));
        fields.insert("rootFolderPath".into(), json!(request.root_folder));
        fields.insert("monitored".into(), json!(true));
        fields.insert("tags".into(), json!(request.tags));
        fields.insert("minimumAvailability".into(), json!("released"));
        fields.insert("addOptions".into(), json!({ "searchForMovie": true }));

        let added: RadarrMovie = self.api.post("/movie", &movie).await?;

        tracing::info!(
            tmdb_id = request.catalog_id,
            radarr_id = added.id,
            "Movie added to Radarr"
        );

        Ok(Acquisition {
            remote: added.into(),
            newly_added: true,
        })
    }

    async fn lookup(&self, item: &RecommendedItem) -> AppResult<Option<RemoteItem>> {
        Ok(self
            .movie_by_tmdb_id(item.catalog_id)
            .await?
            .map(RemoteItem::from))
    }

    async fn list_queue(&self) -> AppResult<Vec<QueueEntry>> {
        self.api.queue().await
    }

    async fn remove_from_queue(&self, entry_id: i64) -> AppResult<()> {
        self.api.remove_queue_entry(entry_id).await
    }

    async fn delete_remote_item(&self, remote_id: i64) -> AppResult<()> {
        self.api
            .delete(
                &format!("/movie/{}", remote_id),
                &[
                    ("deleteFiles", "true".to_string()),
                    ("addImportExclusion", "false".to_string()),
                ],
            )
            .await?;
        tracing::info!(radarr_id = remote_id, "Movie deleted from Radarr");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "radarr"
    }
}
