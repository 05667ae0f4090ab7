//! Sonarr client
//!
//! Sonarr keys series by TVDB id, so recommendations need `external_ids.tvdb_id`
//! resolved before they can be acquired or looked up.
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    models::{
        dvr::SonarrSeries, Acquisition, AcquisitionRequest, MediaType, QueueEntry, RecommendedItem,
        RemoteItem,
    },
    services::dvr::{
        servarr::{tracked_id, ServarrApi},
        DvrClient,
    },
    settings::ServiceProfile,
};

#[derive(Clone)]
pub struct SonarrClient {
    api: ServarrApi,
}

impl SonarrClient {
    pub fn new(profile: &ServiceProfile) -> Self {
        Self {
            api: ServarrApi::new(profile, "sonarr"),
        }
    }

    pub fn with_url(api_url: String, api_key: String) -> Self {
        Self {
            api: ServarrApi::with_url(api_url, api_key, "sonarr"),
        }
    }
}

#[async_trait::async_trait]
impl DvrClient for SonarrClient {
    async fn request_acquisition(&self, request: &AcquisitionRequest) -> AppResult<Acquisition> {
        if request.media_type != MediaType::Series {
            return Err(AppError::InvalidInput(format!(
                "Sonarr cannot acquire {}",
                request.media_type
            )));
        }
        let tvdb_id = request.tvdb_id.ok_or_else(|| {
            AppError::InvalidInput(format!(
                "Series {} has no tvdb id, Sonarr cannot add it",
                request.catalog_id
            ))
        })?;

        let results: Vec<Value> = self
            .api
            .get("/series/lookup", &[("term", format!("tvdb:{}", tvdb_id))])
            .await?;
        let mut series = results.into_iter().next().ok_or_else(|| {
            AppError::ExternalApi(format!("Sonarr lookup found no series for tvdb:{}", tvdb_id))
        })?;

        if tracked_id(&series).is_some() {
            tracing::debug!(tvdb_id, "Series already tracked by Sonarr");
            let existing: SonarrSeries = serde_json::from_value(series).map_err(|e| {
                AppError::ExternalApi(format!("Failed to parse Sonarr series: {}", e))
            })?;
            return Ok(Acquisition {
                remote: existing.into(),
                newly_added: false,
            });
        }

        let fields = series.as_object_mut().ok_or_else(|| {
            AppError::ExternalApi(format!("Sonarr lookup for tvdb:{} was not an object", tvdb_id))
        })?;
        fields.insert("qualityProfileId".into(), json!(request.quality_profile_id));
        if let Some(language_profile_id) = request.language_profile_id {
            fields.insert("languageProfileId".into(), json!(language_profile_id));
        }
        fields.insert("rootFolderPath".into(), json!(request.root_folder));
        fields.insert("seasonFolder".into(), json!(true));
        fields.insert("monitored".into(), json!(true));
        fields.insert("tags".into(), json!(request.tags));
        fields.insert(
            "addOptions".into(),
            json!({ "monitor": "all", "searchForMissingEpisodes": true }),
        );

        let added: SonarrSeries = self.api.post("/series", &series).await?;

        tracing::info!(tvdb_id, sonarr_id = added.id, "Series added to Sonarr");

        Ok(Acquisition {
            remote: added.into(),
            newly_added: true,
        })
    }

    async fn lookup(&self, item: &RecommendedItem) -> AppResult<Option<RemoteItem>> {
        let Some(tvdb_id) = item.external_ids.tvdb_id else {
            return Ok(None);
        };

        let series: Vec<SonarrSeries> = self
            .api
            .get("/series", &[("tvdbId", tvdb_id.to_string())])
            .await?;
        Ok(series.into_iter().next().map(RemoteItem::from))
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
                &format!("/series/{}", remote_id),
                &[
                    ("deleteFiles", "true".to_string()),
                    ("addImportListExclusion", "false".to_string()),
                ],
            )
            .await?;
        tracing::info!(sonarr_id = remote_id, "Series deleted from Sonarr");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sonarr"
    }
}
