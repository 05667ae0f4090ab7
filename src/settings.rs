//! Recommendation settings and DVR service profiles
//!
//! Loaded from a JSON settings file and handed to the planner and schedulers
//! through the [`SettingsProvider`] trait.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::{
    error::{AppError, AppResult},
    models::MediaType,
};

/// Per media kind recommendation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendSettings {
    pub enabled: bool,
    pub total_to_recommend: u32,
    /// Size ceiling such as `"500GB"` or `"2TB"`, empty or `0` for unlimited
    pub max_quota: String,
    pub discover_based_on_genre_percentage: f64,
    pub discover_based_on_popularity_percentage: f64,
    pub discover_based_on_watched_percentage: f64,
    /// Id of the DVR profile to use
    pub service_id: i64,
}

impl Default for RecommendSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            total_to_recommend: 20,
            max_quota: String::new(),
            discover_based_on_genre_percentage: 0.4,
            discover_based_on_popularity_percentage: 0.2,
            discover_based_on_watched_percentage: 0.4,
            service_id: 0,
        }
    }
}

impl RecommendSettings {
    /// Whether the three discovery percentages add up to 100%
    pub fn percentages_are_balanced(&self) -> bool {
        let sum = self.discover_based_on_genre_percentage
            + self.discover_based_on_popularity_percentage
            + self.discover_based_on_watched_percentage;
        (sum - 1.0).abs() < 1e-6
    }
}

/// Connection details for one Radarr or Sonarr instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceProfile {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    pub hostname: String,
    pub port: u16,
    pub api_key: String,
    #[serde(default)]
    pub use_ssl: bool,
    #[serde(default)]
    pub base_url: Option<String>,
    pub active_profile_id: i64,
    pub active_directory: String,
    #[serde(default)]
    pub tags: Vec<i64>,
    #[serde(default)]
    pub is4k: bool,
    /// Sonarr only
    #[serde(default)]
    pub active_language_profile_id: Option<i64>,
}

impl ServiceProfile {
    /// Root of the v3 API, e.g. `http://localhost:7878/radarr/api/v3`
    pub fn api_url(&self) -> String {
        let scheme = if self.use_ssl { "https" } else { "http" };
        let base = self
            .base_url
            .as_deref()
            .map(|b| b.trim_end_matches('/'))
            .unwrap_or("");
        format!("{}://{}:{}{}/api/v3", scheme, self.hostname, self.port, base)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecommendSection {
    pub movie_recommend: RecommendSettings,
    pub tv_recommend: RecommendSettings,
}

/// Contents of the settings file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub radarr: Vec<ServiceProfile>,
    pub sonarr: Vec<ServiceProfile>,
    pub flixarr: RecommendSection,
}

impl Settings {
    /// Reads and parses the JSON settings file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read settings {}: {}", path.display(), e))?;
        let settings: Settings = serde_json::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("Failed to parse settings {}: {}", path.display(), e))?;

        for media_type in MediaType::ALL {
            let recommend = settings.recommend_settings(media_type);
            if recommend.enabled && !recommend.percentages_are_balanced() {
                tracing::warn!(
                    media_type = %media_type,
                    "Discovery percentages do not add up to 100%"
                );
            }
        }

        Ok(settings)
    }
}

/// Read access to recommendation settings and DVR profiles
#[cfg_attr(test, mockall::automock)]
pub trait SettingsProvider: Send + Sync {
    fn recommend_settings(&self, media_type: MediaType) -> RecommendSettings;

    fn service_profiles(&self, media_type: MediaType) -> Vec<ServiceProfile>;

    /// Profile referenced by the media kind's `service_id`
    fn active_profile(&self, media_type: MediaType) -> AppResult<ServiceProfile> {
        let service_id = self.recommend_settings(media_type).service_id;
        self.service_profiles(media_type)
            .into_iter()
            .find(|profile| profile.id == service_id)
            .ok_or_else(|| {
                let service = match media_type {
                    MediaType::Movie => "Radarr",
                    MediaType::Series => "Sonarr",
                };
                AppError::Configuration(format!(
                    "No {} profile with id {} provided",
                    service, service_id
                ))
            })
    }

    fn any_enabled(&self) -> bool {
        MediaType::ALL
            .iter()
            .any(|media_type| self.recommend_settings(*media_type).enabled)
    }
}

impl SettingsProvider for Settings {
    fn recommend_settings(&self, media_type: MediaType) -> RecommendSettings {
        match media_type {
            MediaType::Movie => self.flixarr.movie_recommend.clone(),
            MediaType::Series => self.flixarr.tv_recommend.clone(),
        }
    }

    fn service_profiles(&self, media_type: MediaType) -> Vec<ServiceProfile> {
        match media_type {
            MediaType::Movie => self.radarr.clone(),
            MediaType::Series => self.sonarr.clone(),
        }
    }
}
