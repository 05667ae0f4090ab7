//! DVR backend abstraction
//!
//! One client per media kind: Radarr acquires movies, Sonarr acquires series.
//! The schedulers only see [`DvrClient`]; which implementation backs it is
//! decided by a [`DvrConnector`] from the configured [`ServiceProfile`].
use std::sync::Arc;

use crate::{
    error::AppResult,
    models::{Acquisition, AcquisitionRequest, MediaType, QueueEntry, RecommendedItem, RemoteItem},
    settings::ServiceProfile,
};

pub mod radarr;
pub mod servarr;
pub mod sonarr;

pub use radarr::RadarrClient;
pub use sonarr::SonarrClient;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait DvrClient: Send + Sync {
    /// Adds the item to the DVR and starts a search, returning the remote record
    ///
    /// Items the DVR already tracks are returned as they are, with
    /// `newly_added` unset.
    async fn request_acquisition(&self, request: &AcquisitionRequest) -> AppResult<Acquisition>;

    /// Finds the DVR's record for a recommendation, `None` when it is not tracked
    async fn lookup(&self, item: &RecommendedItem) -> AppResult<Option<RemoteItem>>;

    /// Entries of the active download queue
    async fn list_queue(&self) -> AppResult<Vec<QueueEntry>>;

    async fn remove_from_queue(&self, entry_id: i64) -> AppResult<()>;

    /// Deletes the remote item together with its files
    async fn delete_remote_item(&self, remote_id: i64) -> AppResult<()>;

    fn name(&self) -> &'static str;
}

/// Builds DVR clients from service profiles
#[cfg_attr(test, mockall::automock)]
pub trait DvrConnector: Send + Sync {
    fn connect(&self, media_type: MediaType, profile: &ServiceProfile) -> Arc<dyn DvrClient>;
}

/// Connects to Radarr for movies and Sonarr for series
#[derive(Debug, Clone, Default)]
pub struct ServarrConnector;

impl DvrConnector for ServarrConnector {
    fn connect(&self, media_type: MediaType, profile: &ServiceProfile) -> Arc<dyn DvrClient> {
        match media_type {
            MediaType::Movie => Arc::new(RadarrClient::new(profile)),
            MediaType::Series => Arc::new(SonarrClient::new(profile)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile() -> ServiceProfile {
        ServiceProfile {
            id: 1,
            name: "dvr".to_string(),
            hostname: "localhost".to_string(),
            port: 7878,
            api_key: "key".to_string(),
            use_ssl: false,
            base_url: None,
            active_profile_id: 1,
            active_directory: "/media".to_string(),
            tags: vec![],
            is4k: false,
            active_language_profile_id: None,
        }
    }

    #[test]
    fn test_connector_picks_client_per_media_type() {
        let connector = ServarrConnector;
        assert_eq!(connector.connect(MediaType::Movie, &profile()).name(), "radarr");
        assert_eq!(connector.connect(MediaType::Series, &profile()).name(), "sonarr");
    }
}
