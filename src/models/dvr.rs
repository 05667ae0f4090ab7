use serde::{Deserialize, Serialize};

use super::MediaType;

/// An item as the DVR backend knows it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteItem {
    pub id: i64,
    pub monitored: bool,
    pub quality_profile_id: i64,
    pub has_file: bool,
    pub size_on_disk: u64,
}

/// Result of asking the DVR to acquire an item
#[derive(Debug, Clone, PartialEq)]
pub struct Acquisition {
    pub remote: RemoteItem,
    /// `false` when the DVR already tracked the item before the request
    pub newly_added: bool,
}

/// An entry in the DVR's active download queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: i64,
    /// Id of the movie or series the download belongs to
    pub parent_id: i64,
    pub size_bytes: u64,
}

/// Everything the DVR needs to start acquiring an item
#[derive(Debug, Clone, PartialEq)]
pub struct AcquisitionRequest {
    pub media_type: MediaType,
    pub catalog_id: i64,
    pub tvdb_id: Option<i64>,
    pub quality_profile_id: i64,
    pub root_folder: String,
    pub tags: Vec<i64>,
    pub language_profile_id: Option<i64>,
}

/// Request record and library placeholder created for an acquisition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryRequest {
    pub request_id: i64,
    pub media_id: i64,
}

// ============================================================================
// Radarr API Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarrMovie {
    pub id: i64,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub quality_profile_id: i64,
    #[serde(default)]
    pub has_file: bool,
    #[serde(default)]
    pub size_on_disk: f64,
}

impl From<RadarrMovie> for RemoteItem {
    fn from(movie: RadarrMovie) -> Self {
        RemoteItem {
            id: movie.id,
            monitored: movie.monitored,
            quality_profile_id: movie.quality_profile_id,
            has_file: movie.has_file,
            size_on_disk: movie.size_on_disk.max(0.0) as u64,
        }
    }
}

// ============================================================================
// Sonarr API Types
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrStatistics {
    #[serde(default)]
    pub episode_file_count: i64,
    #[serde(default)]
    pub size_on_disk: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SonarrSeries {
    pub id: i64,
    #[serde(default)]
    pub monitored: bool,
    #[serde(default)]
    pub quality_profile_id: i64,
    #[serde(default)]
    pub statistics: Option<SonarrStatistics>,
}

impl From<SonarrSeries> for RemoteItem {
    fn from(series: SonarrSeries) -> Self {
        let statistics = series.statistics.unwrap_or_default();
        RemoteItem {
            id: series.id,
            monitored: series.monitored,
            quality_profile_id: series.quality_profile_id,
            has_file: statistics.episode_file_count > 0,
            size_on_disk: statistics.size_on_disk.max(0.0) as u64,
        }
    }
}

// ============================================================================
// Shared queue payload
// ============================================================================

/// Paged `/api/v3/queue` response, shared by Radarr and Sonarr
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServarrQueuePage {
    #[serde(default)]
    pub total_records: i64,
    #[serde(default)]
    pub records: Vec<ServarrQueueRecord>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServarrQueueRecord {
    pub id: i64,
    #[serde(default)]
    pub movie_id: Option<i64>,
    #[serde(default)]
    pub series_id: Option<i64>,
    #[serde(default)]
    pub size: f64,
}

impl ServarrQueueRecord {
    /// Converts a record, keeping only those attached to a parent item
    pub fn into_entry(self) -> Option<QueueEntry> {
        let parent_id = self.movie_id.or(self.series_id)?;
        Some(QueueEntry {
            id: self.id,
            parent_id,
            size_bytes: self.size.max(0.0) as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radarr_movie_to_remote_item() {
        let json = r#"{
            "id": 12,
            "title": "Inception",
            "tmdbId": 27205,
            "monitored": true,
            "qualityProfileId": 4,
            "hasFile": true,
            "sizeOnDisk": 4294967296
        }"#;

        let movie: RadarrMovie = serde_json::from_str(json).unwrap();
        let item: RemoteItem = movie.into();
        assert_eq!(item.id, 12);
        assert!(item.monitored);
        assert_eq!(item.quality_profile_id, 4);
        assert!(item.has_file);
        assert_eq!(item.size_on_disk, 4_294_967_296);
    }

    #[test]
    fn test_sonarr_series_without_files() {
        let json = r#"{
            "id": 3,
            "monitored": false,
            "qualityProfileId": 1,
            "statistics": {"episodeFileCount": 0, "sizeOnDisk": 0}
        }"#;

        let series: SonarrSeries = serde_json::from_str(json).unwrap();
        let item: RemoteItem = series.into();
        assert!(!item.has_file);
        assert!(!item.monitored);
        assert_eq!(item.size_on_disk, 0);
    }

    #[test]
    fn test_queue_record_conversion() {
        let json = r#"{
            "totalRecords": 2,
            "records": [
                {"id": 100, "movieId": 12, "size": 1073741824.0},
                {"id": 101, "size": 5.0}
            ]
        }"#;

        let page: ServarrQueuePage = serde_json::from_str(json).unwrap();
        let entries: Vec<QueueEntry> = page
            .records
            .into_iter()
            .filter_map(ServarrQueueRecord::into_entry)
            .collect();

        assert_eq!(
            entries,
            vec![QueueEntry {
                id: 100,
                parent_id: 12,
                size_bytes: 1_073_741_824,
            }]
        );
    }
}
