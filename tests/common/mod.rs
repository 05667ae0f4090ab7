//! In-memory collaborators for end-to-end planner and scheduler tests
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use flixarr::{
    db::{LibraryRepository, RecommendationRepository},
    error::{AppError, AppResult},
    models::{
        Acquisition, AcquisitionRequest, Candidate, CatalogPage, DiscoverStrategy, ExternalIds, Genre,
        LibraryRequest, MediaType, NewRecommendedItem, QueueEntry, RecommendedItem, RemoteItem,
        WatchedItem,
    },
    services::{
        dvr::{DvrClient, DvrConnector},
        providers::CatalogProvider,
    },
    settings::{RecommendSection, RecommendSettings, ServiceProfile, Settings},
};

pub const GIB: u64 = 1024 * 1024 * 1024;
pub const PAGE_SIZE: usize = 20;

pub fn candidate(id: i64) -> Candidate {
    Candidate {
        id,
        title: format!("Title {}", id),
        original_language: "en".to_string(),
        popularity: 25.0,
    }
}

pub fn watched(catalog_id: i64, play_count: i32, rating: i32, genres: &[&str]) -> WatchedItem {
    WatchedItem {
        catalog_id,
        play_count,
        rating,
        last_play_date: Some(Utc::now()),
        release_year: Some(2004),
        genres: genres.iter().map(|g| g.to_string()).collect(),
    }
}

pub fn profile(active_profile_id: i64) -> ServiceProfile {
    ServiceProfile {
        id: 1,
        name: "dvr".to_string(),
        hostname: "localhost".to_string(),
        port: 7878,
        api_key: "key".to_string(),
        use_ssl: false,
        base_url: None,
        active_profile_id,
        active_directory: "/media".to_string(),
        tags: vec![],
        is4k: false,
        active_language_profile_id: None,
    }
}

/// Movies enabled with the given quota and totals, series disabled
pub fn movie_settings(total_to_recommend: u32, max_quota: &str) -> Settings {
    Settings {
        radarr: vec![profile(4)],
        sonarr: vec![],
        flixarr: RecommendSection {
            movie_recommend: RecommendSettings {
                enabled: true,
                total_to_recommend,
                max_quota: max_quota.to_string(),
                service_id: 1,
                ..Default::default()
            },
            tv_recommend: RecommendSettings::default(),
        },
    }
}

fn listing_key(strategy: &DiscoverStrategy) -> String {
    format!("{:?}", strategy)
}

/// Catalog serving fixed listings, `PAGE_SIZE` results per page
#[derive(Default)]
pub struct FakeCatalog {
    genres: Vec<Genre>,
    listings: HashMap<String, Vec<Candidate>>,
    pub discover_calls: Mutex<Vec<(String, u32)>>,
}

impl FakeCatalog {
    pub fn new(genres: Vec<Genre>) -> Self {
        Self {
            genres,
            ..Default::default()
        }
    }

    pub fn with_listing(mut self, strategy: DiscoverStrategy, candidates: Vec<Candidate>) -> Self {
        self.listings.insert(listing_key(&strategy), candidates);
        self
    }

    pub fn calls_for(&self, strategy: &DiscoverStrategy) -> Vec<u32> {
        let key = listing_key(strategy);
        self.discover_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(called, _)| *called == key)
            .map(|(_, page)| *page)
            .collect()
    }
}

#[async_trait::async_trait]
impl CatalogProvider for FakeCatalog {
    async fn discover(
        &self,
        _media_type: MediaType,
        strategy: &DiscoverStrategy,
        page: u32,
    ) -> AppResult<CatalogPage> {
        let key = listing_key(strategy);
        self.discover_calls.lock().unwrap().push((key.clone(), page));

        let listing = self.listings.get(&key).cloned().unwrap_or_default();
        let total_pages = listing.len().div_ceil(PAGE_SIZE).max(1) as u32;
        let start = (page as usize - 1) * PAGE_SIZE;
        let results = listing.into_iter().skip(start).take(PAGE_SIZE).collect();

        Ok(CatalogPage {
            page,
            results,
            total_pages,
        })
    }

    async fn external_ids(&self, _media_type: MediaType, catalog_id: i64) -> AppResult<ExternalIds> {
        Ok(ExternalIds {
            imdb_id: Some(format!("tt{:07}", catalog_id)),
            tvdb_id: Some(catalog_id + 500_000),
        })
    }

    async fn genres(&self, _media_type: MediaType) -> AppResult<Vec<Genre>> {
        Ok(self.genres.clone())
    }

    fn name(&self) -> &'static str {
        "fake-catalog"
    }
}

#[derive(Debug, Clone)]
pub struct MediaRow {
    pub catalog_id: i64,
    pub media_type: MediaType,
    pub external_service_id: Option<i64>,
}

#[derive(Default)]
struct StoreState {
    users: HashSet<i64>,
    recommended: Vec<RecommendedItem>,
    watched: HashMap<MediaType, Vec<WatchedItem>>,
    owned: HashMap<MediaType, Vec<i64>>,
    media: HashMap<i64, MediaRow>,
    requests: HashMap<i64, i64>,
    next_id: i64,
}

impl StoreState {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Both repositories over one in-memory state
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<StoreState>,
}

impl InMemoryStore {
    pub fn with_admin() -> Self {
        let store = Self::default();
        store.state.lock().unwrap().users.insert(1);
        store
    }

    pub fn set_watched(&self, media_type: MediaType, items: Vec<WatchedItem>) {
        self.state.lock().unwrap().watched.insert(media_type, items);
    }

    pub fn set_owned(&self, media_type: MediaType, ids: Vec<i64>) {
        self.state.lock().unwrap().owned.insert(media_type, ids);
    }

    pub fn add_recommended(
        &self,
        catalog_id: i64,
        media_type: MediaType,
        file_size: Option<u64>,
    ) -> RecommendedItem {
        let mut state = self.state.lock().unwrap();
        let item = RecommendedItem {
            id: state.next_id(),
            catalog_id,
            external_ids: ExternalIds::default(),
            media_type,
            file_size,
            date_added: Utc::now(),
            keep: false,
            to_remove: false,
            user_id: 1,
        };
        state.recommended.push(item.clone());
        item
    }

    pub fn recommended(&self) -> Vec<RecommendedItem> {
        self.state.lock().unwrap().recommended.clone()
    }

    pub fn media(&self) -> Vec<MediaRow> {
        self.state.lock().unwrap().media.values().cloned().collect()
    }

    pub fn request_count(&self) -> usize {
        self.state.lock().unwrap().requests.len()
    }

    fn update<F: FnOnce(&mut RecommendedItem)>(&self, id: i64, change: F) -> AppResult<RecommendedItem> {
        let mut state = self.state.lock().unwrap();
        let item = state
            .recommended
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Recommendation {} does not exist", id)))?;
        change(item);
        Ok(item.clone())
    }
}

#[async_trait::async_trait]
impl RecommendationRepository for InMemoryStore {
    async fn delete_unkept(&self, media_type: MediaType) -> AppResult<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.recommended.len();
        state
            .recommended
            .retain(|item| item.media_type != media_type || item.keep);
        Ok((before - state.recommended.len()) as u64)
    }

    async fn watched_history(&self, media_type: MediaType) -> AppResult<Vec<WatchedItem>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .watched
            .get(&media_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn owned_catalog_ids(&self, media_type: MediaType) -> AppResult<Vec<i64>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .owned
            .get(&media_type)
            .cloned()
            .unwrap_or_default())
    }

    async fn find_recommended(
        &self,
        catalog_id: i64,
        media_type: MediaType,
    ) -> AppResult<Option<RecommendedItem>> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .recommended
            .iter()
            .find(|item| item.catalog_id == catalog_id && item.media_type == media_type)
            .cloned())
    }

    async fn insert_recommended(&self, item: NewRecommendedItem) -> AppResult<RecommendedItem> {
        let mut state = self.state.lock().unwrap();
        let stored = RecommendedItem {
            id: state.next_id(),
            catalog_id: item.catalog_id,
            external_ids: item.external_ids,
            media_type: item.media_type,
            file_size: None,
            date_added: item.date_added,
            keep: false,
            to_remove: false,
            user_id: item.user_id,
        };
        state.recommended.push(stored.clone());
        Ok(stored)
    }

    async fn save_recommended(&self, item: &RecommendedItem) -> AppResult<()> {
        let saved = item.clone();
        self.update(item.id, move |stored| *stored = saved).map(|_| ())
    }

    async fn delete_recommended(&self, id: i64) -> AppResult<()> {
        self.state
            .lock()
            .unwrap()
            .recommended
            .retain(|item| item.id != id);
        Ok(())
    }

    async fn list_pending(&self, media_type: MediaType) -> AppResult<Vec<RecommendedItem>> {
        Ok(self
            .recommended()
            .into_iter()
            .filter(|item| item.media_type == media_type && !item.keep && !item.to_remove)
            .collect())
    }

    async fn list_recommended(&self) -> AppResult<Vec<RecommendedItem>> {
        Ok(self.recommended())
    }

    async fn set_keep(&self, id: i64, keep: bool) -> AppResult<RecommendedItem> {
        self.update(id, |item| item.keep = keep)
    }

    async fn mark_for_removal(&self, id: i64) -> AppResult<RecommendedItem> {
        self.update(id, |item| item.to_remove = true)
    }

    async fn user_exists(&self, user_id: i64) -> AppResult<bool> {
        Ok(self.state.lock().unwrap().users.contains(&user_id))
    }
}

#[async_trait::async_trait]
impl LibraryRepository for InMemoryStore {
    async fn create_request(&self, item: &RecommendedItem, _is4k: bool) -> AppResult<LibraryRequest> {
        let mut state = self.state.lock().unwrap();
        let media_id = state.next_id();
        state.media.insert(
            media_id,
            MediaRow {
                catalog_id: item.catalog_id,
                media_type: item.media_type,
                external_service_id: None,
            },
        );
        let request_id = state.next_id();
        state.requests.insert(request_id, media_id);
        Ok(LibraryRequest {
            request_id,
            media_id,
        })
    }

    async fn attach_external_service(&self, media_id: i64, external_service_id: i64) -> AppResult<()> {
        if let Some(row) = self.state.lock().unwrap().media.get_mut(&media_id) {
            row.external_service_id = Some(external_service_id);
        }
        Ok(())
    }

    async fn delete_request(&self, request_id: i64) -> AppResult<()> {
        self.state.lock().unwrap().requests.remove(&request_id);
        Ok(())
    }

    async fn delete_media(&self, media_id: i64) -> AppResult<()> {
        self.state.lock().unwrap().media.remove(&media_id);
        Ok(())
    }

    async fn delete_media_by_catalog_id(&self, catalog_id: i64, media_type: MediaType) -> AppResult<u64> {
        let mut state = self.state.lock().unwrap();
        let before = state.media.len();
        state
            .media
            .retain(|_, row| row.catalog_id != catalog_id || row.media_type != media_type);
        Ok((before - state.media.len()) as u64)
    }
}

#[derive(Default)]
struct DvrState {
    /// Remote items keyed by catalog id
    items: HashMap<i64, RemoteItem>,
    queue: Vec<QueueEntry>,
    acquisitions: Vec<AcquisitionRequest>,
    deleted: Vec<i64>,
    dequeued: Vec<i64>,
    next_id: i64,
}

/// DVR that queues downloads for catalog ids it was given a size for
#[derive(Default)]
pub struct FakeDvr {
    state: Mutex<DvrState>,
    queue_sizes: HashMap<i64, u64>,
    failing: HashSet<i64>,
    quality_profile_id: i64,
}

impl FakeDvr {
    pub fn new(quality_profile_id: i64) -> Self {
        Self {
            quality_profile_id,
            ..Default::default()
        }
    }

    /// Acquiring `catalog_id` puts a download of `bytes` in the queue
    pub fn queues(mut self, catalog_id: i64, bytes: u64) -> Self {
        self.queue_sizes.insert(catalog_id, bytes);
        self
    }

    /// Acquisition requests for `catalog_id` fail
    pub fn rejects(mut self, catalog_id: i64) -> Self {
        self.failing.insert(catalog_id);
        self
    }

    /// Registers an item the DVR already tracks, optionally with a download in the queue
    pub fn track(&self, catalog_id: i64, has_file: bool, size_on_disk: u64, queued: bool) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.items.insert(
            catalog_id,
            RemoteItem {
                id,
                monitored: true,
                quality_profile_id: self.quality_profile_id,
                has_file,
                size_on_disk,
            },
        );
        if queued {
            state.queue.push(QueueEntry {
                id: id + 10_000,
                parent_id: id,
                size_bytes: size_on_disk,
            });
        }
        id
    }

    pub fn acquisitions(&self) -> Vec<AcquisitionRequest> {
        self.state.lock().unwrap().acquisitions.clone()
    }

    pub fn deleted(&self) -> Vec<i64> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn dequeued(&self) -> Vec<i64> {
        self.state.lock().unwrap().dequeued.clone()
    }
}

#[async_trait::async_trait]
impl DvrClient for FakeDvr {
    async fn request_acquisition(&self, request: &AcquisitionRequest) -> AppResult<Acquisition> {
        if self.failing.contains(&request.catalog_id) {
            return Err(AppError::ExternalApi(format!(
                "cannot acquire {}",
                request.catalog_id
            )));
        }

        let mut state = self.state.lock().unwrap();
        state.acquisitions.push(request.clone());
        if let Some(existing) = state.items.get(&request.catalog_id) {
            return Ok(Acquisition {
                remote: existing.clone(),
                newly_added: false,
            });
        }

        state.next_id += 1;
        let remote = RemoteItem {
            id: state.next_id,
            monitored: true,
            quality_profile_id: request.quality_profile_id,
            has_file: false,
            size_on_disk: 0,
        };
        state.items.insert(request.catalog_id, remote.clone());
        if let Some(bytes) = self.queue_sizes.get(&request.catalog_id) {
            state.queue.push(QueueEntry {
                id: remote.id + 10_000,
                parent_id: remote.id,
                size_bytes: *bytes,
            });
        }
        Ok(Acquisition {
            remote,
            newly_added: true,
        })
    }

    async fn lookup(&self, item: &RecommendedItem) -> AppResult<Option<RemoteItem>> {
        Ok(self.state.lock().unwrap().items.get(&item.catalog_id).cloned())
    }

    async fn list_queue(&self) -> AppResult<Vec<QueueEntry>> {
        Ok(self.state.lock().unwrap().queue.clone())
    }

    async fn remove_from_queue(&self, entry_id: i64) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.queue.retain(|entry| entry.id != entry_id);
        state.dequeued.push(entry_id);
        Ok(())
    }

    async fn delete_remote_item(&self, remote_id: i64) -> AppResult<()> {
        let mut state = self.state.lock().unwrap();
        state.items.retain(|_, item| item.id != remote_id);
        state.deleted.push(remote_id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "fake-dvr"
    }
}

/// Hands out the same fake DVR for every media kind
pub struct FakeConnector(pub Arc<FakeDvr>);

impl DvrConnector for FakeConnector {
    fn connect(&self, _media_type: MediaType, _profile: &ServiceProfile) -> Arc<dyn DvrClient> {
        self.0.clone()
    }
}
