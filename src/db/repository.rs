/// Persistence seams used by the planner and the schedulers
///
/// Production code talks to [`crate::db::PgStore`]; tests substitute mocks or
/// in-memory fakes.
use crate::{
    error::AppResult,
    models::{
        LibraryRequest, MediaType, NewRecommendedItem, RecommendedItem, WatchedItem,
    },
};

/// Recommendation rows plus the read side of the watch history
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecommendationRepository: Send + Sync {
    /// Deletes every recommendation of this kind that the user did not pin
    async fn delete_unkept(&self, media_type: MediaType) -> AppResult<u64>;

    /// Watched items with a play count above zero, most recently played first
    async fn watched_history(&self, media_type: MediaType) -> AppResult<Vec<WatchedItem>>;

    /// Catalog ids of everything already in the library
    async fn owned_catalog_ids(&self, media_type: MediaType) -> AppResult<Vec<i64>>;

    async fn find_recommended(
        &self,
        catalog_id: i64,
        media_type: MediaType,
    ) -> AppResult<Option<RecommendedItem>>;

    async fn insert_recommended(&self, item: NewRecommendedItem) -> AppResult<RecommendedItem>;

    /// Persists file size and flags of an existing row
    async fn save_recommended(&self, item: &RecommendedItem) -> AppResult<()>;

    async fn delete_recommended(&self, id: i64) -> AppResult<()>;

    /// Rows of this kind the download scheduler may work on (not pinned, not marked for removal)
    async fn list_pending(&self, media_type: MediaType) -> AppResult<Vec<RecommendedItem>>;

    async fn list_recommended(&self) -> AppResult<Vec<RecommendedItem>>;

    async fn set_keep(&self, id: i64, keep: bool) -> AppResult<RecommendedItem>;

    async fn mark_for_removal(&self, id: i64) -> AppResult<RecommendedItem>;

    async fn user_exists(&self, user_id: i64) -> AppResult<bool>;
}

/// Library items and the acquisition requests backing them
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait LibraryRepository: Send + Sync {
    /// Creates the library placeholder and the request record for a recommendation
    async fn create_request(
        &self,
        item: &RecommendedItem,
        is4k: bool,
    ) -> AppResult<LibraryRequest>;

    /// Links a library item to the id the DVR assigned to it
    async fn attach_external_service(&self, media_id: i64, external_service_id: i64)
        -> AppResult<()>;

    async fn delete_request(&self, request_id: i64) -> AppResult<()>;

    async fn delete_media(&self, media_id: i64) -> AppResult<()>;

    async fn delete_media_by_catalog_id(
        &self,
        catalog_id: i64,
        media_type: MediaType,
    ) -> AppResult<u64>;
}
