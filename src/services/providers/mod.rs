/// Catalog/metadata provider abstraction
///
/// The recommendation engine only needs three things from a metadata service:
/// paged listings for each discovery strategy, secondary ids for a title, and
/// the genre list used to resolve weighted genre names.
use crate::{
    error::AppResult,
    models::{CatalogPage, DiscoverStrategy, ExternalIds, Genre, MediaType},
};

pub mod tmdb;

pub use tmdb::TmdbProvider;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch one page of the listing behind `strategy`
    async fn discover(
        &self,
        media_type: MediaType,
        strategy: &DiscoverStrategy,
        page: u32,
    ) -> AppResult<CatalogPage>;

    /// Resolve imdb/tvdb ids for a catalog id
    async fn external_ids(&self, media_type: MediaType, catalog_id: i64)
        -> AppResult<ExternalIds>;

    /// Every genre the catalog knows for this media kind
    async fn genres(&self, media_type: MediaType) -> AppResult<Vec<Genre>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
