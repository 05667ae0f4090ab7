pub mod postgres;
pub mod redis;
pub mod repository;

pub use postgres::{create_pool, PgStore};
pub use self::redis::create_redis_client;
pub use self::redis::Cache;
pub use self::redis::CacheKey;
pub use repository::{LibraryRepository, RecommendationRepository};

#[cfg(test)]
pub use repository::{MockLibraryRepository, MockRecommendationRepository};
