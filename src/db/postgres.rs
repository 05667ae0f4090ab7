use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};

use crate::{
    db::{LibraryRepository, RecommendationRepository},
    error::{AppError, AppResult},
    models::{
        ExternalIds, LibraryRequest, MediaType, NewRecommendedItem, RecommendedItem,
        WatchedItem,
    },
};

/// Creates a PostgreSQL connection pool and applies pending migrations
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

const RECOMMENDED_COLUMNS: &str = "id, catalog_id, imdb_id, tvdb_id, media_type, file_size, \
     date_added, keep, to_remove, user_id";

#[derive(Debug, FromRow)]
struct RecommendedRow {
    id: i64,
    catalog_id: i64,
    imdb_id: Option<String>,
    tvdb_id: Option<i64>,
    media_type: String,
    file_size: Option<i64>,
    date_added: DateTime<Utc>,
    keep: bool,
    to_remove: bool,
    user_id: i64,
}

impl TryFrom<RecommendedRow> for RecommendedItem {
    type Error = AppError;

    fn try_from(row: RecommendedRow) -> Result<Self, Self::Error> {
        let media_type = row.media_type.parse().map_err(AppError::Internal)?;
        Ok(RecommendedItem {
            id: row.id,
            catalog_id: row.catalog_id,
            external_ids: ExternalIds {
                imdb_id: row.imdb_id,
                tvdb_id: row.tvdb_id,
            },
            media_type,
            file_size: row.file_size.map(|size| size.max(0) as u64),
            date_added: row.date_added,
            keep: row.keep,
            to_remove: row.to_remove,
            user_id: row.user_id,
        })
    }
}

#[derive(Debug, FromRow)]
struct WatchedRow {
    catalog_id: i64,
    play_count: i32,
    rating: i32,
    last_play_date: Option<DateTime<Utc>>,
    release_year: Option<i32>,
    genres: String,
}

impl From<WatchedRow> for WatchedItem {
    fn from(row: WatchedRow) -> Self {
        WatchedItem {
            catalog_id: row.catalog_id,
            play_count: row.play_count,
            rating: row.rating,
            last_play_date: row.last_play_date,
            release_year: row.release_year,
            genres: WatchedItem::parse_genres(&row.genres),
        }
    }
}

fn into_items(rows: Vec<RecommendedRow>) -> AppResult<Vec<RecommendedItem>> {
    rows.into_iter().map(RecommendedItem::try_from).collect()
}

/// Postgres-backed implementation of both repositories
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_recommended(&self, id: i64) -> AppResult<RecommendedItem> {
        let sql = format!(
            "SELECT {} FROM media_recommended WHERE id = $1",
            RECOMMENDED_COLUMNS
        );
        sqlx::query_as::<_, RecommendedRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Recommendation {} does not exist", id)))?
            .try_into()
    }
}

#[async_trait::async_trait]
impl RecommendationRepository for PgStore {
    async fn delete_unkept(&self, media_type: MediaType) -> AppResult<u64> {
        let result =
            sqlx::query("DELETE FROM media_recommended WHERE keep = FALSE AND media_type = $1")
                .bind(media_type.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn watched_history(&self, media_type: MediaType) -> AppResult<Vec<WatchedItem>> {
        let rows = sqlx::query_as::<_, WatchedRow>(
            r#"
            SELECT m.catalog_id, w.play_count, w.rating, w.last_play_date, w.release_year, w.genres
            FROM media_watched w
            JOIN media m ON m.id = w.media_id
            WHERE w.play_count > 0 AND m.media_type = $1
            ORDER BY w.last_play_date DESC NULLS LAST
            "#,
        )
        .bind(media_type.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(WatchedItem::from).collect())
    }

    async fn owned_catalog_ids(&self, media_type: MediaType) -> AppResult<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>("SELECT catalog_id FROM media WHERE media_type = $1")
            .bind(media_type.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn find_recommended(
        &self,
        catalog_id: i64,
        media_type: MediaType,
    ) -> AppResult<Option<RecommendedItem>> {
        let sql = format!(
            "SELECT {} FROM media_recommended WHERE catalog_id = $1 AND media_type = $2",
            RECOMMENDED_COLUMNS
        );
        sqlx::query_as::<_, RecommendedRow>(&sql)
            .bind(catalog_id)
            .bind(media_type.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(RecommendedItem::try_from)
            .transpose()
    }

    async fn insert_recommended(&self, item: NewRecommendedItem) -> AppResult<RecommendedItem> {
        let sql = format!(
            r#"
            INSERT INTO media_recommended (catalog_id, imdb_id, tvdb_id, media_type, date_added, user_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            RECOMMENDED_COLUMNS
        );
        sqlx::query_as::<_, RecommendedRow>(&sql)
            .bind(item.catalog_id)
            .bind(item.external_ids.imdb_id)
            .bind(item.external_ids.tvdb_id)
            .bind(item.media_type.as_str())
            .bind(item.date_added)
            .bind(item.user_id)
            .fetch_one(&self.pool)
            .await?
            .try_into()
    }

    async fn save_recommended(&self, item: &RecommendedItem) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE media_recommended
            SET file_size = $2, keep = $3, to_remove = $4, imdb_id = $5, tvdb_id = $6
            WHERE id = $1
            "#,
        )
        .bind(item.id)
        .bind(item.file_size.map(|size| size as i64))
        .bind(item.keep)
        .bind(item.to_remove)
        .bind(item.external_ids.imdb_id.as_deref())
        .bind(item.external_ids.tvdb_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_recommended(&self, id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM media_recommended WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_pending(&self, media_type: MediaType) -> AppResult<Vec<RecommendedItem>> {
        let sql = format!(
            r#"
            SELECT {} FROM media_recommended
            WHERE media_type = $1 AND to_remove = FALSE AND keep = FALSE
            ORDER BY date_added, id
            "#,
            RECOMMENDED_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecommendedRow>(&sql)
            .bind(media_type.as_str())
            .fetch_all(&self.pool)
            .await?;
        into_items(rows)
    }

    async fn list_recommended(&self) -> AppResult<Vec<RecommendedItem>> {
        let sql = format!(
            "SELECT {} FROM media_recommended ORDER BY date_added, id",
            RECOMMENDED_COLUMNS
        );
        let rows = sqlx::query_as::<_, RecommendedRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        into_items(rows)
    }

    async fn set_keep(&self, id: i64, keep: bool) -> AppResult<RecommendedItem> {
        sqlx::query("UPDATE media_recommended SET keep = $2 WHERE id = $1")
            .bind(id)
            .bind(keep)
            .execute(&self.pool)
            .await?;
        self.fetch_recommended(id).await
    }

    async fn mark_for_removal(&self, id: i64) -> AppResult<RecommendedItem> {
        sqlx::query("UPDATE media_recommended SET to_remove = TRUE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        self.fetch_recommended(id).await
    }

    async fn user_exists(&self, user_id: i64) -> AppResult<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait::async_trait]
impl LibraryRepository for PgStore {
    async fn create_request(
        &self,
        item: &RecommendedItem,
        is4k: bool,
    ) -> AppResult<LibraryRequest> {
        let mut tx = self.pool.begin().await?;

        let media_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO media (catalog_id, media_type, imdb_id, tvdb_id, is4k)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (catalog_id, media_type) DO UPDATE SET is4k = EXCLUDED.is4k
            RETURNING id
            "#,
        )
        .bind(item.catalog_id)
        .bind(item.media_type.as_str())
        .bind(item.external_ids.imdb_id.as_deref())
        .bind(item.external_ids.tvdb_id)
        .bind(is4k)
        .fetch_one(&mut *tx)
        .await?;

        let request_id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO media_requests (media_id, requested_by, is4k)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(media_id)
        .bind(item.user_id)
        .bind(is4k)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(LibraryRequest {
            request_id,
            media_id,
        })
    }

    async fn attach_external_service(
        &self,
        media_id: i64,
        external_service_id: i64,
    ) -> AppResult<()> {
        sqlx::query("UPDATE media SET external_service_id = $2 WHERE id = $1")
            .bind(media_id)
            .bind(external_service_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_request(&self, request_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM media_requests WHERE id = $1")
            .bind(request_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_media(&self, media_id: i64) -> AppResult<()> {
        sqlx::query("DELETE FROM media WHERE id = $1")
            .bind(media_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_media_by_catalog_id(
        &self,
        catalog_id: i64,
        media_type: MediaType,
    ) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM media WHERE catalog_id = $1 AND media_type = $2")
            .bind(catalog_id)
            .bind(media_type.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
