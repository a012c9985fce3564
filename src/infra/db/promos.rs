use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{PromoRepo, RepoError, UpsertPromoBannerParams};
use crate::domain::entities::PromoBannerRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PromoBannerRow {
    id: Uuid,
    headline: String,
    body: String,
    starts_at: OffsetDateTime,
    ends_at: OffsetDateTime,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<PromoBannerRow> for PromoBannerRecord {
    fn from(row: PromoBannerRow) -> Self {
        Self {
            id: row.id,
            headline: row.headline,
            body: row.body,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl PromoRepo for PostgresRepositories {
    async fn list_active_promos(&self) -> Result<Vec<PromoBannerRecord>, RepoError> {
        let rows = sqlx::query_as::<_, PromoBannerRow>(
            "SELECT id, headline, body, starts_at, ends_at, created_at, updated_at \
             FROM promo_banners \
             WHERE starts_at <= now() AND ends_at > now() \
             ORDER BY starts_at ASC, id ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(PromoBannerRecord::from).collect())
    }

    async fn upsert_promo(
        &self,
        params: UpsertPromoBannerParams,
    ) -> Result<PromoBannerRecord, RepoError> {
        let id = params.id.unwrap_or_else(Uuid::new_v4);
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, PromoBannerRow>(
            "INSERT INTO promo_banners (id, headline, body, starts_at, ends_at, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (id) DO UPDATE \
             SET headline = EXCLUDED.headline, body = EXCLUDED.body, \
                 starts_at = EXCLUDED.starts_at, ends_at = EXCLUDED.ends_at, \
                 updated_at = EXCLUDED.updated_at \
             RETURNING id, headline, body, starts_at, ends_at, created_at, updated_at",
        )
        .bind(id)
        .bind(&params.headline)
        .bind(&params.body)
        .bind(params.starts_at)
        .bind(params.ends_at)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(PromoBannerRecord::from(row))
    }

    async fn delete_promo(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM promo_banners WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
