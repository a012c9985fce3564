use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    BannerWriteRepo, CreateBannerParams, RepoError, UpdateBannerParams,
};
use crate::cache::{CollectionRepo, Partition};
use crate::domain::entities::BannerRecord;
use crate::domain::types::BannerLocation;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct BannerRow {
    id: Uuid,
    location: BannerLocation,
    title: String,
    image_url: String,
    target_url: Option<String>,
    active: bool,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<BannerRow> for BannerRecord {
    fn from(row: BannerRow) -> Self {
        Self {
            id: row.id,
            location: row.location,
            title: row.title,
            image_url: row.image_url,
            target_url: row.target_url,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn location_partition(filter: &[Partition]) -> Option<&str> {
    filter
        .iter()
        .find(|p| p.dimension() == "location")
        .map(|p| p.value())
}

#[async_trait]
impl CollectionRepo<BannerRecord> for PostgresRepositories {
    async fn count(&self, filter: &[Partition]) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM banners WHERE 1=1 ");
        if let Some(location) = location_partition(filter) {
            qb.push(" AND location = ");
            qb.push_bind(location.to_string());
            qb.push("::banner_location");
        }

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        u64::try_from(count).map_err(|e| RepoError::invalid_input(e.to_string()))
    }

    async fn scan(&self, filter: &[Partition]) -> Result<Vec<BannerRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT id, location, title, image_url, target_url, active, created_at, updated_at \
             FROM banners WHERE 1=1 ",
        );
        if let Some(location) = location_partition(filter) {
            qb.push(" AND location = ");
            qb.push_bind(location.to_string());
            qb.push("::banner_location");
        }
        qb.push(" ORDER BY created_at ASC, id ASC");

        let rows = qb
            .build_query_as::<BannerRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(BannerRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<BannerRecord>, RepoError> {
        let row = sqlx::query_as::<_, BannerRow>(
            "SELECT id, location, title, image_url, target_url, active, created_at, updated_at \
             FROM banners WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(BannerRecord::from))
    }
}

#[async_trait]
impl BannerWriteRepo for PostgresRepositories {
    async fn create_banner(&self, params: CreateBannerParams) -> Result<BannerRecord, RepoError> {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, BannerRow>(
            "INSERT INTO banners (id, location, title, image_url, target_url, active, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
             RETURNING id, location, title, image_url, target_url, active, created_at, updated_at",
        )
        .bind(id)
        .bind(params.location)
        .bind(&params.title)
        .bind(&params.image_url)
        .bind(&params.target_url)
        .bind(params.active)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(BannerRecord::from(row))
    }

    async fn update_banner(&self, params: UpdateBannerParams) -> Result<BannerRecord, RepoError> {
        let row = sqlx::query_as::<_, BannerRow>(
            "UPDATE banners \
             SET location = $2, title = $3, image_url = $4, target_url = $5, active = $6, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, location, title, image_url, target_url, active, created_at, updated_at",
        )
        .bind(params.id)
        .bind(params.location)
        .bind(&params.title)
        .bind(&params.image_url)
        .bind(&params.target_url)
        .bind(params.active)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(BannerRecord::from(row))
    }

    async fn delete_banner(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM banners WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(())
    }
}
