//! Media items and users: read-side adapters only. Their mutation
//! surfaces live outside this subsystem.

use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::cache::{CollectionRepo, Partition};
use crate::domain::entities::{MediaItemRecord, UserRecord};
use crate::domain::types::MediaKind;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct MediaItemRow {
    id: Uuid,
    kind: MediaKind,
    url: String,
    alt_text: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<MediaItemRow> for MediaItemRecord {
    fn from(row: MediaItemRow) -> Self {
        Self {
            id: row.id,
            kind: row.kind,
            url: row.url,
            alt_text: row.alt_text,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    display_name: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            display_name: row.display_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CollectionRepo<MediaItemRecord> for PostgresRepositories {
    async fn count(&self, _filter: &[Partition]) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM media_items")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|e| RepoError::invalid_input(e.to_string()))
    }

    async fn scan(&self, _filter: &[Partition]) -> Result<Vec<MediaItemRecord>, RepoError> {
        let rows = sqlx::query_as::<_, MediaItemRow>(
            "SELECT id, kind, url, alt_text, created_at, updated_at \
             FROM media_items ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(MediaItemRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<MediaItemRecord>, RepoError> {
        let row = sqlx::query_as::<_, MediaItemRow>(
            "SELECT id, kind, url, alt_text, created_at, updated_at \
             FROM media_items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(MediaItemRecord::from))
    }
}

#[async_trait]
impl CollectionRepo<UserRecord> for PostgresRepositories {
    async fn count(&self, _filter: &[Partition]) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|e| RepoError::invalid_input(e.to_string()))
    }

    async fn scan(&self, _filter: &[Partition]) -> Result<Vec<UserRecord>, RepoError> {
        let rows = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, created_at, updated_at \
             FROM users ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, display_name, created_at, updated_at \
             FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }
}
