//! Postgres persistence adapters.
//!
//! One [`PostgresRepositories`] instance wraps the shared connection pool
//! and implements the read ([`crate::cache::CollectionRepo`]) and write
//! traits for every cached entity family. Queries are built at runtime
//! with `QueryBuilder` so partition filters compose.

mod banners;
mod catalog;
mod media;
mod promos;
mod shopper;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use crate::application::repos::RepoError;
use crate::cache::Partition;
use crate::config::DatabaseSettings;

use super::error::InfraError;

pub struct PostgresRepositories {
    pool: PgPool,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Open the shared connection pool.
pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, InfraError> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect(&settings.url)
        .await
        .map_err(|err| InfraError::database(err.to_string()))
}

pub(crate) fn map_sqlx_error(err: sqlx::Error) -> RepoError {
    match err {
        sqlx::Error::RowNotFound => RepoError::NotFound,
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            RepoError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates foreign key constraint")
                || db.message().contains("invalid input syntax") =>
        {
            RepoError::InvalidInput {
                message: db.message().to_string(),
            }
        }
        sqlx::Error::Database(db) if db.message().contains("violates") => RepoError::Integrity {
            message: db.message().to_string(),
        },
        sqlx::Error::Database(db)
            if db
                .message()
                .contains("canceling statement due to user request") =>
        {
            RepoError::Timeout
        }
        other => RepoError::from_persistence(other),
    }
}

/// Pull a UUID-valued partition out of a filter, e.g. `category_id`.
pub(crate) fn uuid_partition(
    filter: &[Partition],
    dimension: &str,
) -> Result<Option<Uuid>, RepoError> {
    filter
        .iter()
        .find(|p| p.dimension() == dimension)
        .map(|p| {
            Uuid::parse_str(p.value()).map_err(|err| {
                RepoError::invalid_input(format!("bad {dimension} partition value: {err}"))
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uuid_partition_parses_and_rejects() {
        let id = Uuid::new_v4();
        let filter = vec![Partition::new("category_id", id.to_string())];
        assert_eq!(
            uuid_partition(&filter, "category_id").expect("valid uuid"),
            Some(id)
        );
        assert_eq!(uuid_partition(&filter, "user_id").expect("absent"), None);

        let bad = vec![Partition::new("category_id", "not-a-uuid")];
        assert!(uuid_partition(&bad, "category_id").is_err());
    }
}
