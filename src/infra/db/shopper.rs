//! Cart and wishlist tables, filtered per user.

use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    AddCartLineParams, AddWishlistLineParams, RepoError, ShopperWriteRepo, UpdateCartLineParams,
};
use crate::cache::{CollectionRepo, Partition};
use crate::domain::entities::{CartLineRecord, WishlistLineRecord};

use super::{PostgresRepositories, map_sqlx_error, uuid_partition};

#[derive(sqlx::FromRow)]
struct CartLineRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    unit_price_cents: i64,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CartLineRow> for CartLineRecord {
    fn from(row: CartLineRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            unit_price_cents: row.unit_price_cents,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct WishlistLineRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<WishlistLineRow> for WishlistLineRecord {
    fn from(row: WishlistLineRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CollectionRepo<CartLineRecord> for PostgresRepositories {
    async fn count(&self, filter: &[Partition]) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM cart_lines WHERE 1=1 ");
        if let Some(user_id) = uuid_partition(filter, "user_id")? {
            qb.push(" AND user_id = ");
            qb.push_bind(user_id);
        }

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|e| RepoError::invalid_input(e.to_string()))
    }

    async fn scan(&self, filter: &[Partition]) -> Result<Vec<CartLineRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT id, user_id, product_id, quantity, unit_price_cents, created_at, updated_at \
             FROM cart_lines WHERE 1=1 ",
        );
        if let Some(user_id) = uuid_partition(filter, "user_id")? {
            qb.push(" AND user_id = ");
            qb.push_bind(user_id);
        }
        qb.push(" ORDER BY created_at ASC, id ASC");

        let rows = qb
            .build_query_as::<CartLineRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CartLineRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CartLineRecord>, RepoError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            "SELECT id, user_id, product_id, quantity, unit_price_cents, created_at, updated_at \
             FROM cart_lines WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CartLineRecord::from))
    }
}

#[async_trait]
impl CollectionRepo<WishlistLineRecord> for PostgresRepositories {
    async fn count(&self, filter: &[Partition]) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM wishlist_lines WHERE 1=1 ");
        if let Some(user_id) = uuid_partition(filter, "user_id")? {
            qb.push(" AND user_id = ");
            qb.push_bind(user_id);
        }

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|e| RepoError::invalid_input(e.to_string()))
    }

    async fn scan(&self, filter: &[Partition]) -> Result<Vec<WishlistLineRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT id, user_id, product_id, created_at, updated_at \
             FROM wishlist_lines WHERE 1=1 ",
        );
        if let Some(user_id) = uuid_partition(filter, "user_id")? {
            qb.push(" AND user_id = ");
            qb.push_bind(user_id);
        }
        qb.push(" ORDER BY created_at ASC, id ASC");

        let rows = qb
            .build_query_as::<WishlistLineRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(WishlistLineRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<WishlistLineRecord>, RepoError> {
        let row = sqlx::query_as::<_, WishlistLineRow>(
            "SELECT id, user_id, product_id, created_at, updated_at \
             FROM wishlist_lines WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(WishlistLineRecord::from))
    }
}

#[async_trait]
impl ShopperWriteRepo for PostgresRepositories {
    async fn add_cart_line(&self, params: AddCartLineParams) -> Result<CartLineRecord, RepoError> {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, CartLineRow>(
            "INSERT INTO cart_lines (id, user_id, product_id, quantity, unit_price_cents, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             ON CONFLICT (user_id, product_id) \
             DO UPDATE SET quantity = cart_lines.quantity + EXCLUDED.quantity, updated_at = EXCLUDED.updated_at \
             RETURNING id, user_id, product_id, quantity, unit_price_cents, created_at, updated_at",
        )
        .bind(id)
        .bind(params.user_id)
        .bind(params.product_id)
        .bind(params.quantity)
        .bind(params.unit_price_cents)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CartLineRecord::from(row))
    }

    async fn update_cart_line(
        &self,
        params: UpdateCartLineParams,
    ) -> Result<CartLineRecord, RepoError> {
        let row = sqlx::query_as::<_, CartLineRow>(
            "UPDATE cart_lines SET quantity = $2, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, user_id, product_id, quantity, unit_price_cents, created_at, updated_at",
        )
        .bind(params.id)
        .bind(params.quantity)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CartLineRecord::from(row))
    }

    async fn delete_cart_line(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM cart_lines WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn clear_cart(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let result = sqlx::query("DELETE FROM cart_lines WHERE user_id = $1")
            .bind(user_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected())
    }

    async fn add_wishlist_line(
        &self,
        params: AddWishlistLineParams,
    ) -> Result<WishlistLineRecord, RepoError> {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, WishlistLineRow>(
            "INSERT INTO wishlist_lines (id, user_id, product_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (user_id, product_id) DO UPDATE SET updated_at = EXCLUDED.updated_at \
             RETURNING id, user_id, product_id, created_at, updated_at",
        )
        .bind(id)
        .bind(params.user_id)
        .bind(params.product_id)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(WishlistLineRecord::from(row))
    }

    async fn delete_wishlist_line(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM wishlist_lines WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
