//! Catalog taxonomy tables: categories, subcategories, product types.

use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CatalogWriteRepo, CreateCategoryParams, CreateProductTypeParams, CreateSubcategoryParams,
    RepoError, UpdateCategoryParams, UpdateProductTypeParams, UpdateSubcategoryParams,
};
use crate::cache::{CollectionRepo, Partition};
use crate::domain::entities::{CategoryRecord, ProductTypeRecord, SubcategoryRecord};

use super::{PostgresRepositories, map_sqlx_error, uuid_partition};

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    position: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<CategoryRow> for CategoryRecord {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct SubcategoryRow {
    id: Uuid,
    category_id: Uuid,
    name: String,
    slug: String,
    position: i32,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<SubcategoryRow> for SubcategoryRecord {
    fn from(row: SubcategoryRow) -> Self {
        Self {
            id: row.id,
            category_id: row.category_id,
            name: row.name,
            slug: row.slug,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProductTypeRow {
    id: Uuid,
    subcategory_id: Uuid,
    name: String,
    slug: String,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl From<ProductTypeRow> for ProductTypeRecord {
    fn from(row: ProductTypeRow) -> Self {
        Self {
            id: row.id,
            subcategory_id: row.subcategory_id,
            name: row.name,
            slug: row.slug,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl CollectionRepo<CategoryRecord> for PostgresRepositories {
    async fn count(&self, _filter: &[Partition]) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM categories")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|e| RepoError::invalid_input(e.to_string()))
    }

    async fn scan(&self, _filter: &[Partition]) -> Result<Vec<CategoryRecord>, RepoError> {
        let rows = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, position, created_at, updated_at \
             FROM categories ORDER BY created_at ASC, id ASC",
        )
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CategoryRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "SELECT id, name, slug, position, created_at, updated_at \
             FROM categories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(CategoryRecord::from))
    }
}

#[async_trait]
impl CollectionRepo<SubcategoryRecord> for PostgresRepositories {
    async fn count(&self, filter: &[Partition]) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM subcategories WHERE 1=1 ");
        if let Some(category_id) = uuid_partition(filter, "category_id")? {
            qb.push(" AND category_id = ");
            qb.push_bind(category_id);
        }

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|e| RepoError::invalid_input(e.to_string()))
    }

    async fn scan(&self, filter: &[Partition]) -> Result<Vec<SubcategoryRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT id, category_id, name, slug, position, created_at, updated_at \
             FROM subcategories WHERE 1=1 ",
        );
        if let Some(category_id) = uuid_partition(filter, "category_id")? {
            qb.push(" AND category_id = ");
            qb.push_bind(category_id);
        }
        qb.push(" ORDER BY created_at ASC, id ASC");

        let rows = qb
            .build_query_as::<SubcategoryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(SubcategoryRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubcategoryRecord>, RepoError> {
        let row = sqlx::query_as::<_, SubcategoryRow>(
            "SELECT id, category_id, name, slug, position, created_at, updated_at \
             FROM subcategories WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(SubcategoryRecord::from))
    }
}

#[async_trait]
impl CollectionRepo<ProductTypeRecord> for PostgresRepositories {
    async fn count(&self, filter: &[Partition]) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM product_types WHERE 1=1 ");
        if let Some(subcategory_id) = uuid_partition(filter, "subcategory_id")? {
            qb.push(" AND subcategory_id = ");
            qb.push_bind(subcategory_id);
        }

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        u64::try_from(count).map_err(|e| RepoError::invalid_input(e.to_string()))
    }

    async fn scan(&self, filter: &[Partition]) -> Result<Vec<ProductTypeRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT id, subcategory_id, name, slug, created_at, updated_at \
             FROM product_types WHERE 1=1 ",
        );
        if let Some(subcategory_id) = uuid_partition(filter, "subcategory_id")? {
            qb.push(" AND subcategory_id = ");
            qb.push_bind(subcategory_id);
        }
        qb.push(" ORDER BY created_at ASC, id ASC");

        let rows = qb
            .build_query_as::<ProductTypeRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProductTypeRecord::from).collect())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProductTypeRecord>, RepoError> {
        let row = sqlx::query_as::<_, ProductTypeRow>(
            "SELECT id, subcategory_id, name, slug, created_at, updated_at \
             FROM product_types WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProductTypeRecord::from))
    }
}

#[async_trait]
impl CatalogWriteRepo for PostgresRepositories {
    async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, CategoryRow>(
            "INSERT INTO categories (id, name, slug, position, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING id, name, slug, position, created_at, updated_at",
        )
        .bind(id)
        .bind(&params.name)
        .bind(&params.slug)
        .bind(params.position)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CategoryRecord::from(row))
    }

    async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let row = sqlx::query_as::<_, CategoryRow>(
            "UPDATE categories SET name = $2, slug = $3, position = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, name, slug, position, created_at, updated_at",
        )
        .bind(params.id)
        .bind(&params.name)
        .bind(&params.slug)
        .bind(params.position)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(CategoryRecord::from(row))
    }

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn create_subcategory(
        &self,
        params: CreateSubcategoryParams,
    ) -> Result<SubcategoryRecord, RepoError> {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, SubcategoryRow>(
            "INSERT INTO subcategories (id, category_id, name, slug, position, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) \
             RETURNING id, category_id, name, slug, position, created_at, updated_at",
        )
        .bind(id)
        .bind(params.category_id)
        .bind(&params.name)
        .bind(&params.slug)
        .bind(params.position)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubcategoryRecord::from(row))
    }

    async fn update_subcategory(
        &self,
        params: UpdateSubcategoryParams,
    ) -> Result<SubcategoryRecord, RepoError> {
        let row = sqlx::query_as::<_, SubcategoryRow>(
            "UPDATE subcategories \
             SET category_id = $2, name = $3, slug = $4, position = $5, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, category_id, name, slug, position, created_at, updated_at",
        )
        .bind(params.id)
        .bind(params.category_id)
        .bind(&params.name)
        .bind(&params.slug)
        .bind(params.position)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SubcategoryRecord::from(row))
    }

    async fn delete_subcategory(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM subcategories WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn create_product_type(
        &self,
        params: CreateProductTypeParams,
    ) -> Result<ProductTypeRecord, RepoError> {
        let id = Uuid::new_v4();
        let now = OffsetDateTime::now_utc();

        let row = sqlx::query_as::<_, ProductTypeRow>(
            "INSERT INTO product_types (id, subcategory_id, name, slug, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) \
             RETURNING id, subcategory_id, name, slug, created_at, updated_at",
        )
        .bind(id)
        .bind(params.subcategory_id)
        .bind(&params.name)
        .bind(&params.slug)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProductTypeRecord::from(row))
    }

    async fn update_product_type(
        &self,
        params: UpdateProductTypeParams,
    ) -> Result<ProductTypeRecord, RepoError> {
        let row = sqlx::query_as::<_, ProductTypeRow>(
            "UPDATE product_types \
             SET subcategory_id = $2, name = $3, slug = $4, updated_at = now() \
             WHERE id = $1 \
             RETURNING id, subcategory_id, name, slug, created_at, updated_at",
        )
        .bind(params.id)
        .bind(params.subcategory_id)
        .bind(&params.name)
        .bind(&params.slug)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(ProductTypeRecord::from(row))
    }

    async fn delete_product_type(&self, id: Uuid) -> Result<(), RepoError> {
        sqlx::query("DELETE FROM product_types WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }
}
