//! Catalog taxonomy read/mutation paths: categories, subcategories and
//! product types.
//!
//! Subcategories partition by `category_id` and product types by
//! `subcategory_id`; moving an entity between parents invalidates both
//! the old and the new partition's cached scan.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{CacheConfig, CacheEntity, CacheStore, CachedCollection, CollectionRepo};
use crate::domain::entities::{CategoryRecord, ProductTypeRecord, SubcategoryRecord};

use super::repos::{
    CatalogWriteRepo, CreateCategoryParams, CreateProductTypeParams, CreateSubcategoryParams,
    RepoError, UpdateCategoryParams, UpdateProductTypeParams, UpdateSubcategoryParams,
};

pub struct CatalogService<R>
where
    R: CollectionRepo<CategoryRecord>
        + CollectionRepo<SubcategoryRecord>
        + CollectionRepo<ProductTypeRecord>
        + CatalogWriteRepo
        + 'static,
{
    repo: Arc<R>,
    categories: Arc<CachedCollection<CategoryRecord>>,
    subcategories: Arc<CachedCollection<SubcategoryRecord>>,
    product_types: Arc<CachedCollection<ProductTypeRecord>>,
}

impl<R> CatalogService<R>
where
    R: CollectionRepo<CategoryRecord>
        + CollectionRepo<SubcategoryRecord>
        + CollectionRepo<ProductTypeRecord>
        + CatalogWriteRepo
        + 'static,
{
    pub fn new(repo: Arc<R>, store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        let categories = Arc::new(CachedCollection::new(
            Arc::clone(&store),
            repo.clone() as Arc<dyn CollectionRepo<CategoryRecord>>,
            config.clone(),
        ));
        let subcategories = Arc::new(CachedCollection::new(
            Arc::clone(&store),
            repo.clone() as Arc<dyn CollectionRepo<SubcategoryRecord>>,
            config.clone(),
        ));
        let product_types = Arc::new(CachedCollection::new(
            store,
            repo.clone() as Arc<dyn CollectionRepo<ProductTypeRecord>>,
            config,
        ));
        Self {
            repo,
            categories,
            subcategories,
            product_types,
        }
    }

    pub fn category_collection(&self) -> Arc<CachedCollection<CategoryRecord>> {
        Arc::clone(&self.categories)
    }

    pub fn subcategory_collection(&self) -> Arc<CachedCollection<SubcategoryRecord>> {
        Arc::clone(&self.subcategories)
    }

    pub fn product_type_collection(&self) -> Arc<CachedCollection<ProductTypeRecord>> {
        Arc::clone(&self.product_types)
    }

    // ========================================================================
    // Categories
    // ========================================================================

    /// All categories, in display order.
    pub async fn list_categories(&self) -> Result<Vec<CategoryRecord>, RepoError> {
        let mut categories = self.categories.scan(&[]).await?;
        categories.sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        Ok(categories)
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Option<CategoryRecord>, RepoError> {
        self.categories.get(id, &[]).await
    }

    pub async fn create_category(
        &self,
        params: CreateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let category = self.repo.create_category(params).await?;
        self.categories.add(&category).await;
        Ok(category)
    }

    pub async fn update_category(
        &self,
        params: UpdateCategoryParams,
    ) -> Result<CategoryRecord, RepoError> {
        let category = self.repo.update_category(params).await?;
        self.categories.add(&category).await;
        Ok(category)
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<(), RepoError> {
        self.repo.delete_category(id).await?;
        self.categories.remove(id, &[]).await;
        // Children hang off this category; their partition is now gone.
        self.subcategories
            .drop_partition(&[SubcategoryRecord::category_partition(id)])
            .await;
        Ok(())
    }

    // ========================================================================
    // Subcategories
    // ========================================================================

    /// Subcategories of one category, in display order.
    pub async fn list_subcategories(
        &self,
        category_id: Uuid,
    ) -> Result<Vec<SubcategoryRecord>, RepoError> {
        let filter = [SubcategoryRecord::category_partition(category_id)];
        let mut subcategories = self.subcategories.scan(&filter).await?;
        subcategories
            .sort_by(|a, b| a.position.cmp(&b.position).then_with(|| a.name.cmp(&b.name)));
        Ok(subcategories)
    }

    pub async fn get_subcategory(
        &self,
        id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<SubcategoryRecord>, RepoError> {
        self.subcategories
            .get(id, &[SubcategoryRecord::category_partition(category_id)])
            .await
    }

    pub async fn create_subcategory(
        &self,
        params: CreateSubcategoryParams,
    ) -> Result<SubcategoryRecord, RepoError> {
        let subcategory = self.repo.create_subcategory(params).await?;
        self.subcategories.add(&subcategory).await;
        Ok(subcategory)
    }

    /// Update a subcategory, invalidating the old parent's partition when
    /// it moves between categories.
    pub async fn update_subcategory(
        &self,
        params: UpdateSubcategoryParams,
    ) -> Result<SubcategoryRecord, RepoError> {
        let before: SubcategoryRecord = CollectionRepo::<SubcategoryRecord>::find_by_id(
            self.repo.as_ref(),
            params.id,
        )
        .await?
        .ok_or(RepoError::NotFound)?;

        let updated = self.repo.update_subcategory(params).await?;

        if before.category_id != updated.category_id {
            self.subcategories
                .remove(before.id, &before.partitions())
                .await;
        }
        self.subcategories.add(&updated).await;
        Ok(updated)
    }

    pub async fn delete_subcategory(&self, id: Uuid) -> Result<(), RepoError> {
        let before: SubcategoryRecord =
            CollectionRepo::<SubcategoryRecord>::find_by_id(self.repo.as_ref(), id)
                .await?
                .ok_or(RepoError::NotFound)?;
        self.repo.delete_subcategory(id).await?;
        self.subcategories.remove(id, &before.partitions()).await;
        self.product_types
            .drop_partition(&[ProductTypeRecord::subcategory_partition(id)])
            .await;
        Ok(())
    }

    // ========================================================================
    // Product types
    // ========================================================================

    pub async fn list_product_types(
        &self,
        subcategory_id: Uuid,
    ) -> Result<Vec<ProductTypeRecord>, RepoError> {
        let filter = [ProductTypeRecord::subcategory_partition(subcategory_id)];
        let mut product_types = self.product_types.scan(&filter).await?;
        product_types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(product_types)
    }

    pub async fn create_product_type(
        &self,
        params: CreateProductTypeParams,
    ) -> Result<ProductTypeRecord, RepoError> {
        let product_type = self.repo.create_product_type(params).await?;
        self.product_types.add(&product_type).await;
        Ok(product_type)
    }

    pub async fn update_product_type(
        &self,
        params: UpdateProductTypeParams,
    ) -> Result<ProductTypeRecord, RepoError> {
        let before: ProductTypeRecord =
            CollectionRepo::<ProductTypeRecord>::find_by_id(self.repo.as_ref(), params.id)
                .await?
                .ok_or(RepoError::NotFound)?;

        let updated = self.repo.update_product_type(params).await?;

        if before.subcategory_id != updated.subcategory_id {
            self.product_types
                .remove(before.id, &before.partitions())
                .await;
        }
        self.product_types.add(&updated).await;
        Ok(updated)
    }

    pub async fn delete_product_type(&self, id: Uuid) -> Result<(), RepoError> {
        let before: ProductTypeRecord =
            CollectionRepo::<ProductTypeRecord>::find_by_id(self.repo.as_ref(), id)
                .await?
                .ok_or(RepoError::NotFound)?;
        self.repo.delete_product_type(id).await?;
        self.product_types.remove(id, &before.partitions()).await;
        Ok(())
    }

    /// Force-cold the whole catalog cache, e.g. after a bulk import.
    pub async fn drop_cache(&self) -> u64 {
        let mut removed = self.categories.drop_partition(&[]).await;
        removed += self.subcategories.drop_partition(&[]).await;
        removed += self.product_types.drop_partition(&[]).await;
        removed
    }
}
