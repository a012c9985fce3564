//! Repository traits describing persistence adapters.
//!
//! Read access for the cached families goes through
//! [`crate::cache::CollectionRepo`]; the traits here cover the write
//! surface the mutation paths use. Repository errors are fatal to the
//! current request, since the relational store is the only source of
//! truth and has no fallback.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{
    BannerRecord, CartLineRecord, CategoryRecord, ProductTypeRecord, PromoBannerRecord,
    SubcategoryRecord, WishlistLineRecord,
};
use crate::domain::types::BannerLocation;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateBannerParams {
    pub location: BannerLocation,
    pub title: String,
    pub image_url: String,
    pub target_url: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateBannerParams {
    pub id: Uuid,
    pub location: BannerLocation,
    pub title: String,
    pub image_url: String,
    pub target_url: Option<String>,
    pub active: bool,
}

#[async_trait]
pub trait BannerWriteRepo: Send + Sync {
    async fn create_banner(&self, params: CreateBannerParams) -> Result<BannerRecord, RepoError>;

    async fn update_banner(&self, params: UpdateBannerParams) -> Result<BannerRecord, RepoError>;

    async fn delete_banner(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct CreateCategoryParams {
    pub name: String,
    pub slug: String,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateCategoryParams {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct CreateSubcategoryParams {
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct UpdateSubcategoryParams {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub position: i32,
}

#[derive(Debug, Clone)]
pub struct CreateProductTypeParams {
    pub subcategory_id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct UpdateProductTypeParams {
    pub id: Uuid,
    pub subcategory_id: Uuid,
    pub name: String,
    pub slug: String,
}

#[async_trait]
pub trait CatalogWriteRepo: Send + Sync {
    async fn create_category(&self, params: CreateCategoryParams)
    -> Result<CategoryRecord, RepoError>;

    async fn update_category(&self, params: UpdateCategoryParams)
    -> Result<CategoryRecord, RepoError>;

    async fn delete_category(&self, id: Uuid) -> Result<(), RepoError>;

    async fn create_subcategory(
        &self,
        params: CreateSubcategoryParams,
    ) -> Result<SubcategoryRecord, RepoError>;

    async fn update_subcategory(
        &self,
        params: UpdateSubcategoryParams,
    ) -> Result<SubcategoryRecord, RepoError>;

    async fn delete_subcategory(&self, id: Uuid) -> Result<(), RepoError>;

    async fn create_product_type(
        &self,
        params: CreateProductTypeParams,
    ) -> Result<ProductTypeRecord, RepoError>;

    async fn update_product_type(
        &self,
        params: UpdateProductTypeParams,
    ) -> Result<ProductTypeRecord, RepoError>;

    async fn delete_product_type(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone, Copy)]
pub struct AddCartLineParams {
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
}

#[derive(Debug, Clone, Copy)]
pub struct UpdateCartLineParams {
    pub id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy)]
pub struct AddWishlistLineParams {
    pub user_id: Uuid,
    pub product_id: Uuid,
}

#[async_trait]
pub trait ShopperWriteRepo: Send + Sync {
    async fn add_cart_line(&self, params: AddCartLineParams) -> Result<CartLineRecord, RepoError>;

    async fn update_cart_line(
        &self,
        params: UpdateCartLineParams,
    ) -> Result<CartLineRecord, RepoError>;

    async fn delete_cart_line(&self, id: Uuid) -> Result<(), RepoError>;

    /// Remove every cart line for one user, returning how many rows went.
    async fn clear_cart(&self, user_id: Uuid) -> Result<u64, RepoError>;

    async fn add_wishlist_line(
        &self,
        params: AddWishlistLineParams,
    ) -> Result<WishlistLineRecord, RepoError>;

    async fn delete_wishlist_line(&self, id: Uuid) -> Result<(), RepoError>;
}

#[derive(Debug, Clone)]
pub struct UpsertPromoBannerParams {
    pub id: Option<Uuid>,
    pub headline: String,
    pub body: String,
    pub starts_at: time::OffsetDateTime,
    pub ends_at: time::OffsetDateTime,
}

#[async_trait]
pub trait PromoRepo: Send + Sync {
    /// Promotions whose window covers the current instant.
    async fn list_active_promos(&self) -> Result<Vec<PromoBannerRecord>, RepoError>;

    async fn upsert_promo(
        &self,
        params: UpsertPromoBannerParams,
    ) -> Result<PromoBannerRecord, RepoError>;

    async fn delete_promo(&self, id: Uuid) -> Result<(), RepoError>;
}
