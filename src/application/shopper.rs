//! Cart and wishlist read/mutation paths, partitioned per user.

use std::sync::Arc;

use uuid::Uuid;

use crate::cache::{CacheConfig, CacheEntity, CacheStore, CachedCollection, CollectionRepo};
use crate::domain::entities::{CartLineRecord, WishlistLineRecord};

use super::repos::{
    AddCartLineParams, AddWishlistLineParams, RepoError, ShopperWriteRepo, UpdateCartLineParams,
};

pub struct ShopperService<R>
where
    R: CollectionRepo<CartLineRecord>
        + CollectionRepo<WishlistLineRecord>
        + ShopperWriteRepo
        + 'static,
{
    repo: Arc<R>,
    cart_lines: Arc<CachedCollection<CartLineRecord>>,
    wishlist_lines: Arc<CachedCollection<WishlistLineRecord>>,
}

impl<R> ShopperService<R>
where
    R: CollectionRepo<CartLineRecord>
        + CollectionRepo<WishlistLineRecord>
        + ShopperWriteRepo
        + 'static,
{
    pub fn new(repo: Arc<R>, store: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        let cart_lines = Arc::new(CachedCollection::new(
            Arc::clone(&store),
            repo.clone() as Arc<dyn CollectionRepo<CartLineRecord>>,
            config.clone(),
        ));
        let wishlist_lines = Arc::new(CachedCollection::new(
            store,
            repo.clone() as Arc<dyn CollectionRepo<WishlistLineRecord>>,
            config,
        ));
        Self {
            repo,
            cart_lines,
            wishlist_lines,
        }
    }

    /// Cart contents for one user, oldest line first.
    pub async fn cart(&self, user_id: Uuid) -> Result<Vec<CartLineRecord>, RepoError> {
        let filter = [CartLineRecord::user_partition(user_id)];
        let mut lines = self.cart_lines.scan(&filter).await?;
        lines.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(lines)
    }

    pub async fn add_to_cart(&self, params: AddCartLineParams) -> Result<CartLineRecord, RepoError> {
        let line = self.repo.add_cart_line(params).await?;
        self.cart_lines.add(&line).await;
        Ok(line)
    }

    /// Quantity changes never move a line between users, so the existing
    /// key is simply overwritten.
    pub async fn update_cart_line(
        &self,
        params: UpdateCartLineParams,
    ) -> Result<CartLineRecord, RepoError> {
        let line = self.repo.update_cart_line(params).await?;
        self.cart_lines.add(&line).await;
        Ok(line)
    }

    pub async fn remove_from_cart(&self, id: Uuid) -> Result<(), RepoError> {
        let before: CartLineRecord =
            CollectionRepo::<CartLineRecord>::find_by_id(self.repo.as_ref(), id)
                .await?
                .ok_or(RepoError::NotFound)?;
        self.repo.delete_cart_line(id).await?;
        self.cart_lines.remove(id, &before.partitions()).await;
        Ok(())
    }

    /// Empty a cart: delete the rows, then drop the user's whole cache
    /// partition in one sweep.
    pub async fn clear_cart(&self, user_id: Uuid) -> Result<u64, RepoError> {
        let removed = self.repo.clear_cart(user_id).await?;
        self.cart_lines
            .drop_partition(&[CartLineRecord::user_partition(user_id)])
            .await;
        Ok(removed)
    }

    /// Wishlist for one user, newest line first.
    pub async fn wishlist(&self, user_id: Uuid) -> Result<Vec<WishlistLineRecord>, RepoError> {
        let filter = [WishlistLineRecord::user_partition(user_id)];
        let mut lines = self.wishlist_lines.scan(&filter).await?;
        lines.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(lines)
    }

    pub async fn add_to_wishlist(
        &self,
        params: AddWishlistLineParams,
    ) -> Result<WishlistLineRecord, RepoError> {
        let line = self.repo.add_wishlist_line(params).await?;
        self.wishlist_lines.add(&line).await;
        Ok(line)
    }

    pub async fn remove_from_wishlist(&self, id: Uuid) -> Result<(), RepoError> {
        let before: WishlistLineRecord =
            CollectionRepo::<WishlistLineRecord>::find_by_id(self.repo.as_ref(), id)
                .await?
                .ok_or(RepoError::NotFound)?;
        self.repo.delete_wishlist_line(id).await?;
        self.wishlist_lines.remove(id, &before.partitions()).await;
        Ok(())
    }
}
