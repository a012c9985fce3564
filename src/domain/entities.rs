//! Domain entity records mirrored from persistent storage, with their
//! cache namespace bindings.
//!
//! Each record carries a repository-assigned `id` that never changes.
//! Partition attributes (`location`, `category_id`, ...) may change on
//! update; mutation paths must invalidate both the old and new
//! partition's cached scan when they do.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::cache::{CacheEntity, Namespace, Partition};
use crate::domain::types::{BannerLocation, MediaKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BannerRecord {
    pub id: Uuid,
    pub location: BannerLocation,
    pub title: String,
    pub image_url: String,
    pub target_url: Option<String>,
    pub active: bool,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl BannerRecord {
    pub fn location_partition(location: BannerLocation) -> Partition {
        Partition::new("location", location.as_str())
    }
}

impl CacheEntity for BannerRecord {
    const NAMESPACE: Namespace = Namespace::Banner;

    fn id(&self) -> Uuid {
        self.id
    }

    fn partitions(&self) -> Vec<Partition> {
        vec![Self::location_partition(self.location)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
    pub position: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CacheEntity for CategoryRecord {
    const NAMESPACE: Namespace = Namespace::Category;

    fn id(&self) -> Uuid {
        self.id
    }

    fn partitions(&self) -> Vec<Partition> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubcategoryRecord {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub slug: String,
    pub position: i32,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl SubcategoryRecord {
    pub fn category_partition(category_id: Uuid) -> Partition {
        Partition::new("category_id", category_id.to_string())
    }
}

impl CacheEntity for SubcategoryRecord {
    const NAMESPACE: Namespace = Namespace::Subcategory;

    fn id(&self) -> Uuid {
        self.id
    }

    fn partitions(&self) -> Vec<Partition> {
        vec![Self::category_partition(self.category_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductTypeRecord {
    pub id: Uuid,
    pub subcategory_id: Uuid,
    pub name: String,
    pub slug: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl ProductTypeRecord {
    pub fn subcategory_partition(subcategory_id: Uuid) -> Partition {
        Partition::new("subcategory_id", subcategory_id.to_string())
    }
}

impl CacheEntity for ProductTypeRecord {
    const NAMESPACE: Namespace = Namespace::ProductType;

    fn id(&self) -> Uuid {
        self.id
    }

    fn partitions(&self) -> Vec<Partition> {
        vec![Self::subcategory_partition(self.subcategory_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItemRecord {
    pub id: Uuid,
    pub kind: MediaKind,
    pub url: String,
    pub alt_text: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CacheEntity for MediaItemRecord {
    const NAMESPACE: Namespace = Namespace::MediaItem;

    fn id(&self) -> Uuid {
        self.id
    }

    fn partitions(&self) -> Vec<Partition> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub email: String,
    pub display_name: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CacheEntity for UserRecord {
    const NAMESPACE: Namespace = Namespace::User;

    fn id(&self) -> Uuid {
        self.id
    }

    fn partitions(&self) -> Vec<Partition> {
        Vec::new()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price_cents: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl CartLineRecord {
    pub fn user_partition(user_id: Uuid) -> Partition {
        Partition::new("user_id", user_id.to_string())
    }
}

impl CacheEntity for CartLineRecord {
    const NAMESPACE: Namespace = Namespace::CartLine;

    fn id(&self) -> Uuid {
        self.id
    }

    fn partitions(&self) -> Vec<Partition> {
        vec![Self::user_partition(self.user_id)]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistLineRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl WishlistLineRecord {
    pub fn user_partition(user_id: Uuid) -> Partition {
        Partition::new("user_id", user_id.to_string())
    }
}

impl CacheEntity for WishlistLineRecord {
    const NAMESPACE: Namespace = Namespace::WishlistLine;

    fn id(&self) -> Uuid {
        self.id
    }

    fn partitions(&self) -> Vec<Partition> {
        vec![Self::user_partition(self.user_id)]
    }
}

/// Promotional banner served through the process-local flavor; not part
/// of the shared reconciled cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoBannerRecord {
    pub id: Uuid,
    pub headline: String,
    pub body: String,
    pub starts_at: OffsetDateTime,
    pub ends_at: OffsetDateTime,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::keys;

    #[test]
    fn banner_key_follows_its_partition() {
        let now = OffsetDateTime::now_utc();
        let banner = BannerRecord {
            id: Uuid::new_v4(),
            location: BannerLocation::Home,
            title: "Summer sale".into(),
            image_url: "https://cdn.example/summer.webp".into(),
            target_url: None,
            active: true,
            created_at: now,
            updated_at: now,
        };
        let key = keys::key(BannerRecord::NAMESPACE, &banner.partitions(), banner.id());
        assert_eq!(key, format!("banner:location=home:{}", banner.id));
    }

    #[test]
    fn record_json_roundtrip() {
        let now = OffsetDateTime::now_utc();
        let line = CartLineRecord {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            quantity: 2,
            unit_price_cents: 1999,
            created_at: now,
            updated_at: now,
        };
        let raw = serde_json::to_string(&line).expect("serialize");
        let back: CartLineRecord = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(back, line);
    }
}
