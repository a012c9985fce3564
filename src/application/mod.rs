//! Application services: the read paths over the cached collections and
//! the mutation paths that keep the cache consistent with the store.

pub mod banners;
pub mod catalog;
pub mod promo;
pub mod repos;
pub mod shopper;

pub use banners::BannerService;
pub use catalog::CatalogService;
pub use promo::PromoService;
pub use shopper::ShopperService;
