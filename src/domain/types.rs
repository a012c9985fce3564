//! Shared domain enums.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Display surface a banner is pinned to; the partition dimension of the
/// banner cache namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "banner_location", rename_all = "snake_case")]
pub enum BannerLocation {
    Home,
    CategoryPage,
    Checkout,
}

impl BannerLocation {
    pub const fn as_str(self) -> &'static str {
        match self {
            BannerLocation::Home => "home",
            BannerLocation::CategoryPage => "category_page",
            BannerLocation::Checkout => "checkout",
        }
    }
}

impl fmt::Display for BannerLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "media_kind", rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banner_location_serde_wire_format() {
        let json = serde_json::to_string(&BannerLocation::CategoryPage).expect("serialize");
        assert_eq!(json, "\"category_page\"");
        let back: BannerLocation = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, BannerLocation::CategoryPage);
    }

    #[test]
    fn display_matches_wire_format() {
        assert_eq!(BannerLocation::Home.to_string(), "home");
        assert_eq!(MediaKind::Video.to_string(), "video");
    }
}
