//! Cache key construction.
//!
//! Every cached entity lives under a deterministic key of the form
//! `namespace:dim=value:...:id`. The mapping is a pure function of the
//! entity's identity plus its partition values, so any process computing
//! the key for the same entity agrees. `pattern` is the inverse: a glob
//! that matches exactly the keys of one namespace, optionally narrowed
//! to a partition.

use std::fmt;

use uuid::Uuid;

/// Logical grouping for one cached entity family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Banner,
    Category,
    Subcategory,
    ProductType,
    MediaItem,
    User,
    CartLine,
    WishlistLine,
}

impl Namespace {
    /// Stable wire prefix for keys in this namespace.
    pub const fn prefix(self) -> &'static str {
        match self {
            Namespace::Banner => "banner",
            Namespace::Category => "category",
            Namespace::Subcategory => "subcategory",
            Namespace::ProductType => "product_type",
            Namespace::MediaItem => "media_item",
            Namespace::User => "user",
            Namespace::CartLine => "cart_line",
            Namespace::WishlistLine => "wishlist_line",
        }
    }

    /// Partition dimensions for this namespace, in key-segment order.
    pub const fn dimensions(self) -> &'static [&'static str] {
        match self {
            Namespace::Banner => &["location"],
            Namespace::Subcategory => &["category_id"],
            Namespace::ProductType => &["subcategory_id"],
            Namespace::CartLine | Namespace::WishlistLine => &["user_id"],
            Namespace::Category | Namespace::MediaItem | Namespace::User => &[],
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// One partition dimension/value pair narrowing a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    dimension: &'static str,
    value: String,
}

impl Partition {
    pub fn new(dimension: &'static str, value: impl Into<String>) -> Self {
        Self {
            dimension,
            value: value.into(),
        }
    }

    pub fn dimension(&self) -> &'static str {
        self.dimension
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

fn partition_value<'a>(partitions: &'a [Partition], dimension: &str) -> Option<&'a str> {
    partitions
        .iter()
        .find(|p| p.dimension == dimension)
        .map(|p| p.value.as_str())
}

/// Build the cache key for one entity.
pub fn key(namespace: Namespace, partitions: &[Partition], id: Uuid) -> String {
    let mut out = String::from(namespace.prefix());
    for dimension in namespace.dimensions() {
        out.push(':');
        out.push_str(dimension);
        out.push('=');
        out.push_str(partition_value(partitions, dimension).unwrap_or("*"));
    }
    out.push(':');
    out.push_str(&id.to_string());
    out
}

/// Build the glob pattern matching every key of a namespace, narrowed to
/// the supplied partition values. Unfiltered dimensions match any value.
pub fn pattern(namespace: Namespace, partitions: &[Partition]) -> String {
    let mut out = String::from(namespace.prefix());
    for dimension in namespace.dimensions() {
        out.push(':');
        out.push_str(dimension);
        out.push('=');
        out.push_str(partition_value(partitions, dimension).unwrap_or("*"));
    }
    out.push_str(":*");
    out
}

/// Glob matching over cache keys. Supports `*` (any run of characters);
/// this is the subset of Redis `MATCH` syntax the key scheme emits.
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let c: Vec<char> = candidate.chars().collect();

    // Iterative wildcard match with single-star backtracking.
    let (mut pi, mut ci) = (0usize, 0usize);
    let (mut star, mut mark) = (None::<usize>, 0usize);

    while ci < c.len() {
        if pi < p.len() && p[pi] != '*' && p[pi] == c[ci] {
            pi += 1;
            ci += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some(pi);
            mark = ci;
            pi += 1;
        } else if let Some(s) = star {
            pi = s + 1;
            mark += 1;
            ci = mark;
        } else {
            return false;
        }
    }
    while pi < p.len() && p[pi] == '*' {
        pi += 1;
    }
    pi == p.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_without_partitions() {
        let id = Uuid::nil();
        assert_eq!(key(Namespace::Category, &[], id), format!("category:{id}"));
    }

    #[test]
    fn key_with_partition() {
        let id = Uuid::nil();
        let partitions = vec![Partition::new("location", "home")];
        assert_eq!(
            key(Namespace::Banner, &partitions, id),
            format!("banner:location=home:{id}")
        );
    }

    #[test]
    fn keys_are_injective_across_partitions() {
        let id = Uuid::new_v4();
        let home = key(Namespace::Banner, &[Partition::new("location", "home")], id);
        let checkout = key(
            Namespace::Banner,
            &[Partition::new("location", "checkout")],
            id,
        );
        assert_ne!(home, checkout);
    }

    #[test]
    fn pattern_matches_own_keys_only() {
        let id = Uuid::new_v4();
        let home_key = key(Namespace::Banner, &[Partition::new("location", "home")], id);
        let checkout_key = key(
            Namespace::Banner,
            &[Partition::new("location", "checkout")],
            id,
        );

        let home_pattern = pattern(Namespace::Banner, &[Partition::new("location", "home")]);
        assert!(glob_match(&home_pattern, &home_key));
        assert!(!glob_match(&home_pattern, &checkout_key));

        let all_pattern = pattern(Namespace::Banner, &[]);
        assert!(glob_match(&all_pattern, &home_key));
        assert!(glob_match(&all_pattern, &checkout_key));
    }

    #[test]
    fn namespace_pattern_does_not_leak_into_other_namespaces() {
        let id = Uuid::new_v4();
        let category_key = key(Namespace::Category, &[], id);
        let user_key = key(Namespace::User, &[], id);
        let p = pattern(Namespace::Category, &[]);
        assert!(glob_match(&p, &category_key));
        assert!(!glob_match(&p, &user_key));
    }

    #[test]
    fn glob_match_edge_cases() {
        assert!(glob_match("*", "anything"));
        assert!(glob_match("a*c", "abc"));
        assert!(glob_match("a*c", "ac"));
        assert!(!glob_match("a*c", "ab"));
        assert!(glob_match("banner:location=*:*", "banner:location=home:1234"));
        assert!(!glob_match("banner:location=home:*", "banner"));
    }
}
