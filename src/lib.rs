//! Bancarella: the cache reconciliation layer of a marketplace storefront.
//!
//! Reads go through a cache-aside layer in front of the relational store.
//! Collection reads are verified by count reconciliation: the repository
//! row count for a partition is compared against the number of matching
//! cache keys, and any disagreement triggers a partition rebuild. A cache
//! that is unreachable or slow degrades to a miss; it never fails a read.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
