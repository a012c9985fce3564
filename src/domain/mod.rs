//! Domain records and shared types for the cached entity families.

pub mod entities;
pub mod types;
