//! Infrastructure adapters: telemetry, Postgres persistence, errors.

pub mod db;
pub mod error;
pub mod telemetry;

pub use error::InfraError;
