//! Persistence port for airport records.
//!
//! The ingestion pipeline talks to an [`AirportStore`] and never to a
//! concrete database: [`sqlite::SqliteStore`] backs the service, while
//! [`memory::MemoryStore`] is a swappable in-memory implementation used in
//! tests and local experiments.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use thiserror::Error;

/// Result type alias for store operations
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Errors surfaced by a persistence backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Durable airport record. `iata_code` is the identity key; the remaining
/// attributes are replaced on every upsert sharing the same code.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Airport {
    pub name: String,
    pub city: String,
    pub country: String,
    pub iata_code: String,
}

/// Contract between the ingestion pipeline and a persistence backend.
///
/// `upsert` is an idempotent overwrite keyed by `iata_code` and must be safe
/// to call from concurrent requests. Each call commits independently; the
/// pipeline never requires a transaction spanning more than one record.
#[async_trait]
pub trait AirportStore: Send + Sync {
    async fn upsert(&self, airport: Airport) -> Result<()>;

    /// Cheap liveness check used by the readiness probe.
    async fn ping(&self) -> Result<()>;
}
