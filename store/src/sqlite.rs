//! SQLite-backed [`AirportStore`].

use crate::{Airport, AirportStore, Result, StoreError};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS airports (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    city TEXT NOT NULL,
    country TEXT NOT NULL,
    iata_code TEXT NOT NULL UNIQUE
);
";

const UPSERT: &str = "
INSERT INTO airports (name, city, country, iata_code)
VALUES (?1, ?2, ?3, ?4)
ON CONFLICT (iata_code) DO UPDATE
SET name = excluded.name, city = excluded.city, country = excluded.country
";

/// Store backed by a single SQLite connection in WAL mode.
///
/// rusqlite is synchronous, so trait calls take the connection lock on the
/// blocking pool and the async caller only awaits the join handle. One
/// upsert is one implicit transaction; concurrent requests serialize on the
/// connection lock.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::setup(Connection::open(path).map_err(into_store_err)?)
    }

    /// Private in-memory database, one per store instance.
    pub fn open_in_memory() -> Result<Self> {
        Self::setup(Connection::open_in_memory().map_err(into_store_err)?)
    }

    fn setup(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(into_store_err)?;
        conn.busy_timeout(BUSY_TIMEOUT).map_err(into_store_err)?;
        conn.execute_batch(SCHEMA).map_err(into_store_err)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Looks up one record by IATA code.
    pub fn fetch(&self, iata_code: &str) -> Result<Option<Airport>> {
        let conn = lock(&self.conn)?;
        conn.query_row(
            "SELECT name, city, country, iata_code FROM airports WHERE iata_code = ?1",
            params![iata_code],
            |row| {
                Ok(Airport {
                    name: row.get(0)?,
                    city: row.get(1)?,
                    country: row.get(2)?,
                    iata_code: row.get(3)?,
                })
            },
        )
        .optional()
        .map_err(into_store_err)
    }

    /// Number of persisted records.
    pub fn count(&self) -> Result<u64> {
        let conn = lock(&self.conn)?;
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM airports", [], |row| row.get(0))
            .map_err(into_store_err)?;
        Ok(count as u64)
    }
}

#[async_trait]
impl AirportStore for SqliteStore {
    async fn upsert(&self, airport: Airport) -> Result<()> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            conn.execute(
                UPSERT,
                params![
                    airport.name,
                    airport.city,
                    airport.country,
                    airport.iata_code
                ],
            )
            .map_err(into_store_err)?;
            Ok(())
        })
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?
    }

    async fn ping(&self) -> Result<()> {
        let conn = self.conn.clone();
        task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(into_store_err)
        })
        .await
        .map_err(|err| StoreError::Unavailable(err.to_string()))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|_| StoreError::Unavailable("connection lock poisoned".to_string()))
}

fn into_store_err(err: rusqlite::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(iata_code: &str, name: &str) -> Airport {
        Airport {
            name: name.to_string(),
            city: "São Paulo".to_string(),
            country: "Brasil".to_string(),
            iata_code: iata_code.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_round_trips_through_disk() {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SqliteStore::open(dir.path().join("airports.db")).expect("open store");

        store
            .upsert(airport("CGH", "Aeroporto de Congonhas"))
            .await
            .expect("upsert");

        let fetched = store.fetch("CGH").expect("fetch").expect("record exists");
        assert_eq!(fetched, airport("CGH", "Aeroporto de Congonhas"));
        assert_eq!(store.count().expect("count"), 1);
    }

    #[tokio::test]
    async fn upsert_same_code_overwrites_attributes() {
        let store = SqliteStore::open_in_memory().expect("open store");

        store.upsert(airport("GRU", "Guarulhos")).await.expect("first upsert");
        store
            .upsert(airport("GRU", "Aeroporto Internacional de Guarulhos"))
            .await
            .expect("second upsert");

        assert_eq!(store.count().expect("count"), 1);
        let fetched = store.fetch("GRU").expect("fetch").expect("record exists");
        assert_eq!(fetched.name, "Aeroporto Internacional de Guarulhos");
    }

    #[tokio::test]
    async fn fetch_unknown_code_returns_none() {
        let store = SqliteStore::open_in_memory().expect("open store");
        assert!(store.fetch("XXX").expect("fetch").is_none());
    }

    #[tokio::test]
    async fn ping_succeeds_on_open_store() {
        let store = SqliteStore::open_in_memory().expect("open store");
        store.ping().await.expect("ping");
    }
}
