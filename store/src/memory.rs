//! In-memory [`AirportStore`].
//!
//! The swappable fake for pipeline and handler tests: it records upserts in
//! a map keyed by IATA code and can be told to fail specific codes to
//! exercise persistence-error paths.

use crate::{Airport, AirportStore, Result, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

#[derive(Default)]
pub struct MemoryStore {
    airports: Mutex<HashMap<String, Airport>>,
    failing_codes: Mutex<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every upsert of `iata_code` fail with a database error.
    pub fn fail_on(self, iata_code: &str) -> Self {
        recover(self.failing_codes.lock()).insert(iata_code.to_string());
        self
    }

    pub fn get(&self, iata_code: &str) -> Option<Airport> {
        recover(self.airports.lock()).get(iata_code).cloned()
    }

    pub fn len(&self) -> usize {
        recover(self.airports.lock()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AirportStore for MemoryStore {
    async fn upsert(&self, airport: Airport) -> Result<()> {
        if recover(self.failing_codes.lock()).contains(&airport.iata_code) {
            return Err(StoreError::Database(format!(
                "injected failure for {}",
                airport.iata_code
            )));
        }
        recover(self.airports.lock()).insert(airport.iata_code.clone(), airport);
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

// A poisoned lock only means a panicking test left the map mid-update; the
// data is still usable for assertions.
fn recover<T>(result: std::sync::LockResult<T>) -> T {
    result.unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn airport(iata_code: &str, name: &str) -> Airport {
        Airport {
            name: name.to_string(),
            city: "Lisboa".to_string(),
            country: "Portugal".to_string(),
            iata_code: iata_code.to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_and_get() {
        let store = MemoryStore::new();
        store.upsert(airport("LIS", "Humberto Delgado")).await.expect("upsert");

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("LIS").expect("record exists").name,
            "Humberto Delgado"
        );
    }

    #[tokio::test]
    async fn later_upsert_wins() {
        let store = MemoryStore::new();
        store.upsert(airport("OPO", "Porto")).await.expect("first");
        store
            .upsert(airport("OPO", "Francisco Sá Carneiro"))
            .await
            .expect("second");

        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("OPO").expect("record exists").name,
            "Francisco Sá Carneiro"
        );
    }

    #[tokio::test]
    async fn injected_failure_surfaces_as_database_error() {
        let store = MemoryStore::new().fail_on("FAO");
        let err = store
            .upsert(airport("FAO", "Faro"))
            .await
            .expect_err("upsert must fail");

        assert!(matches!(err, StoreError::Database(_)));
        assert!(store.is_empty());
    }
}
