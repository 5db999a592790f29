//! Full-buffer ingestion baseline.
//!
//! Reads the whole request body into memory and decodes the array in one
//! shot, then runs the same validate/persist loop as the streaming path.
//! Peak memory is proportional to the payload size; the endpoint exists for
//! comparison, not for production traffic.

use crate::errors::{IngestError, Result};
use crate::request::UpsertAirportRequest;
use crate::validate;
use http_body_util::BodyExt;
use hyper::body::{Body, Bytes};
use store::AirportStore;

pub async fn ingest_buffered<B>(body: B, store: &dyn AirportStore) -> Result<u64>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    let bytes = body
        .collect()
        .await
        .map_err(|err| IngestError::RequestBody(err.to_string()))?
        .to_bytes();

    let candidates: Vec<UpsertAirportRequest> =
        serde_json::from_slice(&bytes).map_err(IngestError::MalformedArray)?;

    let mut upserted = 0;
    for candidate in candidates {
        let violations = validate::check(&candidate);
        if !violations.is_empty() {
            return Err(IngestError::Validation(violations.into()));
        }
        store.upsert(candidate.into_airport()).await?;
        upserted += 1;
    }
    Ok(upserted)
}
