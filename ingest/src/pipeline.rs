//! Streaming ingestion: decode one element at a time, validate it, persist
//! it, fail fast on the first error.

use crate::decoder::ArrayDecoder;
use crate::errors::{IngestError, Result};
use crate::request::UpsertAirportRequest;
use crate::validate;
use hyper::body::{Body, Bytes};
use store::AirportStore;

/// Fixed success message shared by both ingestion paths.
pub const SUCCESS_MESSAGE: &str = "airports upserted";

/// Drives one request through open → elements → close.
///
/// Elements are processed strictly in array order. The first failure
/// terminates the request: records persisted before it stay persisted and
/// nothing after it is decoded. Returns the number of upserted records.
pub async fn ingest_stream<B>(body: B, store: &dyn AirportStore) -> Result<u64>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    let mut decoder = ArrayDecoder::new(body);
    decoder
        .expect_open()
        .await
        .map_err(|_| IngestError::MissingArrayOpen)?;

    let mut upserted = 0;
    while decoder
        .has_more()
        .await
        .map_err(IngestError::MalformedElement)?
    {
        let candidate: UpsertAirportRequest = decoder
            .decode_next()
            .await
            .map_err(IngestError::MalformedElement)?;

        let violations = validate::check(&candidate);
        if !violations.is_empty() {
            return Err(IngestError::Validation(violations.into()));
        }

        store.upsert(candidate.into_airport()).await?;
        upserted += 1;
    }

    decoder
        .expect_close()
        .await
        .map_err(|_| IngestError::MissingArrayClose)?;
    Ok(upserted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;
    use hyper::StatusCode;
    use store::memory::MemoryStore;

    fn body(payload: &'static str) -> Full<Bytes> {
        Full::new(Bytes::from_static(payload.as_bytes()))
    }

    #[tokio::test]
    async fn upserts_every_element_in_order() {
        let store = MemoryStore::new();
        let upserted = ingest_stream(
            body(
                r#"[
                    {"name":"Congonhas","city":"São Paulo","country":"Brasil","iata_code":"CGH"},
                    {"name":"Galeão","city":"Rio de Janeiro","country":"Brasil","iata_code":"GIG"}
                ]"#,
            ),
            &store,
        )
        .await
        .expect("ingest");

        assert_eq!(upserted, 2);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("GIG").expect("persisted").name, "Galeão");
    }

    #[tokio::test]
    async fn empty_array_succeeds_with_zero_records() {
        let store = MemoryStore::new();
        let upserted = ingest_stream(body("[]"), &store).await.expect("ingest");
        assert_eq!(upserted, 0);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn missing_open_bracket_persists_nothing() {
        let store = MemoryStore::new();
        let err = ingest_stream(
            body(r#"{"name":"A","city":"B","country":"C","iata_code":"X1"}]"#),
            &store,
        )
        .await
        .expect_err("must fail");

        assert!(matches!(err, IngestError::MissingArrayOpen));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn first_invalid_element_stops_the_stream() {
        let store = MemoryStore::new();
        let err = ingest_stream(
            body(
                r#"[
                    {"name":"Congonhas","city":"São Paulo","country":"Brasil","iata_code":"CGH"},
                    {"name":"Sem Código","city":"São Paulo","country":"Brasil"},
                    {"name":"Guarulhos","city":"Guarulhos","country":"Brasil","iata_code":"GRU"}
                ]"#,
            ),
            &store,
        )
        .await
        .expect_err("must fail");

        assert!(matches!(err, IngestError::Validation(_)));
        assert!(err.to_string().contains("iata_code is a required field"));
        // the element before the failure is persisted, the one after is not
        assert_eq!(store.len(), 1);
        assert!(store.get("CGH").is_some());
        assert!(store.get("GRU").is_none());
    }

    #[tokio::test]
    async fn persistence_failure_keeps_earlier_records() {
        let store = MemoryStore::new().fail_on("GIG");
        let err = ingest_stream(
            body(
                r#"[
                    {"name":"Congonhas","city":"São Paulo","country":"Brasil","iata_code":"CGH"},
                    {"name":"Galeão","city":"Rio de Janeiro","country":"Brasil","iata_code":"GIG"}
                ]"#,
            ),
            &store,
        )
        .await
        .expect_err("must fail");

        assert!(matches!(err, IngestError::Persistence(_)));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.to_string().starts_with("error upserting airport:"));
        assert_eq!(store.len(), 1);
        assert!(store.get("CGH").is_some());
    }

    #[tokio::test]
    async fn duplicate_codes_apply_in_array_order() {
        let store = MemoryStore::new();
        let upserted = ingest_stream(
            body(
                r#"[
                    {"name":"Old Name","city":"São Paulo","country":"Brasil","iata_code":"CGH"},
                    {"name":"New Name","city":"São Paulo","country":"Brasil","iata_code":"CGH"}
                ]"#,
            ),
            &store,
        )
        .await
        .expect("ingest");

        assert_eq!(upserted, 2);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("CGH").expect("persisted").name, "New Name");
    }

    #[tokio::test]
    async fn missing_close_bracket_fails_after_persisting() {
        let store = MemoryStore::new();
        let err = ingest_stream(
            body(r#"[{"name":"Congonhas","city":"São Paulo","country":"Brasil","iata_code":"CGH"}"#),
            &store,
        )
        .await
        .expect_err("must fail");

        assert!(matches!(err, IngestError::MissingArrayClose));
        // every element had already been consumed and persisted
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn malformed_element_is_a_client_error() {
        let store = MemoryStore::new();
        let err = ingest_stream(body(r#"["just a string"]"#), &store)
            .await
            .expect_err("must fail");

        assert!(matches!(err, IngestError::MalformedElement(_)));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "invalid JSON airport structure");
        assert!(store.is_empty());
    }
}
