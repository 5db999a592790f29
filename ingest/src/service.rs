//! HTTP surface of the ingestion service.

use crate::buffered;
use crate::errors::IngestError;
use crate::metrics_defs;
use crate::pipeline::{self, SUCCESS_MESSAGE};
use crate::response::{
    MessageBody, ServiceBody, committed_json_response, error_response, json_response_from,
};
use hyper::body::{Body, Bytes, Incoming};
use hyper::service::Service;
use hyper::{Method, Request, Response, StatusCode};
use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Instant;
use store::AirportStore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Routes the two upsert endpoints and answers 404 for everything else.
#[derive(Clone)]
pub struct IngestService {
    store: Arc<dyn AirportStore>,
}

impl IngestService {
    pub fn new(store: Arc<dyn AirportStore>) -> Self {
        Self { store }
    }
}

impl Service<Request<Incoming>> for IngestService {
    type Response = Response<ServiceBody>;
    type Error = ServiceError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let store = self.store.clone();
        Box::pin(async move { Ok(route(store.as_ref(), req).await) })
    }
}

async fn route(store: &dyn AirportStore, req: Request<Incoming>) -> Response<ServiceBody> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = match (&method, path.as_str()) {
        (&Method::POST, "/api/v1/airports") => handle_upsert(store, req.into_body()).await,
        (&Method::POST, "/api/v1/nonstreaming/airports") => {
            handle_buffered_upsert(store, req.into_body()).await
        }
        _ => error_response(StatusCode::NOT_FOUND, "not found"),
    };

    tracing::info!(
        %method,
        path,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    shared::histogram!(metrics_defs::REQUEST_DURATION).record(started.elapsed().as_secs_f64());
    response
}

/// Streaming path: the success status is only committed once the whole
/// array has been consumed, and the body follows the commit.
pub async fn handle_upsert<B>(store: &dyn AirportStore, body: B) -> Response<ServiceBody>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    match pipeline::ingest_stream(body, store).await {
        Ok(upserted) => {
            shared::counter!(metrics_defs::RECORDS_UPSERTED).increment(upserted);
            respond_committed().await
        }
        Err(err) => failure_response(err),
    }
}

/// Baseline path: everything precedes the first response byte, so the
/// success body is written in one piece.
pub async fn handle_buffered_upsert<B>(store: &dyn AirportStore, body: B) -> Response<ServiceBody>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    match buffered::ingest_buffered(body, store).await {
        Ok(upserted) => {
            shared::counter!(metrics_defs::RECORDS_UPSERTED).increment(upserted);
            json_response_from(
                StatusCode::OK,
                &MessageBody {
                    message: SUCCESS_MESSAGE,
                },
            )
        }
        Err(err) => failure_response(err),
    }
}

async fn respond_committed() -> Response<ServiceBody> {
    let (response, deferred) = committed_json_response(StatusCode::OK);
    match deferred
        .write_json(&MessageBody {
            message: SUCCESS_MESSAGE,
        })
        .await
    {
        Ok(()) => response,
        Err(err) => failure_response(IngestError::Commit(err.to_string())),
    }
}

fn failure_response(err: IngestError) -> Response<ServiceBody> {
    let status = err.status();
    if status.is_server_error() {
        tracing::error!(error = %err, "ingestion failed");
    } else {
        tracing::debug!(error = %err, "rejected request");
    }
    shared::counter!(metrics_defs::INGEST_FAILURES).increment(1);
    error_response(status, &err.to_string())
}
