//! Admin listener: liveness and readiness probes.

use crate::response::{ServiceBody, error_response};
use crate::service::ServiceError;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::service::Service;
use hyper::{Request, Response, StatusCode};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use store::AirportStore;

/// `/health` answers unconditionally; `/ready` answers only while the store
/// does.
#[derive(Clone)]
pub struct AdminService {
    store: Arc<dyn AirportStore>,
}

impl AdminService {
    pub fn new(store: Arc<dyn AirportStore>) -> Self {
        Self { store }
    }
}

impl Service<Request<Incoming>> for AdminService {
    type Response = Response<ServiceBody>;
    type Error = ServiceError;
    type Future =
        Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send + 'static>>;

    fn call(&self, req: Request<Incoming>) -> Self::Future {
        let store = self.store.clone();
        let path = req.uri().path().to_owned();
        Box::pin(async move { Ok(respond(store.as_ref(), &path).await) })
    }
}

async fn respond(store: &dyn AirportStore, path: &str) -> Response<ServiceBody> {
    match path {
        "/health" => ok_response(),
        "/ready" => match store.ping().await {
            Ok(()) => ok_response(),
            Err(err) => {
                tracing::warn!(error = %err, "store is not ready");
                error_response(StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
            }
        },
        _ => error_response(StatusCode::NOT_FOUND, "not found"),
    }
}

fn ok_response() -> Response<ServiceBody> {
    Response::new(Full::new(Bytes::from_static(b"ok\n")).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use store::memory::MemoryStore;
    use store::{Airport, StoreError};

    struct DownStore;

    #[async_trait::async_trait]
    impl AirportStore for DownStore {
        async fn upsert(&self, _airport: Airport) -> store::Result<()> {
            Err(StoreError::Unavailable("down".to_string()))
        }

        async fn ping(&self) -> store::Result<()> {
            Err(StoreError::Unavailable("down".to_string()))
        }
    }

    #[tokio::test]
    async fn health_always_answers() {
        let response = respond(&MemoryStore::new(), "/health").await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn ready_reflects_the_store() {
        let response = respond(&MemoryStore::new(), "/ready").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = respond(&DownStore, "/ready").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unknown_admin_path_is_not_found() {
        let response = respond(&MemoryStore::new(), "/metrics").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
