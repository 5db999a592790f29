//! Response bodies and the streaming commit point.

use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes, Frame};
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};
use thiserror::Error;
use tokio::sync::mpsc;

/// Body type produced by every handler in this crate.
pub type ServiceBody = BoxBody<Bytes, Infallible>;

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Serialize)]
pub struct MessageBody<'a> {
    pub message: &'a str,
}

#[derive(Error, Debug)]
pub enum EmitError {
    #[error("could not serialize response body: {0}")]
    Serialize(String),

    #[error("connection closed before the body was written")]
    ConnectionClosed,
}

/// `{"error":"<message>"}` with the given status.
pub fn error_response(status: StatusCode, message: &str) -> Response<ServiceBody> {
    let bytes = serde_json::to_vec(&ErrorBody { error: message }).unwrap_or_default();
    json_response(status, bytes)
}

/// Fully-buffered JSON response, for paths with no separate commit point.
pub fn json_response_from<T: Serialize>(status: StatusCode, value: &T) -> Response<ServiceBody> {
    let bytes = serde_json::to_vec(value).unwrap_or_default();
    json_response(status, bytes)
}

fn json_response(status: StatusCode, bytes: Vec<u8>) -> Response<ServiceBody> {
    let mut response = Response::new(Full::new(Bytes::from(bytes)).boxed());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    response
}

/// Two-phase success response.
///
/// The returned response carries the final status and headers — the commit
/// point — while the body travels through a [`DeferredBody`] handle. One
/// frame of channel capacity means a single `write_json` completes even
/// before the transport starts polling the body.
pub fn committed_json_response(status: StatusCode) -> (Response<ServiceBody>, DeferredBody) {
    let (tx, rx) = mpsc::channel(1);
    let mut response = Response::new(ChannelBody { rx }.boxed());
    *response.status_mut() = status;
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    );
    (response, DeferredBody { tx })
}

/// Write side of a committed response.
pub struct DeferredBody {
    tx: mpsc::Sender<Frame<Bytes>>,
}

impl DeferredBody {
    /// Serializes `value` and queues it as the response body. Failing here
    /// while the caller still holds the response can be turned into a 500;
    /// once the response has reached the transport, delivery is best-effort.
    pub async fn write_json<T: Serialize>(self, value: &T) -> Result<(), EmitError> {
        let bytes =
            serde_json::to_vec(value).map_err(|err| EmitError::Serialize(err.to_string()))?;
        self.tx
            .send(Frame::data(Bytes::from(bytes)))
            .await
            .map_err(|_| EmitError::ConnectionClosed)
    }
}

/// Channel-fed body. hyper 1.x dropped `Body::channel`; implementing the
/// trait over a bounded receiver is the supported replacement.
struct ChannelBody {
    rx: mpsc::Receiver<Frame<Bytes>>,
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        self.get_mut().rx.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn committed_response_delivers_a_body_written_after_commit() {
        let (response, deferred) = committed_json_response(StatusCode::OK);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

        deferred
            .write_json(&MessageBody {
                message: "airports upserted",
            })
            .await
            .expect("write body");

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        assert_eq!(&bytes[..], br#"{"message":"airports upserted"}"#);
    }

    #[tokio::test]
    async fn write_fails_once_the_response_is_gone() {
        let (response, deferred) = committed_json_response(StatusCode::OK);
        drop(response);

        let err = deferred
            .write_json(&MessageBody { message: "late" })
            .await
            .expect_err("must fail");
        assert!(matches!(err, EmitError::ConnectionClosed));
    }

    #[tokio::test]
    async fn dropping_the_writer_ends_the_body_empty() {
        let (response, deferred) = committed_json_response(StatusCode::OK);
        drop(deferred);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn error_response_shape() {
        let response = error_response(
            StatusCode::BAD_REQUEST,
            "invalid JSON: expected '[' at start",
        );
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect")
            .to_bytes();
        assert_eq!(&bytes[..], br#"{"error":"invalid JSON: expected '[' at start"}"#);
    }
}
