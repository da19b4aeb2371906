//! Request wrapper

use bytes::{Bytes, BytesMut};
use http::{request::Parts, Extensions, HeaderMap, Method};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;
use thiserror::Error;

/// Boxed error type carried by request bodies
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Type-erased request body
pub type RequestBody = UnsyncBoxBody<Bytes, BoxError>;

/// Failure while reading a request body
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body was already consumed by an earlier call
    #[error("request body already consumed")]
    AlreadyTaken,

    /// The body exceeded the configured size limit
    #[error("request body exceeds {limit} bytes")]
    TooLarge {
        /// Limit in bytes
        limit: usize,
    },

    /// The transport failed while streaming the body
    #[error("failed to read request body: {0}")]
    Transport(String),
}

/// HTTP Request wrapper
///
/// Holds the request head and a streaming body that can be collected once.
pub struct Request {
    parts: Parts,
    body: Option<RequestBody>,
}

impl Request {
    /// Create a request from its head and a boxed body
    pub fn new(parts: Parts, body: RequestBody) -> Self {
        Self {
            parts,
            body: Some(body),
        }
    }

    /// Build a request from any `http::Request` whose body yields `Bytes`
    pub fn from_http<B>(req: http::Request<B>) -> Self
    where
        B: hyper::body::Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = req.into_parts();
        Self::new(parts, body.map_err(|err| -> BoxError { err.into() }).boxed_unsync())
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Get the headers
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Get mutable extensions
    pub fn extensions_mut(&mut self) -> &mut Extensions {
        &mut self.parts.extensions
    }

    /// Get the request path
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Collect the body into memory, refusing anything above `limit` bytes
    ///
    /// Frames are read one at a time and the read stops as soon as the
    /// running total would pass `limit`. The body can only be collected once.
    pub async fn body_bytes(&mut self, limit: usize) -> Result<Bytes, BodyError> {
        let mut body = self.body.take().ok_or(BodyError::AlreadyTaken)?;
        let mut buf = BytesMut::new();

        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(|err| BodyError::Transport(err.to_string()))?;
            // Trailers carry no payload
            let Ok(data) = frame.into_data() else {
                continue;
            };
            if buf.len() + data.len() > limit {
                return Err(BodyError::TooLarge { limit });
            }
            buf.extend_from_slice(&data);
        }

        Ok(buf.freeze())
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("version", &self.parts.version)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Full;

    fn request_with_body(body: &'static str) -> Request {
        let req = http::Request::builder()
            .method(Method::POST)
            .uri("/notify")
            .body(Full::new(Bytes::from(body)))
            .unwrap();
        Request::from_http(req)
    }

    #[tokio::test]
    async fn test_body_collects_once() {
        let mut req = request_with_body(r#"{"a":1}"#);

        assert_eq!(req.body_bytes(1024).await.unwrap(), Bytes::from(r#"{"a":1}"#));
        assert!(matches!(
            req.body_bytes(1024).await,
            Err(BodyError::AlreadyTaken)
        ));
    }

    #[tokio::test]
    async fn test_body_over_limit_is_rejected() {
        let mut req = request_with_body("0123456789");

        assert!(matches!(
            req.body_bytes(4).await,
            Err(BodyError::TooLarge { limit: 4 })
        ));
    }

    #[tokio::test]
    async fn test_body_at_limit_is_accepted() {
        let mut req = request_with_body("0123");

        assert_eq!(req.body_bytes(4).await.unwrap(), Bytes::from("0123"));
    }

    #[tokio::test]
    async fn test_body_future_is_send() {
        fn assert_send<T: Send>(value: T) -> T {
            value
        }

        let mut req = request_with_body(r#"{"a":1}"#);
        let bytes = tokio::spawn(async move { assert_send(req.body_bytes(64)).await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bytes, Bytes::from(r#"{"a":1}"#));
    }

    #[test]
    fn test_accessors() {
        let req = request_with_body("");
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.path(), "/notify");
    }
}
