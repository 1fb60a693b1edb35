//! In-memory test adapter
//!
//! Drives a handler the way a transport adapter would, without a socket.
//! Hijackable requests get an in-memory duplex channel: the handler's hijack
//! callback receives one end, the test receives the other.
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_core::{Request, Response, TestClient};
//!
//! #[tokio::test]
//! async fn test_hello() {
//!     let client = TestClient::new(|_req: Request| async { Response::ok("Hello").build() });
//!
//!     let response = client.get("/").await;
//!     response.assert_status(200);
//!     assert_eq!(response.text(), "Hello");
//! }
//! ```

use crate::adapter::{self, Dispatch};
use crate::body;
use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::hijack::{HijackCallback, OnHijack};
use bytes::Bytes;
use http::{HeaderMap, Method, StatusCode};
use std::sync::Arc;
use tokio::io::DuplexStream;

const DUPLEX_CAPACITY: usize = 64 * 1024;

/// Sends simulated requests through a handler
pub struct TestClient {
    handler: Arc<dyn Handler>,
}

impl TestClient {
    pub fn new(handler: impl Handler) -> Self {
        Self {
            handler: Arc::new(handler),
        }
    }

    /// Wrap an already composed handler, e.g. from a pipeline
    pub fn from_arc(handler: Arc<dyn Handler>) -> Self {
        Self { handler }
    }

    /// GET `path`, expecting a response
    pub async fn get(&self, path: &str) -> TestResponse {
        match self.request(TestRequest::get(path)).await {
            Ok(outcome) => outcome.into_response(),
            Err(e) => panic!("GET {path} failed: {e}"),
        }
    }

    /// Send `req` through the handler
    pub async fn request(&self, req: TestRequest) -> Result<TestOutcome> {
        let mut builder = http::Request::builder()
            .method(req.method)
            .uri(req.path.as_str())
            .header(http::header::HOST, "localhost");
        for (name, value) in &req.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let (parts, ()) = builder.body(())?.into_parts();

        let (on_hijack, client_end) = if req.hijackable {
            let (client_end, server_end) = tokio::io::duplex(DUPLEX_CAPACITY);
            let on_hijack: OnHijack = Box::new(move |callback: HijackCallback| {
                tokio::spawn(callback(Box::new(server_end)));
            });
            (Some(on_hijack), Some(client_end))
        } else {
            (None, None)
        };

        let request = adapter::request_from_http(parts, req.body, "http", on_hijack)?;
        match adapter::handle(self.handler.as_ref(), request).await? {
            Dispatch::Respond(parts, stream) => Ok(TestOutcome::Response(TestResponse {
                status: parts.status,
                headers: parts.headers,
                body: body::collect(stream).await?,
            })),
            Dispatch::Hijacked => match client_end {
                Some(conn) => Ok(TestOutcome::Hijacked(conn)),
                None => Err(Error::invalid_state(
                    "handler reported a hijack for a request that could not be hijacked",
                )),
            },
        }
    }
}

/// Test request builder
#[derive(Debug, Clone)]
pub struct TestRequest {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    body: Bytes,
    hijackable: bool,
}

impl TestRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
            hijackable: false,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.push((key.to_string(), value.to_string()));
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Let the handler hijack the connection
    pub fn hijackable(mut self) -> Self {
        self.hijackable = true;
        self
    }
}

/// What came back from the handler
#[derive(Debug)]
pub enum TestOutcome {
    Response(TestResponse),
    /// The handler took over; this is the client end of the connection
    Hijacked(DuplexStream),
}

impl TestOutcome {
    /// # Panics
    ///
    /// Panics if the request was hijacked.
    pub fn into_response(self) -> TestResponse {
        match self {
            TestOutcome::Response(response) => response,
            TestOutcome::Hijacked(_) => panic!("expected a response, request was hijacked"),
        }
    }

    /// # Panics
    ///
    /// Panics if the handler responded instead of hijacking.
    pub fn into_connection(self) -> DuplexStream {
        match self {
            TestOutcome::Hijacked(conn) => conn,
            TestOutcome::Response(response) => {
                panic!("expected a hijack, got status {}", response.status)
            }
        }
    }
}

/// A fully read response
#[derive(Debug)]
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as a string, lossily decoded
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    /// # Panics
    ///
    /// Panics if the status code doesn't match.
    pub fn assert_status(&self, expected: u16) -> &Self {
        assert_eq!(
            self.status.as_u16(),
            expected,
            "Expected status {}, got {}. Body: {}",
            expected,
            self.status,
            self.text()
        );
        self
    }

    /// # Panics
    ///
    /// Panics if the header doesn't exist or doesn't match.
    pub fn assert_header(&self, key: &str, expected: &str) -> &Self {
        let actual = self
            .headers
            .get(key)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert_eq!(
            actual, expected,
            "Expected header '{}' to be '{}', got '{}'",
            key, expected, actual
        );
        self
    }
}
