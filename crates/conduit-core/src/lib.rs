//! # Conduit Core
//!
//! Immutable HTTP messages for handlers and middleware.
//!
//! A [`Request`] or [`Response`] is never mutated: [`Request::change`] and
//! [`Response::change`] derive copies. Bodies are linear and can be read
//! once across every copy that shares them. Header names are
//! case-insensitive. A request may let its handler take over the raw
//! connection through [`Request::hijack`].
//!
//! This crate is not meant to be used directly. Use `conduit` instead.

// Must come first so the macros are visible to every module below.
#[macro_use]
mod tracing_macros;

pub mod adapter;
mod body;
mod context;
mod encoding;
mod error;
mod handler;
mod headers;
mod hijack;
mod message;
pub mod middleware;
mod request;
mod response;
#[cfg(any(test, feature = "test-utils"))]
mod test_client;

// Public API
pub use adapter::{dispatch, request_from_http, response_into_http, Dispatch};
pub use body::{Body, BodyInput, ByteStream};
pub use context::{Context, ContextValue};
pub use encoding::Encoding;
pub use error::{BoxError, Error, Result};
pub use handler::{Handled, Handler};
pub use headers::{Headers, IntoHeaderValues, SingleValues};
pub use hijack::{Connection, HijackCallback, Hijacked, OnHijack, RawConnection};
pub use message::{Changes, Message};
pub use middleware::{LogRequests, Middleware, Next, Pipeline};
pub use request::{RelativeUrl, Request, RequestBuilder};
pub use response::{Response, ResponseBuilder};
#[cfg(any(test, feature = "test-utils"))]
pub use test_client::{TestClient, TestOutcome, TestRequest, TestResponse};
