//! Response types for conduit
//!
//! A [`Response`] is a [`Message`] with a status code. The named
//! constructors return a [`ResponseBuilder`] preset for the common cases:
//!
//! | Constructor | Status | Extra |
//! |-------------|--------|-------|
//! | [`Response::ok`] | 200 | - |
//! | [`Response::moved_permanently`] | 301 | `location` |
//! | [`Response::found`] | 302 | `location` |
//! | [`Response::see_other`] | 303 | `location` |
//! | [`Response::not_modified`] | 304 | `date`, no body |
//! | [`Response::bad_request`] | 400 | default body |
//! | [`Response::unauthorized`] | 401 | default body |
//! | [`Response::forbidden`] | 403 | default body |
//! | [`Response::not_found`] | 404 | default body |
//! | [`Response::internal_server_error`] | 500 | default body |
//!
//! Error constructors fall back to the reason phrase as a `text/plain` body
//! when no body is supplied.
//!
//! # Example
//!
//! ```rust,ignore
//! let response = Response::not_found(()).build()?;
//! assert_eq!(response.headers().get("content-type"), Some("text/plain"));
//!
//! let moved = Response::found("/login")
//!     .header("Cache-Control", "no-store")
//!     .build()?;
//! ```

use crate::body::BodyInput;
use crate::context::Context;
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::headers::{Headers, IntoHeaderValues};
use crate::message::{Changes, Message};
use http::StatusCode;
use std::any::Any;
use std::fmt;
use std::ops::Deref;
use std::sync::OnceLock;
use std::time::SystemTime;

/// HTTP response
pub struct Response {
    message: Message,
    status: StatusCode,
    expires: OnceLock<Option<SystemTime>>,
    last_modified: OnceLock<Option<SystemTime>>,
}

impl Response {
    /// Start building a response with an arbitrary status code
    pub fn builder(status: u16) -> ResponseBuilder {
        ResponseBuilder::new(status)
    }

    /// 200 OK
    pub fn ok(body: impl Into<BodyInput>) -> ResponseBuilder {
        ResponseBuilder::new(200).body(body)
    }

    /// 301 Moved Permanently
    pub fn moved_permanently(location: impl AsRef<str>) -> ResponseBuilder {
        ResponseBuilder::redirect(301, location.as_ref())
    }

    /// 302 Found
    pub fn found(location: impl AsRef<str>) -> ResponseBuilder {
        ResponseBuilder::redirect(302, location.as_ref())
    }

    /// 303 See Other
    pub fn see_other(location: impl AsRef<str>) -> ResponseBuilder {
        ResponseBuilder::redirect(303, location.as_ref())
    }

    /// 304 Not Modified, dated now
    pub fn not_modified() -> ResponseBuilder {
        ResponseBuilder::new(304).header("date", httpdate::fmt_http_date(SystemTime::now()))
    }

    /// 400 Bad Request
    pub fn bad_request(body: impl Into<BodyInput>) -> ResponseBuilder {
        ResponseBuilder::error(StatusCode::BAD_REQUEST, body.into())
    }

    /// 401 Unauthorized
    pub fn unauthorized(body: impl Into<BodyInput>) -> ResponseBuilder {
        ResponseBuilder::error(StatusCode::UNAUTHORIZED, body.into())
    }

    /// 403 Forbidden
    pub fn forbidden(body: impl Into<BodyInput>) -> ResponseBuilder {
        ResponseBuilder::error(StatusCode::FORBIDDEN, body.into())
    }

    /// 404 Not Found
    pub fn not_found(body: impl Into<BodyInput>) -> ResponseBuilder {
        ResponseBuilder::error(StatusCode::NOT_FOUND, body.into())
    }

    /// 500 Internal Server Error
    pub fn internal_server_error(body: impl Into<BodyInput>) -> ResponseBuilder {
        ResponseBuilder::error(StatusCode::INTERNAL_SERVER_ERROR, body.into())
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Parsed `expires` header
    pub fn expires(&self) -> Result<Option<SystemTime>> {
        cached_date(&self.expires, self.message.headers_all(), "expires")
    }

    /// Parsed `last-modified` header
    pub fn last_modified(&self) -> Result<Option<SystemTime>> {
        cached_date(&self.last_modified, self.message.headers_all(), "last-modified")
    }

    /// Derive a changed copy
    ///
    /// Responses have no handler path, so a `path` change is rejected.
    pub fn change(&self, changes: Changes) -> Result<Response> {
        let Changes { message, path } = changes;
        if path.is_some() {
            return Err(Error::invalid_argument("a response has no path to change."));
        }
        let (body, headers, context) = self.message.derive(message);
        Ok(Response {
            message: Message::new(body, None, headers, context)?,
            status: self.status,
            expires: OnceLock::new(),
            last_modified: OnceLock::new(),
        })
    }
}

fn cached_date(
    cache: &OnceLock<Option<SystemTime>>,
    headers: &Headers,
    name: &str,
) -> Result<Option<SystemTime>> {
    if let Some(cached) = cache.get() {
        return Ok(*cached);
    }
    let parsed = match headers.get(name) {
        None => None,
        Some(raw) => Some(httpdate::parse_http_date(raw)?),
    };
    Ok(*cache.get_or_init(|| parsed))
}

impl Deref for Response {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Response")
            .field("status", &self.status)
            .field("headers", self.message.headers_all())
            .finish()
    }
}

/// Builder for [`Response`]
pub struct ResponseBuilder {
    status: u16,
    headers: Headers,
    body: BodyInput,
    encoding: Option<Encoding>,
    context: Context,
    default_body: Option<&'static str>,
}

impl ResponseBuilder {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Headers::empty(),
            body: BodyInput::Empty,
            encoding: None,
            context: Context::new(),
            default_body: None,
        }
    }

    fn redirect(status: u16, location: &str) -> Self {
        Self::new(status).header("location", location)
    }

    fn error(status: StatusCode, body: BodyInput) -> Self {
        let mut builder = Self::new(status.as_u16());
        builder.body = body;
        builder.default_body = status.canonical_reason();
        builder
    }

    /// Replace all headers
    ///
    /// Headers set earlier on this builder, such as `location`, are
    /// replaced too.
    pub fn headers(mut self, headers: impl Into<Headers>) -> Self {
        self.headers = headers.into();
        self
    }

    /// Set one header
    pub fn header(mut self, name: impl Into<String>, value: impl IntoHeaderValues) -> Self {
        let name = name.into();
        self.headers = self.headers.with(&name, value.into_header_values());
        self
    }

    pub fn body(mut self, body: impl Into<BodyInput>) -> Self {
        self.body = body.into();
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    pub fn context_value<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.context = self.context.with(key, value);
        self
    }

    pub fn build(self) -> Result<Response> {
        if self.status < 100 {
            return Err(Error::invalid_argument(format!(
                "Invalid status code: {}.",
                self.status
            )));
        }
        let status = StatusCode::from_u16(self.status).map_err(|_| {
            Error::invalid_argument(format!("Invalid status code: {}.", self.status))
        })?;

        let (body, headers) = match self.default_body {
            Some(reason) if self.body.is_empty_input() => {
                let headers = if self.headers.contains("content-type") {
                    self.headers
                } else {
                    self.headers.with("content-type", vec!["text/plain".to_owned()])
                };
                (BodyInput::Text(reason.to_owned()), headers)
            }
            _ => (self.body, self.headers),
        };

        Ok(Response {
            message: Message::new(body, self.encoding, headers, self.context)?,
            status,
            expires: OnceLock::new(),
            last_modified: OnceLock::new(),
        })
    }
}
