//! Request types for conduit
//!
//! A [`Request`] carries, besides the shared [`Message`] parts, the method,
//! the absolute URI the client asked for, and a split of that URI's path into
//! the part routing has already consumed (`handler_path`) and the part still
//! left for the handler (`url`). The two always recombine to the requested
//! path; construction fails otherwise.

use crate::body::BodyInput;
use crate::context::Context;
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::headers::{Headers, IntoHeaderValues};
use crate::hijack::{Connection, HijackCallback, HijackHandle, Hijacked, OnHijack};
use crate::message::{Changes, Message};
use futures_util::FutureExt;
use http::Method;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::ops::Deref;
use std::sync::{Arc, OnceLock};
use std::time::SystemTime;
use url::Url;

/// A relative URL: a path with an optional query, nothing else
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeUrl {
    path: String,
    query: Option<String>,
}

impl RelativeUrl {
    /// Parse a relative reference, rejecting schemes, authorities, and
    /// fragments
    ///
    /// The path and query are percent-encoded the way an absolute URL's are,
    /// so `"c d"` compares equal to the `c%20d` of a parsed requested URI.
    pub fn parse(input: &str) -> Result<RelativeUrl> {
        let only_path_and_query = || {
            Error::invalid_argument(format!(
                "url \"{input}\" may contain only a path and query parameters."
            ))
        };

        let (rest, fragment) = match input.split_once('#') {
            Some((rest, fragment)) => (rest, Some(fragment)),
            None => (input, None),
        };
        if fragment.is_some_and(|f| !f.is_empty()) || rest.starts_with("//") || has_scheme(rest) {
            return Err(only_path_and_query());
        }

        let (path, query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };

        // Borrow the encoder of a throwaway absolute URL.
        let mut encoded = Url::parse("http://localhost/")?;
        encoded.set_path(path);
        encoded.set_query(query);
        let encoded_path = if path.starts_with('/') {
            encoded.path()
        } else {
            encoded.path().strip_prefix('/').unwrap_or(encoded.path())
        };

        Ok(RelativeUrl {
            path: encoded_path.to_owned(),
            query: encoded.query().map(str::to_owned),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Path segments; a leading slash is ignored and an empty path has none
    pub fn path_segments(&self) -> Vec<&str> {
        segments(&self.path)
    }
}

impl fmt::Display for RelativeUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        if let Some(query) = &self.query {
            write!(f, "?{query}")?;
        }
        Ok(())
    }
}

fn has_scheme(input: &str) -> bool {
    let end = input.find(|c: char| matches!(c, '/' | '?')).unwrap_or(input.len());
    let Some(colon) = input[..end].find(':') else {
        return false;
    };
    let scheme = &input[..colon];
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn segments(path: &str) -> Vec<&str> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('/').collect()
    }
}

/// An HTTP request passed between adapter, middleware, and handler
pub struct Request {
    message: Message,
    method: Method,
    requested_uri: Url,
    url: RelativeUrl,
    handler_path: String,
    protocol_version: String,
    hijack: Option<Arc<HijackHandle>>,
    if_modified_since: OnceLock<Option<SystemTime>>,
}

struct RequestParts {
    method: Method,
    requested_uri: Url,
    protocol_version: String,
    headers: Headers,
    handler_path: Option<String>,
    url: Option<RelativeUrl>,
    body: BodyInput,
    encoding: Option<Encoding>,
    context: Context,
    hijack: Option<Arc<HijackHandle>>,
}

impl Request {
    /// Start building a request for `method` on the absolute `requested_uri`
    pub fn builder(method: impl Into<String>, requested_uri: impl AsRef<str>) -> RequestBuilder {
        RequestBuilder::new(method, requested_uri)
    }

    /// A request with no body, headers, or routing information
    pub fn new(method: impl Into<String>, requested_uri: impl AsRef<str>) -> Result<Request> {
        RequestBuilder::new(method, requested_uri).build()
    }

    fn from_parts(parts: RequestParts) -> Result<Request> {
        let (handler_path, url) =
            split_path(&parts.requested_uri, parts.handler_path, parts.url)?;
        let message = Message::new(parts.body, parts.encoding, parts.headers, parts.context)?;

        Ok(Request {
            message,
            method: parts.method,
            requested_uri: parts.requested_uri,
            url,
            handler_path,
            protocol_version: parts.protocol_version,
            hijack: parts.hijack,
            if_modified_since: OnceLock::new(),
        })
    }

    /// Get the HTTP method
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute URI the client requested
    pub fn requested_uri(&self) -> &Url {
        &self.requested_uri
    }

    /// The part of the path not yet consumed by routing, with the query
    pub fn url(&self) -> &RelativeUrl {
        &self.url
    }

    /// The root-relative path prefix already consumed by routing
    pub fn handler_path(&self) -> &str {
        &self.handler_path
    }

    pub fn protocol_version(&self) -> &str {
        &self.protocol_version
    }

    /// Parsed `if-modified-since` header
    ///
    /// A malformed header yields the date parser's error on every call.
    pub fn if_modified_since(&self) -> Result<Option<SystemTime>> {
        if let Some(cached) = self.if_modified_since.get() {
            return Ok(*cached);
        }
        let parsed = match self.message.headers_all().get("if-modified-since") {
            None => None,
            Some(raw) => Some(httpdate::parse_http_date(raw)?),
        };
        Ok(*self.if_modified_since.get_or_init(|| parsed))
    }

    /// Whether [`hijack`](Self::hijack) would currently succeed
    pub fn can_hijack(&self) -> bool {
        self.hijack.as_ref().is_some_and(|h| h.is_available())
    }

    /// Take over the underlying connection
    ///
    /// `callback` receives the raw connection on a separate task once the
    /// adapter releases it. The returned [`Hijacked`] must be returned from
    /// the handler in place of a response. Fails with an invalid-state error
    /// if the adapter does not support hijacking or if this request, or any
    /// request derived from the same original, was already hijacked.
    pub fn hijack<F, Fut>(&self, callback: F) -> Result<Hijacked>
    where
        F: FnOnce(Connection) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let Some(handle) = &self.hijack else {
            crate::trace_warn!(method = %self.method, uri = %self.requested_uri, "hijack refused: adapter does not support it");
            return Err(Error::invalid_state("This request can't be hijacked."));
        };

        let callback: HijackCallback = Box::new(move |conn: Connection| callback(conn).boxed());
        let hijacked = handle.run(callback).map_err(|e| {
            crate::trace_warn!(method = %self.method, uri = %self.requested_uri, error = %e, "hijack refused");
            e
        })?;
        crate::trace_debug!(method = %self.method, uri = %self.requested_uri, "request hijacked");
        Ok(hijacked)
    }

    /// Derive a changed copy
    ///
    /// Without a replacement body the copy shares this request's body, so the
    /// body can still be read only once across both. A `path` is appended to
    /// `handler_path` and `url` is recomputed. The hijack capability carries
    /// over.
    pub fn change(&self, changes: Changes) -> Result<Request> {
        let Changes { message, path } = changes;
        let (body, headers, context) = self.message.derive(message);

        let mut handler_path = self.handler_path.clone();
        if let Some(path) = path {
            handler_path.push_str(&path);
        }

        Request::from_parts(RequestParts {
            method: self.method.clone(),
            requested_uri: self.requested_uri.clone(),
            protocol_version: self.protocol_version.clone(),
            headers,
            handler_path: Some(handler_path),
            url: None,
            body,
            encoding: None,
            context,
            hijack: self.hijack.clone(),
        })
    }
}

impl Deref for Request {
    type Target = Message;

    fn deref(&self) -> &Message {
        &self.message
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("requested_uri", &self.requested_uri.as_str())
            .field("handler_path", &self.handler_path)
            .field("url", &self.url.to_string())
            .field("protocol_version", &self.protocol_version)
            .field("can_hijack", &self.can_hijack())
            .finish()
    }
}

/// Work out `handler_path` and `url`, inferring whichever was not given
fn split_path(
    requested_uri: &Url,
    handler_path: Option<String>,
    url: Option<RelativeUrl>,
) -> Result<(String, RelativeUrl)> {
    let path = requested_uri.path();
    let query = requested_uri.query();

    let handler_path = handler_path.map(|hp| {
        if hp != path && !hp.ends_with('/') {
            hp + "/"
        } else {
            hp
        }
    });

    if let Some(hp) = &handler_path {
        if !path.starts_with(hp.as_str()) {
            return Err(Error::invalid_argument(format!(
                "handlerPath \"{hp}\" must be a prefix of requestedUri path \"{path}\""
            )));
        }
        if !hp.starts_with('/') {
            return Err(Error::invalid_argument(format!(
                "handlerPath \"{hp}\" must be root-relative."
            )));
        }
    }

    let url = match (url, &handler_path) {
        (Some(url), _) => {
            if !path.ends_with(url.path()) {
                return Err(Error::invalid_argument(format!(
                    "url \"{url}\" must be a suffix of requestedUri \"{requested_uri}\"."
                )));
            }
            if url.query().unwrap_or("") != query.unwrap_or("") {
                return Err(Error::invalid_argument(format!(
                    "url \"{url}\" must have the same query parameters as requestedUri \"{requested_uri}\"."
                )));
            }
            if url.path().starts_with('/') {
                return Err(Error::invalid_argument(format!("url \"{url}\" must be relative.")));
            }
            let start = path.len() - url.path().len();
            if !url.path().is_empty() && !path[..start].ends_with('/') {
                return Err(Error::invalid_argument(format!(
                    "url \"{url}\" must be on a path boundary in requestedUri \"{requested_uri}\"."
                )));
            }
            url
        }
        (None, Some(hp)) => RelativeUrl {
            path: path[hp.len()..].to_owned(),
            query: query.map(str::to_owned),
        },
        (None, None) => RelativeUrl {
            path: path.strip_prefix('/').unwrap_or(path).to_owned(),
            query: query.map(str::to_owned),
        },
    };

    let handler_path = match handler_path {
        Some(hp) => hp,
        None if url.path().is_empty() => path.to_owned(),
        None if url.path() != path && path.ends_with(url.path()) => {
            path[..path.len() - url.path().len()].to_owned()
        }
        None => "/".to_owned(),
    };

    let handler_part = segments(&handler_path).join("/");
    let rest = url.path_segments().join("/");
    let join = if url.path().starts_with('/') { "/" } else { "" };
    if format!("{handler_part}{join}{rest}") != segments(path).join("/") {
        return Err(Error::invalid_argument(format!(
            "handlerPath \"{handler_path}\" and url \"{url}\" must combine to equal requestedUri path \"{path}\"."
        )));
    }

    Ok((handler_path, url))
}

/// Builder for the optional parts of a [`Request`]
///
/// # Example
///
/// ```rust,ignore
/// let request = Request::builder("GET", "http://localhost/static/dir/file.html")
///     .handler_path("/static/")
///     .header("Accept", "text/html")
///     .build()?;
/// assert_eq!(request.url().path(), "dir/file.html");
/// ```
pub struct RequestBuilder {
    method: String,
    requested_uri: String,
    protocol_version: Option<String>,
    headers: Headers,
    handler_path: Option<String>,
    url: Option<String>,
    body: BodyInput,
    encoding: Option<Encoding>,
    context: Context,
    on_hijack: Option<OnHijack>,
}

impl RequestBuilder {
    pub fn new(method: impl Into<String>, requested_uri: impl AsRef<str>) -> Self {
        Self {
            method: method.into(),
            requested_uri: requested_uri.as_ref().to_owned(),
            protocol_version: None,
            headers: Headers::empty(),
            handler_path: None,
            url: None,
            body: BodyInput::Empty,
            encoding: None,
            context: Context::new(),
            on_hijack: None,
        }
    }

    /// HTTP version without the `HTTP/` prefix; defaults to `1.1`
    pub fn protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = Some(version.into());
        self
    }

    /// Replace all headers
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

    pub fn handler_path(mut self, handler_path: impl Into<String>) -> Self {
        self.handler_path = Some(handler_path.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
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

    /// Replace the whole context
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Add one context value
    pub fn context_value<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.context = self.context.with(key, value);
        self
    }

    /// Make the request hijackable; `on_hijack` is called at most once
    pub fn on_hijack<F>(mut self, on_hijack: F) -> Self
    where
        F: FnOnce(HijackCallback) + Send + 'static,
    {
        self.on_hijack = Some(Box::new(on_hijack));
        self
    }

    pub fn build(self) -> Result<Request> {
        if self.method.is_empty() {
            return Err(Error::invalid_argument("method cannot be empty."));
        }
        let method = Method::from_bytes(self.method.as_bytes()).map_err(|_| {
            Error::invalid_argument(format!("method \"{}\" is not a valid token.", self.method))
        })?;

        let requested_uri = parse_requested_uri(&self.requested_uri)?;
        let url = self.url.as_deref().map(RelativeUrl::parse).transpose()?;

        Request::from_parts(RequestParts {
            method,
            requested_uri,
            protocol_version: self.protocol_version.unwrap_or_else(|| "1.1".to_owned()),
            headers: self.headers,
            handler_path: self.handler_path,
            url,
            body: self.body,
            encoding: self.encoding,
            context: self.context,
            hijack: self.on_hijack.map(|f| Arc::new(HijackHandle::new(f))),
        })
    }
}

fn parse_requested_uri(raw: &str) -> Result<Url> {
    let mut uri = match Url::parse(raw) {
        Ok(uri) => uri,
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            return Err(Error::invalid_argument(format!(
                "requestedUri \"{raw}\" must be an absolute URL."
            )))
        }
        Err(e) => return Err(e.into()),
    };
    if uri.cannot_be_a_base() {
        return Err(Error::invalid_argument(format!(
            "requestedUri \"{raw}\" must be an absolute URL."
        )));
    }
    match uri.fragment() {
        Some(fragment) if !fragment.is_empty() => {
            return Err(Error::invalid_argument(format!(
                "requestedUri \"{raw}\" may not have a fragment."
            )))
        }
        Some(_) => uri.set_fragment(None),
        None => {}
    }
    Ok(uri)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn request(uri: &str) -> RequestBuilder {
        Request::builder("GET", uri)
    }

    #[test]
    fn test_defaults_without_routing_information() {
        let req = Request::new("GET", "http://localhost/foo/bar?q=1").unwrap();
        assert_eq!(req.handler_path(), "/");
        assert_eq!(req.url().path(), "foo/bar");
        assert_eq!(req.url().query(), Some("q=1"));
        assert_eq!(req.protocol_version(), "1.1");
        assert_eq!(req.method(), Method::GET);
    }

    #[test]
    fn test_empty_method_is_rejected() {
        let err = Request::new("", "http://localhost/").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_relative_requested_uri_is_rejected() {
        let err = Request::new("GET", "/foo").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_fragment_is_rejected() {
        let err = Request::new("GET", "http://localhost/foo#bar").unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_malformed_uri_is_a_uri_error() {
        let err = Request::new("GET", "http://[::1/").unwrap_err();
        assert!(matches!(err, Error::InvalidUri(_)));
    }

    #[test]
    fn test_handler_path_infers_url() {
        let req = request("http://localhost/static/dir/file.html")
            .handler_path("/static")
            .build()
            .unwrap();
        assert_eq!(req.handler_path(), "/static/");
        assert_eq!(req.url().path(), "dir/file.html");
    }

    #[test]
    fn test_handler_path_equal_to_full_path_keeps_no_slash() {
        let req = request("http://localhost/static").handler_path("/static").build().unwrap();
        assert_eq!(req.handler_path(), "/static");
        assert_eq!(req.url().path(), "");
    }

    #[test]
    fn test_url_infers_handler_path() {
        let req = request("http://localhost/foo/bar?x=y").url("bar?x=y").build().unwrap();
        assert_eq!(req.handler_path(), "/foo/");
        assert_eq!(req.url().to_string(), "bar?x=y");
    }

    #[test]
    fn test_empty_url_makes_whole_path_the_handler_path() {
        let req = request("http://localhost/foo/bar").url("").build().unwrap();
        assert_eq!(req.handler_path(), "/foo/bar");
        assert_eq!(req.url().path(), "");
    }

    #[test]
    fn test_handler_path_must_be_a_prefix() {
        let err = request("http://localhost/foo/bar").handler_path("/baz").build().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_relative_handler_path_is_rejected() {
        let err = request("http://localhost/foo/bar").handler_path("foo").build().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_url_must_be_relative_to_path_boundary() {
        let err = request("http://localhost/foobar").url("bar").build().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_url_must_be_a_suffix() {
        let err = request("http://localhost/foo/bar").url("baz").build().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_url_must_share_the_query() {
        let err = request("http://localhost/foo/bar?a=1").url("bar?a=2").build().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_url_may_not_carry_a_scheme_or_authority() {
        assert!(request("http://localhost/foo").url("http://localhost/foo").build().is_err());
        assert!(request("http://localhost/foo").url("//localhost/foo").build().is_err());
        assert!(request("http://localhost/foo").url("foo#frag").build().is_err());
    }

    #[test]
    fn test_url_may_not_be_absolute_path() {
        let err = request("http://localhost/foo").url("/foo").build().unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_inconsistent_handler_path_and_url_are_rejected() {
        let err = request("http://localhost/a/b/c")
            .handler_path("/a/")
            .url("c")
            .build()
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_change_path_advances_handler_path() {
        let req = request("http://localhost/static/dir/file.html")
            .handler_path("/static/")
            .url("dir/file.html")
            .build()
            .unwrap();
        let copy = req.change(Changes::new().path("dir")).unwrap();
        assert_eq!(copy.handler_path(), "/static/dir/");
        assert_eq!(copy.url().path(), "file.html");
        assert_eq!(req.handler_path(), "/static/");
    }

    #[test]
    fn test_change_path_past_the_end_is_rejected() {
        let req = request("http://localhost/static/file").handler_path("/static/").build().unwrap();
        let err = req.change(Changes::new().path("other")).unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn test_change_removes_header_without_touching_original() {
        let req = request("http://localhost/").header("X", "1").build().unwrap();
        let copy = req.change(Changes::new().remove_header("x")).unwrap();
        assert!(!copy.headers().contains("X"));
        assert_eq!(req.headers().get("X"), Some("1"));
    }

    #[test]
    fn test_change_merges_context() {
        let req = request("http://localhost/")
            .context_value("a", 1u8)
            .context_value("b", 2u8)
            .build()
            .unwrap();
        let copy = req
            .change(Changes::new().remove_context("a").context("c", 3u8))
            .unwrap();
        assert!(!copy.context().contains_key("a"));
        assert_eq!(copy.context().get::<u8>("b"), Some(&2));
        assert_eq!(copy.context().get::<u8>("c"), Some(&3));
        assert_eq!(req.context().get::<u8>("a"), Some(&1));
    }

    #[tokio::test]
    async fn test_change_shares_the_unread_body() {
        let req = request("http://localhost/").body("hello").build().unwrap();
        let copy = req.change(Changes::new().header("X-New", "1")).unwrap();
        assert!(copy.body().same_as(req.body()));
        assert_eq!(copy.read_as_string(None).await.unwrap(), "hello");
        assert!(matches!(req.read(), Err(e) if e.is_invalid_state()));
    }

    #[tokio::test]
    async fn test_change_with_new_body_fixes_length() {
        let req = request("http://localhost/").body("hello").build().unwrap();
        let copy = req.change(Changes::new().body("hello world")).unwrap();
        assert_eq!(copy.headers().get("content-length"), Some("11"));
        assert_eq!(req.headers().get("content-length"), Some("5"));
        assert_eq!(copy.read_as_string(None).await.unwrap(), "hello world");
    }

    #[test]
    fn test_if_modified_since() {
        let req = request("http://localhost/")
            .header("If-Modified-Since", "Sun, 06 Nov 1994 08:49:37 GMT")
            .build()
            .unwrap();
        let expected = UNIX_EPOCH + Duration::from_secs(784111777);
        assert_eq!(req.if_modified_since().unwrap(), Some(expected));
        assert_eq!(req.if_modified_since().unwrap(), Some(expected));

        let absent = Request::new("GET", "http://localhost/").unwrap();
        assert_eq!(absent.if_modified_since().unwrap(), None);
    }

    #[test]
    fn test_malformed_if_modified_since_surfaces_parse_error() {
        let req = request("http://localhost/")
            .header("If-Modified-Since", "last tuesday")
            .build()
            .unwrap();
        assert!(matches!(req.if_modified_since(), Err(Error::InvalidDate(_))));
    }

    #[test]
    fn test_hijack_without_adapter_support_fails() {
        let req = Request::new("GET", "http://localhost/").unwrap();
        assert!(!req.can_hijack());
        let err = req.hijack(|_conn| async {}).unwrap_err();
        assert!(err.is_invalid_state());
    }

    #[tokio::test]
    async fn test_hijack_is_single_shot_across_copies() {
        let req = request("http://localhost/")
            .on_hijack(|_callback| {})
            .build()
            .unwrap();
        let copy = req.change(Changes::new()).unwrap();
        assert!(copy.can_hijack());

        copy.hijack(|_conn| async {}).unwrap();
        assert!(!req.can_hijack());
        assert!(req.hijack(|_conn| async {}).unwrap_err().is_invalid_state());
        assert!(copy.hijack(|_conn| async {}).unwrap_err().is_invalid_state());
    }

    #[cfg(feature = "tracing")]
    #[tokio::test]
    async fn test_refused_hijacks_are_logged_as_warnings() {
        use std::sync::Mutex;
        use tracing_subscriber::layer::SubscriberExt;

        #[derive(Clone, Default)]
        struct WarnCount(Arc<Mutex<usize>>);

        impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCount {
            fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
                if *event.metadata().level() == tracing::Level::WARN {
                    *self.0.lock().unwrap() += 1;
                }
            }
        }

        let warnings = WarnCount::default();
        let subscriber = tracing_subscriber::registry().with(warnings.clone());
        let _guard = tracing::subscriber::set_default(subscriber);

        let unsupported = Request::new("GET", "http://localhost/").unwrap();
        assert!(unsupported.hijack(|_conn| async {}).is_err());
        assert_eq!(*warnings.0.lock().unwrap(), 1);

        let req = request("http://localhost/").on_hijack(|_callback| {}).build().unwrap();
        req.hijack(|_conn| async {}).unwrap();
        assert!(req.hijack(|_conn| async {}).is_err());
        assert_eq!(*warnings.0.lock().unwrap(), 2);
    }

    #[test]
    fn test_url_with_unencoded_characters_matches_encoded_path() {
        let req = request("http://localhost/a b/c d?x=1 2").url("c d?x=1 2").build().unwrap();
        assert_eq!(req.handler_path(), "/a%20b/");
        assert_eq!(req.url().path(), "c%20d");
        assert_eq!(req.url().query(), Some("x=1%202"));
    }

    fn path_segment() -> impl Strategy<Value = String> {
        "[a-z0-9][a-z0-9._-]{0,6}"
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Splitting at any segment boundary reconstructs the path, whether
        /// the split is given as handler_path, as url, or both
        #[test]
        fn prop_split_reconstructs_requested_path(
            segs in prop::collection::vec(path_segment(), 1..6),
            split in 0usize..6,
            trailing_slash in any::<bool>(),
        ) {
            let split = split.min(segs.len());
            let mut full = format!("/{}", segs.join("/"));
            if trailing_slash {
                full.push('/');
            }
            let uri = format!("http://localhost{full}");

            let handler_path = if split == 0 {
                "/".to_string()
            } else {
                format!("/{}/", segs[..split].join("/"))
            };
            prop_assume!(full.starts_with(&handler_path));
            let url = full[handler_path.len()..].to_string();

            let by_handler = request(&uri).handler_path(handler_path.clone()).build().unwrap();
            let by_url = request(&uri).url(url.clone()).build().unwrap();
            let by_both = request(&uri)
                .handler_path(handler_path.clone())
                .url(url.clone())
                .build()
                .unwrap();

            for req in [&by_handler, &by_both] {
                prop_assert_eq!(req.handler_path(), handler_path.as_str());
                prop_assert_eq!(req.url().path(), url.as_str());
            }
            let rebuilt = format!("{}{}", by_url.handler_path(), by_url.url().path());
            prop_assert_eq!(rebuilt, full);
        }

        /// A handler path that is not on a segment boundary never constructs
        #[test]
        fn prop_misaligned_url_is_rejected(
            head in path_segment(),
            tail in "[a-z]{1,4}",
        ) {
            let uri = format!("http://localhost/{head}{tail}");
            prop_assert!(request(&uri).url(tail).build().is_err());
        }
    }
}
