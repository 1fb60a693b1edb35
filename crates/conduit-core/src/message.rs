//! The shared message core of requests and responses
//!
//! A [`Message`] owns one [`Body`], one [`Headers`], and one [`Context`]. On
//! construction the supplied headers are reconciled against the body so that
//! `content-length` and the `content-type` charset always describe the body
//! actually carried. Messages are never mutated; [`Changes`] describes a
//! derived copy.

use crate::body::{self, Body, BodyInput, ByteStream};
use crate::context::{Context, ContextValue};
use crate::encoding::Encoding;
use crate::error::{Error, Result};
use crate::headers::{Headers, IntoHeaderValues};
use std::any::Any;
use std::fmt;
use std::sync::{Arc, OnceLock};

const CONTENT_LENGTH: &str = "content-length";
const CONTENT_TYPE: &str = "content-type";
const TRANSFER_ENCODING: &str = "transfer-encoding";

/// Body, headers, and context of a request or response
pub struct Message {
    body: Body,
    headers: Headers,
    context: Context,
    content_type: OnceLock<Option<mime::Mime>>,
}

impl Message {
    /// Wrap `body` and reconcile `headers` against it
    pub fn new(
        body: impl Into<BodyInput>,
        encoding: Option<Encoding>,
        headers: Headers,
        context: Context,
    ) -> Result<Message> {
        let body = Body::new(body, encoding)?;
        let headers = adjust_headers(headers, &body)?;
        Ok(Message {
            body,
            headers,
            context,
            content_type: OnceLock::new(),
        })
    }

    /// Single-value view of the headers
    pub fn headers(&self) -> crate::headers::SingleValues<'_> {
        self.headers.single_values()
    }

    /// All header values
    pub fn headers_all(&self) -> &Headers {
        &self.headers
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// `content-length` as sent in the headers
    pub fn content_length(&self) -> Result<Option<u64>> {
        match self.headers.get(CONTENT_LENGTH) {
            None => Ok(None),
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Some)
                .map_err(|e| Error::invalid_header(CONTENT_LENGTH, e.to_string())),
        }
    }

    /// Parsed `content-type`, cached after the first successful parse
    pub fn mime_type(&self) -> Result<Option<&mime::Mime>> {
        if let Some(cached) = self.content_type.get() {
            return Ok(cached.as_ref());
        }
        let parsed = match self.headers.get(CONTENT_TYPE) {
            None => None,
            Some(raw) => Some(raw.parse::<mime::Mime>()?),
        };
        Ok(self.content_type.get_or_init(|| parsed).as_ref())
    }

    /// Encoding named by the `content-type` charset, if recognised
    pub fn encoding(&self) -> Result<Option<Encoding>> {
        Ok(self
            .mime_type()?
            .and_then(|m| m.get_param(mime::CHARSET))
            .and_then(|charset| Encoding::for_label(charset.as_str())))
    }

    /// Whether the body is known to be empty
    pub fn is_empty(&self) -> bool {
        self.body.content_length() == Some(0)
    }

    /// Take the body stream; may be called once across all copies sharing
    /// this body
    pub fn read(&self) -> Result<ByteStream> {
        self.body.read()
    }

    /// Drain the body and decode it
    ///
    /// Uses `encoding`, else the `content-type` charset, else UTF-8.
    pub async fn read_as_string(&self, encoding: Option<Encoding>) -> Result<String> {
        let encoding = match encoding {
            Some(encoding) => encoding,
            None => self.encoding()?.unwrap_or(Encoding::Utf8),
        };
        let stream = self.read()?;
        let bytes = body::collect(stream).await?;
        encoding.decode(&bytes)
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }

    /// Inputs for a derived message: merged headers and context plus either
    /// the replacement body or this message's body
    pub(crate) fn derive(&self, changes: MessageChanges) -> (BodyInput, Headers, Context) {
        let headers = self.headers.updated(changes.headers);
        let context = self.context.updated(changes.context);
        let body = changes
            .body
            .unwrap_or_else(|| BodyInput::Body(self.body.share()));
        (body, headers, context)
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Message")
            .field("headers", &self.headers)
            .field("context", &self.context)
            .field("body", &self.body)
            .finish()
    }
}

/// Describes a derived copy of a request or response
///
/// Header and context updates follow the same rule: setting a key replaces
/// it, removing a key drops it, keys not mentioned carry over unchanged.
#[derive(Debug, Default)]
pub struct Changes {
    pub(crate) message: MessageChanges,
    pub(crate) path: Option<String>,
}

#[derive(Default)]
pub(crate) struct MessageChanges {
    pub(crate) headers: Vec<(String, Option<Vec<String>>)>,
    pub(crate) context: Vec<(String, Option<ContextValue>)>,
    pub(crate) body: Option<BodyInput>,
}

impl fmt::Debug for MessageChanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChanges")
            .field("headers", &self.headers)
            .field(
                "context",
                &self.context.iter().map(|(k, v)| (k, v.is_some())).collect::<Vec<_>>(),
            )
            .field("body", &self.body)
            .finish()
    }
}

impl Changes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a header, replacing every existing value for the name
    pub fn header(mut self, name: impl Into<String>, value: impl IntoHeaderValues) -> Self {
        self.message
            .headers
            .push((name.into(), Some(value.into_header_values())));
        self
    }

    /// Remove a header
    pub fn remove_header(mut self, name: impl Into<String>) -> Self {
        self.message.headers.push((name.into(), None));
        self
    }

    /// Set a context value
    pub fn context<T: Any + Send + Sync>(mut self, key: impl Into<String>, value: T) -> Self {
        self.message
            .context
            .push((key.into(), Some(Arc::new(value) as ContextValue)));
        self
    }

    /// Remove a context value
    pub fn remove_context(mut self, key: impl Into<String>) -> Self {
        self.message.context.push((key.into(), None));
        self
    }

    /// Replace the body
    pub fn body(mut self, body: impl Into<BodyInput>) -> Self {
        self.message.body = Some(body.into());
        self
    }

    /// Append to a request's handler path; only meaningful for requests
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

/// Reconcile headers against the body they accompany
pub(crate) fn adjust_headers(headers: Headers, body: &Body) -> Result<Headers> {
    let same_encoding = same_encoding(&headers, body)?;
    let content_length = body.content_length();

    if same_encoding {
        let length_matches = match (content_length, headers.get(CONTENT_LENGTH)) {
            (None, _) => true,
            (Some(len), Some(existing)) => existing == len.to_string(),
            (Some(_), None) => false,
        };
        if length_matches {
            return Ok(headers);
        }
        if content_length == Some(0) && headers.is_empty() {
            return Ok(default_headers());
        }
    }

    let mut adjusted = headers.clone();

    if !same_encoding {
        if let Some(encoding) = body.encoding() {
            let content_type = match adjusted.get(CONTENT_TYPE) {
                None => format!("application/octet-stream; charset={}", encoding.name()),
                Some(existing) => with_charset(existing, encoding)?,
            };
            crate::trace_debug!(content_type = %content_type, "rewrote content-type charset to match body");
            adjusted = adjusted.with(CONTENT_TYPE, vec![content_type]);
        }
    }

    // A zero-length body does not clobber a length the caller set explicitly.
    let explicit_zero_override = content_length == Some(0) && headers.contains(CONTENT_LENGTH);

    if let Some(len) = content_length {
        if !explicit_zero_override {
            let identity = adjusted
                .get(TRANSFER_ENCODING)
                .map_or(true, |coding| coding.eq_ignore_ascii_case("identity"));
            if identity {
                adjusted = adjusted.with(CONTENT_LENGTH, vec![len.to_string()]);
            }
        }
    }

    Ok(adjusted)
}

fn same_encoding(headers: &Headers, body: &Body) -> Result<bool> {
    let Some(encoding) = body.encoding() else {
        return Ok(true);
    };
    let Some(content_type) = headers.get(CONTENT_TYPE) else {
        return Ok(false);
    };
    let mime: mime::Mime = content_type.parse()?;
    Ok(mime
        .get_param(mime::CHARSET)
        .and_then(|charset| Encoding::for_label(charset.as_str()))
        == Some(encoding))
}

fn default_headers() -> Headers {
    static DEFAULT: OnceLock<Headers> = OnceLock::new();
    DEFAULT
        .get_or_init(|| Headers::from_pairs([(CONTENT_LENGTH, "0")]))
        .clone()
}

/// Rewrite (or add) the charset parameter of a media type
fn with_charset(content_type: &str, encoding: Encoding) -> Result<String> {
    let mime: mime::Mime = content_type.parse()?;
    let mut out = mime.essence_str().to_owned();
    let mut replaced = false;
    for (name, value) in mime.params() {
        out.push_str("; ");
        out.push_str(name.as_str());
        out.push('=');
        if name.as_str().eq_ignore_ascii_case("charset") {
            out.push_str(encoding.name());
            replaced = true;
        } else {
            push_param_value(&mut out, value.as_str());
        }
    }
    if !replaced {
        out.push_str("; charset=");
        out.push_str(encoding.name());
    }
    Ok(out)
}

fn push_param_value(out: &mut String, value: &str) {
    let is_token = !value.is_empty()
        && value
            .bytes()
            .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?=".contains(&b));
    if is_token {
        out.push_str(value);
    } else {
        out.push('"');
        for c in value.chars() {
            if c == '"' || c == '\\' {
                out.push('\\');
            }
            out.push(c);
        }
        out.push('"');
    }
}
