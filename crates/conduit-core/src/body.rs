//! Linear message bodies
//!
//! A [`Body`] wraps a byte stream that can be handed out exactly once. The
//! first call to [`Body::read`] moves the stream out and leaves a sentinel
//! behind, so every later call fails with [`Error::InvalidState`] no matter
//! which message copy it is made through.

use crate::encoding::Encoding;
use crate::error::{BoxError, Error, Result};
use bytes::Bytes;
use futures_util::stream::{self, Stream, StreamExt};
use std::fmt;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};

/// A type-erased, fallible async stream of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, BoxError>> + Send>>;

/// The closed set of values a body can be built from
pub enum BodyInput {
    /// No body; length zero
    Empty,
    /// Text, encoded with the explicit encoding or UTF-8
    Text(String),
    /// Raw bytes
    Bytes(Bytes),
    /// A sequence of byte chunks, yielded in order
    Chunks(Vec<Bytes>),
    /// A stream of unknown length
    Stream(ByteStream),
    /// An existing body, passed through untouched
    Body(Body),
}

impl BodyInput {
    /// Wrap any fallible byte stream
    pub fn stream<S, E>(stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        BodyInput::Stream(Box::pin(stream.map(|chunk| chunk.map_err(Into::into))))
    }

    pub(crate) fn is_empty_input(&self) -> bool {
        matches!(self, BodyInput::Empty)
    }
}

impl fmt::Debug for BodyInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyInput::Empty => f.write_str("Empty"),
            BodyInput::Text(text) => f.debug_tuple("Text").field(text).finish(),
            BodyInput::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            BodyInput::Chunks(chunks) => f.debug_tuple("Chunks").field(&chunks.len()).finish(),
            BodyInput::Stream(_) => f.write_str("Stream(..)"),
            BodyInput::Body(body) => f.debug_tuple("Body").field(body).finish(),
        }
    }
}

impl From<()> for BodyInput {
    fn from(_: ()) -> Self {
        BodyInput::Empty
    }
}

impl From<&str> for BodyInput {
    fn from(text: &str) -> Self {
        BodyInput::Text(text.to_owned())
    }
}

impl From<String> for BodyInput {
    fn from(text: String) -> Self {
        BodyInput::Text(text)
    }
}

impl From<Bytes> for BodyInput {
    fn from(bytes: Bytes) -> Self {
        BodyInput::Bytes(bytes)
    }
}

impl From<Vec<u8>> for BodyInput {
    fn from(bytes: Vec<u8>) -> Self {
        BodyInput::Bytes(Bytes::from(bytes))
    }
}

impl From<&'static [u8]> for BodyInput {
    fn from(bytes: &'static [u8]) -> Self {
        BodyInput::Bytes(Bytes::from_static(bytes))
    }
}

impl From<Vec<Bytes>> for BodyInput {
    fn from(chunks: Vec<Bytes>) -> Self {
        BodyInput::Chunks(chunks)
    }
}

impl From<Vec<Vec<u8>>> for BodyInput {
    fn from(chunks: Vec<Vec<u8>>) -> Self {
        BodyInput::Chunks(chunks.into_iter().map(Bytes::from).collect())
    }
}

impl From<ByteStream> for BodyInput {
    fn from(stream: ByteStream) -> Self {
        BodyInput::Stream(stream)
    }
}

impl From<Body> for BodyInput {
    fn from(body: Body) -> Self {
        BodyInput::Body(body)
    }
}

impl<T: Into<BodyInput>> From<Option<T>> for BodyInput {
    fn from(value: Option<T>) -> Self {
        value.map_or(BodyInput::Empty, Into::into)
    }
}

struct BodyInner {
    stream: Mutex<Option<ByteStream>>,
    encoding: Option<Encoding>,
    content_length: Option<u64>,
}

/// The single-consumption payload of a message
///
/// Handles produced by [`Body::share`] refer to the same underlying stream:
/// a body carried forward through `change` stays one linear resource.
pub struct Body {
    inner: Arc<BodyInner>,
}

impl Body {
    /// Build a body from one of the accepted input shapes
    ///
    /// Text without an explicit encoding is encoded as UTF-8. Plain ASCII text
    /// declares no encoding; anything else declares UTF-8. Text that cannot be
    /// represented in an explicit encoding is rejected.
    pub fn new(input: impl Into<BodyInput>, encoding: Option<Encoding>) -> Result<Body> {
        let (stream, encoding, content_length): (ByteStream, Option<Encoding>, Option<u64>) =
            match input.into() {
                BodyInput::Body(body) => return Ok(body),
                BodyInput::Empty => (empty_stream(), encoding, Some(0)),
                BodyInput::Text(text) => {
                    let (encoded, encoding) = match encoding {
                        Some(encoding) => (encoding.encode(&text)?, Some(encoding)),
                        None => {
                            let encoded = Encoding::Utf8.encode(&text)?;
                            let declared = if is_plain_ascii(&encoded, text.chars().count()) {
                                None
                            } else {
                                Some(Encoding::Utf8)
                            };
                            (encoded, declared)
                        }
                    };
                    let len = encoded.len() as u64;
                    (once(encoded), encoding, Some(len))
                }
                BodyInput::Bytes(bytes) => {
                    let len = bytes.len() as u64;
                    (once(bytes), encoding, Some(len))
                }
                BodyInput::Chunks(chunks) => {
                    let len = chunks.iter().map(|c| c.len() as u64).sum();
                    let stream = stream::iter(chunks.into_iter().map(Ok::<Bytes, BoxError>));
                    (Box::pin(stream), encoding, Some(len))
                }
                BodyInput::Stream(stream) => (stream, encoding, None),
            };

        Ok(Body {
            inner: Arc::new(BodyInner {
                stream: Mutex::new(Some(stream)),
                encoding,
                content_length,
            }),
        })
    }

    /// Body with no content
    pub fn empty() -> Body {
        Body {
            inner: Arc::new(BodyInner {
                stream: Mutex::new(Some(empty_stream())),
                encoding: None,
                content_length: Some(0),
            }),
        }
    }

    /// Take the stream; fails if any handle to this body already took it
    pub fn read(&self) -> Result<ByteStream> {
        let mut slot = self
            .inner
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.take() {
            Some(stream) => {
                crate::trace_debug!(content_length = ?self.inner.content_length, "body stream taken");
                Ok(stream)
            }
            None => Err(Error::invalid_state(
                "The body has already been read; read() and read_as_string() may only be called once",
            )),
        }
    }

    /// Whether the stream has been handed out
    pub fn is_consumed(&self) -> bool {
        self.inner
            .stream
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// The declared text encoding, if any
    pub fn encoding(&self) -> Option<Encoding> {
        self.inner.encoding
    }

    /// The known length in bytes; `None` when the input was an open stream
    pub fn content_length(&self) -> Option<u64> {
        self.inner.content_length
    }

    /// Another handle to the same linear stream
    pub(crate) fn share(&self) -> Body {
        Body {
            inner: Arc::clone(&self.inner),
        }
    }

    #[cfg(test)]
    pub(crate) fn same_as(&self, other: &Body) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Body")
            .field("encoding", &self.inner.encoding)
            .field("content_length", &self.inner.content_length)
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

fn once(bytes: Bytes) -> ByteStream {
    Box::pin(stream::once(async move { Ok::<Bytes, BoxError>(bytes) }))
}

fn empty_stream() -> ByteStream {
    Box::pin(stream::empty::<Result<Bytes, BoxError>>())
}

fn is_plain_ascii(encoded: &[u8], char_count: usize) -> bool {
    encoded.len() == char_count && encoded.iter().all(u8::is_ascii)
}

/// Drain a stream into one contiguous buffer
pub(crate) async fn collect(mut stream: ByteStream) -> Result<Bytes> {
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk.map_err(Error::Body)?);
    }
    Ok(Bytes::from(buf))
}
