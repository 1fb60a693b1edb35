//! Conversions between `http` types and conduit messages
//!
//! A transport adapter turns what it received into a [`Request`] with
//! [`request_from_http`], runs a handler, and turns the outcome back into
//! something it can write with [`dispatch`]. A hijacked outcome maps to
//! [`Dispatch::Hijacked`]: the adapter writes nothing and leaves the
//! connection to the hijack callback.

use crate::body::{BodyInput, ByteStream};
use crate::error::{Error, Result};
use crate::handler::{Handled, Handler};
use crate::headers::Headers;
use crate::hijack::OnHijack;
use crate::request::Request;
use crate::response::Response;
use http::{header, Version};
use std::fmt;

/// Build a [`Request`] from the parts of an `http::Request`
///
/// Origin-form request targets are made absolute with `scheme` and the
/// `Host` header. Header values that are not valid UTF-8 are read lossily.
pub fn request_from_http(
    parts: http::request::Parts,
    body: impl Into<BodyInput>,
    scheme: &str,
    on_hijack: Option<OnHijack>,
) -> Result<Request> {
    let requested_uri = absolute_uri(&parts, scheme)?;

    let headers = Headers::from_pairs(parts.headers.keys().map(|name| {
        let values = parts
            .headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>();
        (name.as_str().to_owned(), values)
    }));

    let mut builder = Request::builder(parts.method.as_str(), requested_uri)
        .protocol_version(protocol_version(parts.version))
        .headers(headers)
        .body(body);
    if let Some(on_hijack) = on_hijack {
        builder = builder.on_hijack(on_hijack);
    }
    builder.build()
}

fn absolute_uri(parts: &http::request::Parts, scheme: &str) -> Result<String> {
    if parts.uri.scheme().is_some() && parts.uri.authority().is_some() {
        return Ok(parts.uri.to_string());
    }
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| {
            Error::invalid_argument(format!(
                "request target \"{}\" is not absolute and there is no usable Host header.",
                parts.uri
            ))
        })?;
    let path_and_query = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
    Ok(format!("{scheme}://{host}{path_and_query}"))
}

fn protocol_version(version: Version) -> &'static str {
    if version == Version::HTTP_09 {
        "0.9"
    } else if version == Version::HTTP_10 {
        "1.0"
    } else if version == Version::HTTP_2 {
        "2"
    } else if version == Version::HTTP_3 {
        "3"
    } else {
        "1.1"
    }
}

/// Split a [`Response`] into `http` parts and its body stream
///
/// Every value of a multi-valued header is written as its own header line.
pub fn response_into_http(response: Response) -> Result<(http::response::Parts, ByteStream)> {
    let mut builder = http::Response::builder().status(response.status());
    for (name, values) in response.headers_all().iter() {
        for value in values {
            builder = builder.header(name, value.as_str());
        }
    }
    let (parts, ()) = builder.body(())?.into_parts();
    let body = response.read()?;
    Ok((parts, body))
}

/// What an adapter should do with a handler's outcome
pub enum Dispatch {
    /// Write this response
    Respond(http::response::Parts, ByteStream),
    /// The connection was taken over; write nothing
    Hijacked,
}

impl fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dispatch::Respond(parts, _) => f.debug_tuple("Respond").field(parts).finish(),
            Dispatch::Hijacked => f.write_str("Hijacked"),
        }
    }
}

pub fn dispatch(handled: Handled) -> Result<Dispatch> {
    match handled {
        Handled::Response(response) => {
            let (parts, body) = response_into_http(response)?;
            Ok(Dispatch::Respond(parts, body))
        }
        Handled::Hijacked(_) => Ok(Dispatch::Hijacked),
    }
}

/// Run `handler` on `request` and convert the outcome
pub async fn handle(handler: &dyn Handler, request: Request) -> Result<Dispatch> {
    let handled = handler.call(request).await?;
    dispatch(handled)
}
