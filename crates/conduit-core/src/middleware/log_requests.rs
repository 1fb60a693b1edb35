//! Request logging middleware
//!
//! Emits one event per request with method, requested URI, status code, and
//! duration. Hijacked requests are logged as such, without a status.

use super::{Middleware, Next};
use crate::error::Result;
use crate::handler::Handled;
use crate::request::Request;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::time::Instant;
use tracing::{info_span, Instrument, Level};

/// Middleware that logs every request passing through it
///
/// # Example
///
/// ```rust,ignore
/// Pipeline::new()
///     .add_middleware(LogRequests::new().with_field("service", "files"))
///     .handler(handler)
/// ```
#[derive(Clone)]
pub struct LogRequests {
    level: Level,
    custom_fields: Vec<(String, String)>,
}

impl LogRequests {
    /// Log completed requests at INFO
    pub fn new() -> Self {
        Self::with_level(Level::INFO)
    }

    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            custom_fields: Vec::new(),
        }
    }

    /// Add a field to every event, e.g. a service name
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_fields.push((key.into(), value.into()));
        self
    }
}

impl Default for LogRequests {
    fn default() -> Self {
        Self::new()
    }
}

macro_rules! event_at {
    ($level:expr, $($rest:tt)+) => {
        match $level {
            Level::TRACE => tracing::trace!($($rest)+),
            Level::DEBUG => tracing::debug!($($rest)+),
            Level::INFO => tracing::info!($($rest)+),
            Level::WARN => tracing::warn!($($rest)+),
            _ => tracing::error!($($rest)+),
        }
    };
}

impl Middleware for LogRequests {
    fn call(&self, req: Request, next: Next) -> BoxFuture<'static, Result<Handled>> {
        let level = self.level;
        let method = req.method().to_string();
        let uri = req.requested_uri().to_string();
        let fields = self
            .custom_fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(" ");

        async move {
            let start = Instant::now();
            let span = info_span!("http_request", method = %method, uri = %uri);

            let outcome = next.call(req).instrument(span).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match &outcome {
                Ok(Handled::Response(response)) => {
                    let status = response.status();
                    if status.is_client_error() || status.is_server_error() {
                        tracing::warn!(
                            method = %method,
                            uri = %uri,
                            status = status.as_u16(),
                            duration_ms,
                            fields = %fields,
                            "Request failed"
                        );
                    } else {
                        event_at!(
                            level,
                            method = %method,
                            uri = %uri,
                            status = status.as_u16(),
                            duration_ms,
                            fields = %fields,
                            "Request completed"
                        );
                    }
                }
                Ok(Handled::Hijacked(_)) => {
                    event_at!(
                        level,
                        method = %method,
                        uri = %uri,
                        duration_ms,
                        fields = %fields,
                        "Request hijacked"
                    );
                }
                Err(error) => {
                    tracing::error!(
                        method = %method,
                        uri = %uri,
                        duration_ms,
                        fields = %fields,
                        error = %error,
                        "Request errored"
                    );
                }
            }

            outcome
        }
        .boxed()
    }
}
