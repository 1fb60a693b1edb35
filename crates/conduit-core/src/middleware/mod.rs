//! Middleware infrastructure for conduit
//!
//! A [`Middleware`] receives the request and the rest of the chain as
//! [`Next`]; it may answer on its own, change the request before passing it
//! on, or inspect what comes back. A [`Pipeline`] composes middleware around
//! a final handler.
//!
//! # Example
//!
//! ```rust,ignore
//! use conduit_core::middleware::{LogRequests, Pipeline};
//!
//! let handler = Pipeline::new()
//!     .add_middleware(LogRequests::new())
//!     .add_middleware(|req: Request, next: Next| async move {
//!         let req = req.change(Changes::new().context("seen", true))?;
//!         next.call(req).await
//!     })
//!     .handler(|_req: Request| async { Response::ok("hi").build() });
//! ```

mod log_requests;

pub use log_requests::LogRequests;

use crate::error::Result;
use crate::handler::{Handled, Handler};
use crate::request::Request;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// The remainder of the chain, as seen from a middleware
pub type Next = Arc<dyn Handler>;

/// Wraps a handler
pub trait Middleware: Send + Sync + 'static {
    /// Handle `req`, calling `next` to continue the chain
    fn call(&self, req: Request, next: Next) -> BoxFuture<'static, Result<Handled>>;
}

impl<F, Fut> Middleware for F
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Handled>> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture<'static, Result<Handled>> {
        self(req, next).boxed()
    }
}

/// An ordered stack of middleware
///
/// Middleware run in the order they are added: the first one added is the
/// outermost and sees the request first and the outcome last.
#[derive(Clone, Default)]
pub struct Pipeline {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_middleware(mut self, middleware: impl Middleware) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Wrap `handler` in every middleware of this pipeline
    pub fn handler(&self, handler: impl Handler) -> Arc<dyn Handler> {
        // Built inside out so the first middleware ends up outermost.
        let mut next: Next = Arc::new(handler);
        for middleware in self.middleware.iter().rev() {
            next = Arc::new(Layered {
                middleware: middleware.clone(),
                next,
            });
        }
        next
    }
}

struct Layered {
    middleware: Arc<dyn Middleware>,
    next: Next,
}

impl Handler for Layered {
    fn call(&self, req: Request) -> BoxFuture<'static, Result<Handled>> {
        self.middleware.call(req, self.next.clone())
    }
}
