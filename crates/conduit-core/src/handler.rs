//! Handler trait and the outcome of handling a request

use crate::error::Result;
use crate::hijack::Hijacked;
use crate::request::Request;
use crate::response::Response;
use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::future::Future;

/// What a handler produced: a response to send, or proof that the handler
/// took over the connection
#[derive(Debug)]
pub enum Handled {
    Response(Response),
    Hijacked(Hijacked),
}

impl Handled {
    pub fn is_hijacked(&self) -> bool {
        matches!(self, Handled::Hijacked(_))
    }

    /// The response, if one was produced
    pub fn into_response(self) -> Option<Response> {
        match self {
            Handled::Response(response) => Some(response),
            Handled::Hijacked(_) => None,
        }
    }
}

impl From<Response> for Handled {
    fn from(response: Response) -> Self {
        Handled::Response(response)
    }
}

impl From<Hijacked> for Handled {
    fn from(hijacked: Hijacked) -> Self {
        Handled::Hijacked(hijacked)
    }
}

/// Something that turns a request into a [`Handled`] outcome
///
/// Any `Fn(Request) -> impl Future<Output = Result<R>>` where `R` converts
/// into [`Handled`] is a handler:
///
/// ```rust,ignore
/// let hello = |_req: Request| async { Response::ok("hello").build() };
/// ```
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture<'static, Result<Handled>>;
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Into<Handled>,
{
    fn call(&self, req: Request) -> BoxFuture<'static, Result<Handled>> {
        self(req).map(|result| result.map(Into::into)).boxed()
    }
}
