//! Handing the raw connection over to a handler
//!
//! A transport adapter that is willing to give up its connection supplies an
//! [`OnHijack`] function when it builds the request. [`Request::hijack`]
//! passes the handler's callback to that function exactly once, on a
//! separate task, and returns a [`Hijacked`] token that the handler returns
//! in place of a response.
//!
//! [`Request::hijack`]: crate::Request::hijack

use crate::error::{Error, Result};
use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::{Mutex, PoisonError};
use tokio::io::{AsyncRead, AsyncWrite};

/// A bidirectional byte channel standing in for the raw connection
pub trait RawConnection: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> RawConnection for T {}

/// The connection handed to a hijack callback
pub type Connection = Box<dyn RawConnection>;

/// A handler's callback that takes over the connection
pub type HijackCallback = Box<dyn FnOnce(Connection) -> BoxFuture<'static, ()> + Send>;

/// Supplied by the adapter: obtains the raw connection and runs the callback
pub type OnHijack = Box<dyn FnOnce(HijackCallback) + Send>;

/// Proof that a request was hijacked
///
/// Only [`Request::hijack`](crate::Request::hijack) creates one, so an
/// adapter that receives it knows the connection has been taken over and must
/// not write a response.
#[derive(Debug)]
pub struct Hijacked {
    _private: (),
}

/// One-shot hijack capability, shared by a request and every copy derived
/// from it
pub(crate) struct HijackHandle {
    on_hijack: Mutex<Option<OnHijack>>,
}

impl HijackHandle {
    pub(crate) fn new(on_hijack: OnHijack) -> Self {
        Self {
            on_hijack: Mutex::new(Some(on_hijack)),
        }
    }

    pub(crate) fn is_available(&self) -> bool {
        self.on_hijack
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Mark the capability used and schedule `callback` on the runtime
    pub(crate) fn run(&self, callback: HijackCallback) -> Result<Hijacked> {
        let mut slot = self.on_hijack.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_none() {
            return Err(Error::invalid_state("This request has already been hijacked."));
        }

        // The capability stays available if there is nowhere to spawn.
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            Error::invalid_state("hijacking requires a running tokio runtime")
        })?;

        let on_hijack = slot
            .take()
            .ok_or_else(|| Error::invalid_state("This request has already been hijacked."))?;
        drop(slot);

        // Deferred so the adapter never runs inside the handler's stack.
        runtime.spawn(async move {
            on_hijack(callback);
        });

        Ok(Hijacked { _private: () })
    }
}

impl fmt::Debug for HijackHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HijackHandle")
            .field("available", &self.is_available())
            .finish()
    }
}
