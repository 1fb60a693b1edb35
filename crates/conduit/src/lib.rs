//! # Conduit
//!
//! Immutable HTTP messages for composable handlers and middleware.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use conduit::prelude::*;
//!
//! let handler = Pipeline::new()
//!     .add_middleware(LogRequests::new())
//!     .handler(|req: Request| async move {
//!         match req.url().path() {
//!             "" => Response::ok("Hello, World!").build(),
//!             _ => Response::not_found(()).build(),
//!         }
//!     });
//! ```
//!
//! A transport adapter converts what it received with
//! [`request_from_http`], calls the handler, and writes what
//! [`dispatch`] returns.
//!
//! ## Optional Features
//!
//! - `tracing` (default) - debug events for body reads, header
//!   reconciliation, and hijacking
//! - `test-utils` - [`TestClient`] for driving handlers in memory

// Re-export core functionality
pub use conduit_core::*;

// Re-export commonly used crates
pub use http;
pub use tokio;
pub use tracing;

/// Prelude module - import everything you need with `use conduit::prelude::*`
pub mod prelude {
    pub use conduit_core::{
        Body, BodyInput, Changes, Context, Encoding, Error, Handled, Handler, Headers, Hijacked,
        LogRequests, Middleware, Next, Pipeline, Request, Response, Result,
    };

    #[cfg(feature = "test-utils")]
    pub use conduit_core::{TestClient, TestRequest, TestResponse};
}
