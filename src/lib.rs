//! # roster
//!
//! In-memory user records over HTTP, dispatched by a small ordered router.
//!
//! ## The router
//!
//! Routes are `(method, regex, handler)` triples kept in registration
//! order. A request goes to the first route whose method matches and whose
//! pattern matches the whole path. That is all of the routing logic:
//!
//! - Linear scan, no specificity scoring: earlier registration wins.
//! - Capture groups become positional path parameters.
//! - A miss is a plain-text `404`; a panicking handler is a plain-text `500`.
//!
//! Everything resource-specific lives in handlers, which answer with a JSON
//! [`Envelope`]: `{"code": 200, "message": "...", "data": ...}`.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use roster::{Request, Router, Server};
//! use roster::users::{MemoryStore, UserHandler};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), roster::Error> {
//!     let router = UserHandler::new(Arc::new(MemoryStore::new()))
//!         .routes(Router::new())
//!         .get("^/ping$", pong);
//!
//!     Server::bind("0.0.0.0", 8000).serve(router).await
//! }
//!
//! async fn pong(_req: Request) -> &'static str {
//!     "pong"
//! }
//! ```

mod envelope;
mod error;
mod handler;
mod method;
mod request;
mod response;
mod router;
mod server;

pub mod config;
pub mod telemetry;
pub mod users;

pub use config::Config;
pub use envelope::Envelope;
pub use error::Error;
pub use handler::Handler;
pub use method::{Method, UnknownMethod};
pub use request::{ParamError, Request};
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::{DEFAULT_DRAIN_TIMEOUT, DEFAULT_MAX_BODY_BYTES, Server};
