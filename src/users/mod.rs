//! The user resource: records, their storage, and the HTTP surface over both.
//!
//! ```rust
//! use std::sync::Arc;
//! use roster::Router;
//! use roster::users::{MemoryStore, UserHandler};
//!
//! let users = UserHandler::new(Arc::new(MemoryStore::new()));
//! let router = users.routes(Router::new());
//! assert_eq!(router.len(), 5);
//! ```

mod handler;
mod model;
mod store;

pub use handler::{ApiError, UserHandler};
pub use model::User;
pub use store::{MemoryStore, StoreError, UserStore};
