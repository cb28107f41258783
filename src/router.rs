//! Ordered regular-expression request router.
//!
//! Routes are kept in registration order and scanned linearly. The first
//! entry whose method equals the request method and whose pattern matches
//! the *whole* path wins. There is no specificity scoring: register
//! overlapping patterns most-specific-first.
//!
//! Routing misses are answered here in plain text, because the router does
//! not know what body format its handlers speak. Handler panics become a
//! plain-text `500` one layer down, in [`crate::handler`].

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use regex::Regex;
use tracing::info;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;

struct Route {
    method: Method,
    pattern: Regex,
    handler: BoxedHandler,
}

/// The application router.
///
/// Build it once at startup, then hand it to [`Server::serve`](crate::Server::serve).
/// Every registration returns `self` so calls chain naturally.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a method + pattern pair. Returns `self` for chaining.
    ///
    /// `pattern` is a regular expression over the request path. It is
    /// anchored at both ends before compiling, so `/users` never matches
    /// `/users/1`. Capture groups become [`Request::param`] values:
    ///
    /// ```rust
    /// # use roster::{Method, Request, Router};
    /// # async fn get_user(_: Request) -> &'static str { "" }
    /// # async fn list_users(_: Request) -> &'static str { "" }
    /// let router = Router::new()
    ///     .on(Method::Get, r"^/users/(\d+)$", get_user)
    ///     .on(Method::Get, r"^/users/*$", list_users);
    /// assert_eq!(router.len(), 2);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regular expression. Routes are
    /// fixed at startup, so a bad pattern is a programming error; use
    /// [`Router::try_on`] to handle it instead.
    pub fn on(self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.try_on(method, pattern, handler)
            .unwrap_or_else(|e| panic!("{e}"))
    }

    /// Fallible form of [`Router::on`].
    pub fn try_on(mut self, method: Method, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        let compiled = Regex::new(&format!("^(?:{pattern})$")).map_err(|source| Error::Pattern {
            pattern: pattern.to_owned(),
            source,
        })?;
        self.routes.push(Route { method, pattern: compiled, handler: handler.into_boxed_handler() });
        Ok(self)
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Get, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Post, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Put, pattern, handler)
    }

    pub fn patch(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Patch, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::Delete, pattern, handler)
    }

    /// Number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// First route claiming `method` + `path`, with its capture groups
    /// (group 0, the whole match, is dropped).
    fn lookup(&self, method: Method, path: &str) -> Option<(BoxedHandler, Vec<Option<String>>)> {
        self.routes
            .iter()
            .filter(|route| route.method == method)
            .find_map(|route| {
                let caps = route.pattern.captures(path)?;
                let params = caps
                    .iter()
                    .skip(1)
                    .map(|group| group.map(|m| m.as_str().to_owned()))
                    .collect();
                Some((Arc::clone(&route.handler), params))
            })
    }

    /// Routes one request and produces one response.
    ///
    /// Never fails: a miss is `404`, a panicking handler is `500`, and the
    /// handler's own outcome is returned untouched otherwise.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> Response {
        let started = Instant::now();
        let (parts, body) = req.into_parts();
        let path = parts.uri.path().to_owned();

        let routed = Method::from_http(&parts.method)
            .and_then(|method| self.lookup(method, &path).map(|(h, caps)| (method, h, caps)));

        let response = match routed {
            Some((method, handler, captures)) => {
                let req = Request::new(method, path.clone(), parts.headers, body, captures);
                handler.call(req).await
            }
            None => Response::not_found(),
        };

        info!(
            method = %parts.method,
            path = %path,
            status = response.status_code().as_u16(),
            elapsed_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX),
            "request"
        );
        response
    }
}
