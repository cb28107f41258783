//! Incoming HTTP request type and path-parameter extraction.

use std::fmt::Display;
use std::str::FromStr;

use bytes::Bytes;
use http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::method::Method;

/// Why a path parameter could not be recovered from a matched route.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamError {
    /// The matched pattern has no capture group to read from.
    #[error("route pattern has no capture group")]
    Missing,

    /// The captured text did not parse into the requested type.
    #[error("{reason}")]
    Invalid { value: String, reason: String },
}

/// A routed HTTP request: the fully-read body plus the capture groups of
/// the pattern that selected the handler.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
    captures: Vec<Option<String>>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        headers: HeaderMap,
        body: Bytes,
        captures: Vec<Option<String>>,
    ) -> Self {
        Self { method, path, headers, body, captures }
    }

    pub fn method(&self) -> Method { self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// Returns capture group `index` of the matched pattern, numbered like
    /// regex groups (the first group is `1`). Groups that did not take part
    /// in the match are `None`.
    ///
    /// For a route `^/users/(\d+)$`, `req.param(1)` on `/users/42` returns `Some("42")`.
    pub fn param(&self, index: usize) -> Option<&str> {
        let slot = index.checked_sub(1)?;
        self.captures.get(slot)?.as_deref()
    }

    /// Returns the text of the pattern's last capture group.
    pub fn last_param(&self) -> Result<&str, ParamError> {
        match self.captures.last() {
            Some(Some(value)) => Ok(value.as_str()),
            Some(None) | None => Err(ParamError::Missing),
        }
    }

    /// Parses the last capture group into `T`, e.g. a numeric identifier.
    pub fn parse_last_param<T>(&self) -> Result<T, ParamError>
    where
        T: FromStr,
        T::Err: Display,
    {
        let raw = self.last_param()?;
        raw.parse().map_err(|e: T::Err| ParamError::Invalid {
            value: raw.to_owned(),
            reason: e.to_string(),
        })
    }
}
