//! HTTP method as a typed enum.
//!
//! Only the RFC 9110 methods are modelled. A request carrying any other
//! method (WebDAV verbs, `PURGE`, typos) converts to `None` and therefore
//! never matches a route; the router answers it like any other miss.

use std::fmt;
use std::str::FromStr;

/// A route-able HTTP method.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Method {
    Connect,
    Delete,
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Trace,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Delete  => "DELETE",
            Self::Get     => "GET",
            Self::Head    => "HEAD",
            Self::Options => "OPTIONS",
            Self::Patch   => "PATCH",
            Self::Post    => "POST",
            Self::Put     => "PUT",
            Self::Trace   => "TRACE",
        }
    }

    /// Maps hyper's open-ended method type onto the closed set above.
    pub fn from_http(method: &http::Method) -> Option<Self> {
        method.as_str().parse().ok()
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unsupported http method `{0}`")]
pub struct UnknownMethod(String);

/// Parses an uppercase method string. Case-sensitive per RFC 9110 §9.1.
impl FromStr for Method {
    type Err = UnknownMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CONNECT" => Ok(Self::Connect),
            "DELETE"  => Ok(Self::Delete),
            "GET"     => Ok(Self::Get),
            "HEAD"    => Ok(Self::Head),
            "OPTIONS" => Ok(Self::Options),
            "PATCH"   => Ok(Self::Patch),
            "POST"    => Ok(Self::Post),
            "PUT"     => Ok(Self::Put),
            "TRACE"   => Ok(Self::Trace),
            other     => Err(UnknownMethod(other.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
