//! Unified error type.

/// The error type returned by roster's fallible infrastructure operations.
///
/// Request-level failures (400, 404, 422, 500) are expressed as HTTP
/// [`Response`](crate::Response) values, never as `Error`s. This type
/// surfaces what can go wrong around the requests: binding a port,
/// accepting a connection, or compiling a route pattern.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid route pattern `{pattern}`: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}
