//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! Handlers build a [`Response`] (or anything that converts into one) and
//! return it. The router turns it into a hyper response at the edge.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use http_body_util::Full;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// An outgoing HTTP response.
///
/// # Shortcuts (200 OK)
///
/// ```rust
/// use roster::Response;
/// use http::StatusCode;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
/// ```
///
/// # Builder (custom status or headers)
///
/// ```rust
/// use roster::Response;
/// use http::{header, HeaderValue, StatusCode};
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header(header::LOCATION, HeaderValue::from_static("/users/42"))
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: HeaderMap::new(), status: StatusCode::OK }
    }

    /// `404` for requests no route claimed.
    pub(crate) fn not_found() -> Self {
        Self::builder().status(StatusCode::NOT_FOUND).text("404 page not found")
    }

    /// `500` with a fixed body. Whatever went wrong stays in the logs.
    pub(crate) fn internal_error() -> Self {
        Self::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .text("internal server error")
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Header lookup. Non-UTF-8 values read as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Converts into the hyper response written to the wire.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut res = http::Response::new(Full::new(self.body));
        *res.status_mut() = self.status;
        *res.headers_mut() = self.headers;
        res
    }
}

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: HeaderMap,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Terminate with a JSON body (`application/json`).
    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(JSON, body.into())
    }

    /// Terminate with a plain-text body (`text/plain; charset=utf-8`).
    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(TEXT, Bytes::from(body.into()))
    }

    /// Terminate with no body.
    pub fn no_body(self) -> Response {
        Response { status: self.status, headers: self.headers, body: Bytes::new() }
    }

    fn finish(mut self, content_type: &'static str, body: Bytes) -> Response {
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        Response { status: self.status, headers: self.headers, body }
    }
}

/// Conversion into an HTTP [`Response`].
///
/// Anything a handler returns implements this. The envelope type and the
/// user API's error type are the main implementors outside this module.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

/// Lets handlers use `?`: both arms already know how to render themselves.
impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: IntoResponse,
{
    fn into_response(self) -> Response {
        match self {
            Ok(v) => v.into_response(),
            Err(e) => e.into_response(),
        }
    }
}
