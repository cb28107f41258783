//! The uniform JSON body every resource handler answers with.
//!
//! ```json
//! {"code": 200, "data": {"id": 1}}
//! {"code": 422, "message": "user already exists"}
//! ```
//!
//! Success and failure share one shape and differ only in which optional
//! fields are present. The HTTP status of the response mirrors `code`.

use http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::response::{IntoResponse, Response};

/// `{code, message?, data?}` with `data` typed by the handler.
#[derive(Debug, Serialize)]
pub struct Envelope<T = ()> {
    #[serde(serialize_with = "status_as_u16")]
    code: StatusCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl<T> Envelope<T> {
    /// `200` carrying `data`.
    pub fn ok(data: T) -> Self {
        Self { code: StatusCode::OK, message: None, data: Some(data) }
    }

    /// Any status with a human-readable message and no payload.
    pub fn message(code: StatusCode, message: impl Into<String>) -> Self {
        Self { code, message: Some(message.into()), data: None }
    }

    pub fn code(&self) -> StatusCode { self.code }
    pub fn message_text(&self) -> Option<&str> { self.message.as_deref() }
    pub fn data(&self) -> Option<&T> { self.data.as_ref() }
}

fn status_as_u16<S: serde::Serializer>(code: &StatusCode, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u16(code.as_u16())
}

/// Serializes to JSON. A payload that refuses to serialize becomes a bare
/// `500`; the serde error is logged, never sent.
impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self) {
            Ok(body) => Response::builder().status(self.code).json(body),
            Err(e) => {
                error!(error = %e, code = self.code.as_u16(), "failed to encode response envelope");
                Response::internal_error()
            }
        }
    }
}
