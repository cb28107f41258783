//! Handler trait and type erasure.
//!
//! The route table holds handlers of many concrete types in one `Vec`, so
//! each handler is erased behind `dyn ErasedHandler` at registration time:
//!
//! ```text
//! async fn get_user(req: Request) -> Envelope<User> { … }
//!        ↓ router.get(r"^/users/(\d+)$", get_user)
//! Arc::new(FnHandler(get_user))          stored as BoxedHandler
//!        ↓ at dispatch
//! handler.call(req)                      one vtable call, boxed future
//! ```
//!
//! Per request the cost is one `Arc` clone and one virtual call.
//!
//! The erasure boundary is also the panic boundary: a handler that panics,
//! either while building its future or while it is polled, yields an opaque
//! `500` from [`ErasedHandler::call`] and the panic payload is logged.

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::error;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// Boxed, type-erased future resolving to a [`Response`].
pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe dispatch interface behind every registered handler.
///
/// `#[doc(hidden)] pub` only because it shows up in [`Handler`]'s signature.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared by every request that hits its route.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Never implemented by hand: any `Fn(Request) -> impl Future<Output = impl IntoResponse>`
/// that is `Send + Sync + 'static` qualifies, which covers plain `async fn`
/// items and closures returning `async move` blocks that capture shared
/// state:
///
/// ```rust
/// use std::sync::Arc;
/// use roster::{Request, Router};
///
/// let greeting = Arc::new(String::from("hi"));
/// let router = Router::new().get("^/hello$", move |_req: Request| {
///     let greeting = Arc::clone(&greeting);
///     async move { greeting.to_string() }
/// });
/// assert_eq!(router.len(), 1);
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler `F` into the trait-object world.
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = match panic::catch_unwind(AssertUnwindSafe(|| (self.0)(req))) {
            Ok(fut) => fut,
            Err(payload) => return Box::pin(async move { contained(payload) }),
        };
        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(out) => out.into_response(),
                Err(payload) => contained(payload),
            }
        })
    }
}

fn contained(payload: Box<dyn Any + Send>) -> Response {
    error!(panic = panic_message(payload.as_ref()), "handler panicked");
    Response::internal_error()
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&'static str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    use super::*;
    use crate::method::Method;

    fn request() -> Request {
        Request::new(Method::Get, "/".to_owned(), HeaderMap::new(), Bytes::new(), Vec::new())
    }

    #[tokio::test]
    async fn output_is_converted_into_a_response() {
        let handler = (|_: Request| async { StatusCode::CREATED }).into_boxed_handler();
        assert_eq!(handler.call(request()).await.status_code(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn panic_while_polled_is_a_500() {
        let handler = (|_: Request| async {
            if true {
                panic!("inside the future");
            }
            "unreachable"
        })
        .into_boxed_handler();
        let res = handler.call(request()).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(res.body(), b"internal server error");
    }

    #[tokio::test]
    async fn panic_before_the_future_exists_is_a_500() {
        fn eager(_: Request) -> std::future::Ready<&'static str> {
            panic!("while building the future")
        }
        let res = eager.into_boxed_handler().call(request()).await;
        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn panic_payloads_are_readable() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let fixed: Box<dyn Any + Send> = Box::new("fixed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(fixed.as_ref()), "fixed");
        assert_eq!(panic_message(other.as_ref()), "non-string panic payload");
    }
}
