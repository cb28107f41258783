use std::sync::Arc;

use http::StatusCode;
use tracing::debug;

use super::model::User;
use super::store::{StoreError, UserStore};
use crate::envelope::Envelope;
use crate::handler::Handler;
use crate::request::{ParamError, Request};
use crate::response::{IntoResponse, Response};
use crate::router::Router;

/// `/users` and `/users/` (any number of trailing slashes).
const COLLECTION: &str = r"^/users/*$";

/// `/users/{id}`. Any segment is captured so that a malformed id is
/// answered by the handler as such instead of falling through to a 404.
const MEMBER: &str = r"^/users/([^/]+)$";

const DELETED: &str = "user deleted successfully";

/// Everything a user endpoint can answer besides success.
///
/// Malformed input is a `400`, domain refusals (duplicate id, missing
/// record) are a `422`. Both are rendered as an [`Envelope`] message.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The body is not a JSON user.
    #[error("{0}")]
    BadBody(#[from] serde_json::Error),

    /// The path segment is not an integer id.
    #[error("invalid user id: {0}")]
    BadId(#[from] ParamError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadBody(_) | Self::BadId(_) => StatusCode::BAD_REQUEST,
            Self::Store(_) => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        Envelope::<()>::message(self.status(), self.to_string()).into_response()
    }
}

/// HTTP surface of the user resource over any [`UserStore`].
pub struct UserHandler<S> {
    store: Arc<S>,
}

impl<S: UserStore> UserHandler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Registers the five user routes on `router`.
    ///
    /// The collection and member patterns never overlap, so registration
    /// order between them does not matter.
    pub fn routes(self, router: Router) -> Router {
        let this = Arc::new(self);
        router
            .post(COLLECTION, bind(Arc::clone(&this), Self::create))
            .get(COLLECTION, bind(Arc::clone(&this), Self::list))
            .get(MEMBER, bind(Arc::clone(&this), Self::get))
            .put(MEMBER, bind(Arc::clone(&this), Self::update))
            .delete(MEMBER, bind(Arc::clone(&this), Self::delete))
    }

    fn create(&self, req: &Request) -> Result<Envelope<User>, ApiError> {
        let user: User = req.json()?;
        let created = self.store.create(user)?;
        debug!(id = created.id, "user created");
        Ok(Envelope::ok(created))
    }

    fn list(&self, _req: &Request) -> Envelope<Vec<User>> {
        Envelope::ok(self.store.list())
    }

    fn get(&self, req: &Request) -> Result<Envelope<User>, ApiError> {
        let id = user_id(req)?;
        Ok(Envelope::ok(self.store.get(id)?))
    }

    fn update(&self, req: &Request) -> Result<Envelope<User>, ApiError> {
        let id = user_id(req)?;
        let changes: User = req.json()?;
        let updated = self.store.update(id, changes)?;
        debug!(id, "user updated");
        Ok(Envelope::ok(updated))
    }

    fn delete(&self, req: &Request) -> Result<Envelope, ApiError> {
        let id = user_id(req)?;
        self.store.delete(id);
        debug!(id, "user deleted");
        Ok(Envelope::message(StatusCode::OK, DELETED))
    }
}

/// Ids are written as plain decimal, with `-` as the only sign, so each
/// record has exactly one member path.
fn user_id(req: &Request) -> Result<i64, ParamError> {
    let raw = req.last_param()?;
    if raw.starts_with('+') {
        return Err(ParamError::Invalid {
            value: raw.to_owned(),
            reason: "explicit '+' sign is not allowed".to_owned(),
        });
    }
    req.parse_last_param()
}

/// Adapts a synchronous `UserHandler` method into a route handler that
/// shares the handler instance.
fn bind<S, F, R>(this: Arc<UserHandler<S>>, op: F) -> impl Handler
where
    S: UserStore,
    F: Fn(&UserHandler<S>, &Request) -> R + Copy + Send + Sync + 'static,
    R: IntoResponse + Send + 'static,
{
    move |req: Request| {
        let this = Arc::clone(&this);
        async move { op(&*this, &req) }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};

    use super::*;
    use crate::users::MemoryStore;

    /// Counts every call that reaches the backend.
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        calls: AtomicUsize,
    }

    impl CountingStore {
        fn touch(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl UserStore for CountingStore {
        fn create(&self, user: User) -> Result<User, StoreError> {
            self.touch();
            self.inner.create(user)
        }
        fn list(&self) -> Vec<User> {
            self.touch();
            self.inner.list()
        }
        fn get(&self, id: i64) -> Result<User, StoreError> {
            self.touch();
            self.inner.get(id)
        }
        fn update(&self, id: i64, changes: User) -> Result<User, StoreError> {
            self.touch();
            self.inner.update(id, changes)
        }
        fn delete(&self, id: i64) {
            self.touch();
            self.inner.delete(id)
        }
    }

    fn app() -> (Arc<CountingStore>, Router) {
        let store = Arc::new(CountingStore::default());
        let router = UserHandler::new(Arc::clone(&store)).routes(Router::new());
        (store, router)
    }

    async fn call(router: &Router, method: &str, uri: &str, body: &str) -> (StatusCode, Value) {
        let req = http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::from(body.to_owned()))
            .unwrap();
        let res = router.dispatch(req).await;
        assert_eq!(res.header("content-type"), Some("application/json"));
        (res.status_code(), serde_json::from_slice(res.body()).unwrap())
    }

    const ADA: &str = r#"{"id":1,"name":"Ada","email":"a@x.com","phoneNumber":"555"}"#;

    #[tokio::test]
    async fn create_echoes_the_record() {
        let (_, router) = app();
        let (status, body) = call(&router, "POST", "/users", ADA).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({
            "code": 200,
            "data": {"id": 1, "name": "Ada", "email": "a@x.com", "phoneNumber": "555"}
        }));
    }

    #[tokio::test]
    async fn duplicate_create_is_422() {
        let (_, router) = app();
        call(&router, "POST", "/users", ADA).await;
        let (status, body) = call(&router, "POST", "/users/", ADA).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({"code": 422, "message": "user already exists"}));
    }

    #[tokio::test]
    async fn undecodable_body_is_400_with_parse_message() {
        let (store, router) = app();
        for body in ["", "{not json", r#"{"id":"one"}"#] {
            let (status, json) = call(&router, "POST", "/users", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["code"], 400);
            assert!(!json["message"].as_str().unwrap().is_empty());
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn malformed_id_never_reaches_storage() {
        let (store, router) = app();
        for (method, body) in [("GET", ""), ("PUT", ADA), ("DELETE", "")] {
            let (status, json) = call(&router, method, "/users/abc", body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(json["message"].as_str().unwrap().starts_with("invalid user id: "));
        }
        let (status, _) = call(&router, "GET", "/users/99999999999999999999", "").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn plus_signed_id_is_not_an_alias() {
        let (_, router) = app();
        call(&router, "POST", "/users", ADA).await;

        for method in ["GET", "DELETE"] {
            let (status, json) = call(&router, method, "/users/+1", "").await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert!(json["message"].as_str().unwrap().contains("'+'"));
        }
        let (status, body) = call(&router, "GET", "/users/1", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["name"], "Ada");
    }

    #[tokio::test]
    async fn missing_record_is_422_not_found() {
        let (_, router) = app();
        let (status, body) = call(&router, "GET", "/users/1", "").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body, json!({"code": 422, "message": "user not found"}));

        let (status, body) = call(&router, "PUT", "/users/1", r#"{"name":"x"}"#).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["message"], "user not found");
    }

    #[tokio::test]
    async fn update_takes_id_from_path_and_replaces_fields() {
        let (_, router) = app();
        call(&router, "POST", "/users", ADA).await;

        let (status, body) =
            call(&router, "PUT", "/users/1", r#"{"id":42,"name":"Ada L.","email":"l@x.com"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!({"id": 1, "name": "Ada L.", "email": "l@x.com", "phoneNumber": ""}));

        let (status, _) = call(&router, "GET", "/users/42", "").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn update_with_bad_body_is_400() {
        let (_, router) = app();
        call(&router, "POST", "/users", ADA).await;
        let (status, _) = call(&router, "PUT", "/users/1", "[]").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let (_, router) = app();
        call(&router, "POST", "/users", ADA).await;

        for _ in 0..2 {
            let (status, body) = call(&router, "DELETE", "/users/1", "").await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body, json!({"code": 200, "message": "user deleted successfully"}));
        }
    }

    #[tokio::test]
    async fn list_starts_empty() {
        let (_, router) = app();
        let (status, body) = call(&router, "GET", "/users", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"code": 200, "data": []}));
    }

    #[test]
    fn error_classes_map_to_statuses() {
        let bad_body = serde_json::from_str::<User>("nope").unwrap_err();
        assert_eq!(ApiError::from(bad_body).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(ParamError::Missing).status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::from(StoreError::NotFound).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(ApiError::from(StoreError::AlreadyExists).to_string(), "user already exists");
    }
}
