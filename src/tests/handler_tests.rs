use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::api::app;
use crate::api::models::json_response;
use crate::core::models::User;
use crate::infrastructure::database::Client;
use crate::infrastructure::storage::SharedRepository;
use crate::tests::{
    CountingRepository, FailingRepository, STORE_FAILURE, SlowRepository, connect_test_database,
    test_state, test_state_with_timeout,
};

async fn setup() -> (Router, Arc<CountingRepository<User>>, Client) {
    let (client, database) = connect_test_database().await;
    let repository = Arc::new(CountingRepository::<User>::new(&database));
    let users: SharedRepository<User> = repository.clone();
    (app(test_state(database, users)), repository, client)
}

async fn send(
    router: &Router,
    method: Method,
    uri: &str,
    body: Option<&str>,
) -> (StatusCode, Option<String>, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        }
        None => Body::empty(),
    };
    let response = router.clone().oneshot(request.body(body).unwrap()).await.unwrap();

    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|value| value.to_str().unwrap().to_string());
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, content_type, json)
}

async fn create_user(router: &Router, body: Value) -> Value {
    let (status, _, json) = send(router, Method::POST, "/users", Some(&body.to_string())).await;
    assert_eq!(status, StatusCode::CREATED);
    json
}

#[tokio::test]
async fn test_create_user() {
    let (router, _, _client) = setup().await;

    let (status, content_type, body) = send(
        &router,
        Method::POST,
        "/users",
        Some(r#"{"email":"test@example.com","firstName":"Test","lastName":"User"}"#),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert!(!body["id"].as_str().unwrap().is_empty());
    assert_eq!(body["email"], "test@example.com");
    assert_eq!(body["firstName"], "Test");
    assert_eq!(body["lastName"], "User");
    assert_eq!(body["createdAt"], body["updatedAt"]);
}

#[tokio::test]
async fn test_create_user_ignores_caller_id() {
    let (router, _, _client) = setup().await;

    let body = create_user(&router, json!({ "id": "mine", "email": "test@example.com" })).await;

    assert_ne!(body["id"], "mine");
}

#[tokio::test]
async fn test_user_wire_shape_keeps_absent_names() {
    let (router, _, _client) = setup().await;

    let body = create_user(&router, json!({ "email": "test@example.com" })).await;

    let fields = body.as_object().unwrap();
    for key in ["id", "email", "firstName", "lastName", "createdAt", "updatedAt"] {
        assert!(fields.contains_key(key), "missing {}", key);
    }
    assert_eq!(body["firstName"], Value::Null);
    assert_eq!(body["lastName"], Value::Null);
}

#[tokio::test]
async fn test_create_user_malformed_body() {
    let (router, repository, _client) = setup().await;

    let (status, content_type, body) =
        send(&router, Method::POST, "/users", Some("{not json")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, json!({ "error": "invalid request body" }));
    assert_eq!(repository.calls(), 0);
}

#[tokio::test]
async fn test_create_user_missing_content_type() {
    let (router, repository, _client) = setup().await;
    let request = Request::builder()
        .method(Method::POST)
        .uri("/users")
        .body(Body::from(r#"{"email":"test@example.com"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(repository.calls(), 0);
}

#[tokio::test]
async fn test_create_user_empty_email() {
    let (router, repository, _client) = setup().await;

    let (status, _, body) = send(&router, Method::POST, "/users", Some(r#"{"email":""}"#)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "email is required" }));
    assert_eq!(repository.calls(), 0);
}

#[tokio::test]
async fn test_get_user() {
    let (router, _, _client) = setup().await;
    let created = create_user(&router, json!({ "email": "test@example.com" })).await;
    let uri = format!("/users/{}", created["id"].as_str().unwrap());

    let (status, _, body) = send(&router, Method::GET, &uri, None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, created);
}

#[tokio::test]
async fn test_get_user_not_found() {
    let (router, _, _client) = setup().await;

    let (status, _, body) = send(&router, Method::GET, "/users/nope", None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "user nope not found" }));
}

#[tokio::test]
async fn test_unsupported_methods() {
    let (router, repository, _client) = setup().await;

    let (status, _, _) = send(&router, Method::PUT, "/users/some-id", Some("{}")).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    let (status, _, _) = send(&router, Method::GET, "/users", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);

    assert_eq!(repository.calls(), 0);
}

#[tokio::test]
async fn test_update_user() {
    let (router, _, _client) = setup().await;
    let created =
        create_user(&router, json!({ "email": "before@example.com", "firstName": "Keep" })).await;
    let uri = format!("/users/{}", created["id"].as_str().unwrap());

    let patch = r#"{"email":"after@example.com"}"#;
    let (status, _, body) = send(&router, Method::PATCH, &uri, Some(patch)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], created["id"]);
    assert_eq!(body["email"], "after@example.com");
    assert_eq!(body["firstName"], "Keep");
    assert_eq!(body["createdAt"], created["createdAt"]);

    let (status, _, body) = send(&router, Method::PATCH, &uri, Some(r#"{"email":""}"#)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "email is required");

    let (status, _, _) = send(&router, Method::PATCH, "/users/nope", Some("{}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user() {
    let (router, _, _client) = setup().await;
    let created = create_user(&router, json!({ "email": "gone@example.com" })).await;
    let uri = format!("/users/{}", created["id"].as_str().unwrap());

    let (status, _, body) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _, _) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _, _) = send(&router, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_persistence_failure_is_redacted() {
    let (_client, database) = connect_test_database().await;
    let router = app(test_state(database, Arc::new(FailingRepository)));

    let request = r#"{"email":"test@example.com"}"#;
    let (status, _, body) = send(&router, Method::POST, "/users", Some(request)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "internal server error" }));
    assert!(!body.to_string().contains(STORE_FAILURE));
}

#[tokio::test(start_paused = true)]
async fn test_slow_store_answers_request_cancelled() {
    let (_client, database) = connect_test_database().await;
    let state =
        test_state_with_timeout(database, Arc::new(SlowRepository), Duration::from_secs(1));
    let router = app(state);

    let (status, content_type, body) = send(&router, Method::GET, "/users/abc", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(content_type.as_deref(), Some("application/json"));
    assert_eq!(body, json!({ "error": "request cancelled" }));
}

#[tokio::test]
async fn test_unencodable_body_becomes_internal_error() {
    let mut unencodable: HashMap<(i32, i32), i32> = HashMap::new();
    unencodable.insert((1, 2), 3);

    let response = json_response(StatusCode::CREATED, &unencodable);

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "application/json"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], br#"{"error":"internal server error"}"#);
}

#[tokio::test]
async fn test_account_lifecycle_hides_password() {
    let (router, _, _client) = setup().await;

    let (status, _, created) = send(
        &router,
        Method::POST,
        "/accounts",
        Some(r#"{"email":"ada@example.com","password":"s3cret","firstName":"Ada"}"#),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["active"], true);
    assert!(created.get("password").is_none());
    assert!(created.get("passwordHash").is_none());
    let uri = format!("/accounts/{}", created["id"].as_str().unwrap());

    let (status, _, fetched) = send(&router, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, _, updated) =
        send(&router, Method::PATCH, &uri, Some(r#"{"password":"n3w"}"#)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(updated.get("passwordHash").is_none());

    let deactivate = format!("{}/deactivate", uri);
    let (status, _, deactivated) = send(&router, Method::POST, &deactivate, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deactivated["active"], false);
}

#[tokio::test]
async fn test_create_account_requires_password() {
    let (router, _, _client) = setup().await;

    let request = r#"{"email":"ada@example.com"}"#;
    let (status, _, body) = send(&router, Method::POST, "/accounts", Some(request)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "password is required" }));
}

#[tokio::test]
async fn test_health() {
    let (router, _, client) = setup().await;

    let (status, _, body) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    client.disconnect().await.unwrap();

    let (status, _, body) = send(&router, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body, json!({ "status": "unavailable" }));
}

#[tokio::test]
async fn test_openapi_document() {
    let (router, _, _client) = setup().await;

    let (status, _, body) = send(&router, Method::GET, "/api-docs/openapi.json", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], "Userkeep API");
    assert!(body["paths"]["/users/{id}"].is_object());
    assert!(body["components"]["schemas"]["AccountView"].is_object());
}
