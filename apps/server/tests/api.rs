use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use veil_core::{KeyRing, SecureStore};
use veil_domain::{SchemeConfig, ValueScheme};
use veil_store::{Store, Topology};

fn app_with(topology: Topology) -> Router {
    let keys = KeyRing::builder().secret("server master", "server salt").build().unwrap();
    let scheme = SchemeConfig { values: ValueScheme::Envelope, ..SchemeConfig::default() };
    let store = Store::builder().memory().topology(topology).build();
    veil_server::app(SecureStore::new(store, keys, scheme).unwrap())
}

fn app() -> Router {
    app_with(Topology::Single)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(body) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(body.to_string())
        },
        None => Body::empty(),
    };
    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "up");
}

#[tokio::test]
async fn test_set_get_delete() {
    let app = app();
    let request = Request::post("/redis")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({"key": "user:1", "value": "42"}).to_string()))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::LOCATION], "/redis/user:1");

    let (status, body) = send(&app, Method::GET, "/redis/user:1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"key": "user:1", "value": "42"}));

    let (status, _) = send(&app, Method::DELETE, "/redis/user:1", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::DELETE, "/redis/user:1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(&app, Method::GET, "/redis/user:1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NotFound");
}

#[tokio::test]
async fn test_unknown_fields_rejected() {
    let body = json!({"key": "k", "value": "v", "ttl": 5});
    let (status, _) = send(&app(), Method::POST, "/redis", Some(body)).await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn test_arithmetic_routes() {
    let app = app();
    send(&app, Method::POST, "/redis", Some(json!({"key": "n", "value": "10"}))).await;

    let (status, _) = send(&app, Method::POST, "/redis/sum", Some(json!({"key": "n", "value": "5"}))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    send(&app, Method::POST, "/redis/mult", Some(json!({"key": "n", "value": "3"}))).await;
    send(&app, Method::POST, "/redis/diff", Some(json!({"key": "n", "value": "1"}))).await;

    let (_, body) = send(&app, Method::GET, "/redis/n", None).await;
    assert_eq!(body["value"], "44");

    let (status, body) =
        send(&app, Method::POST, "/redis/sum", Some(json!({"key": "n", "value": "x"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidInput");

    let (status, _) =
        send(&app, Method::POST, "/redis/sum", Some(json!({"key": "nope", "value": "1"}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sorted_set_routes() {
    let app = app();
    for (score, value) in [("20", "bob"), ("10", "alice")] {
        let body = json!({"key": "scores", "score": score, "value": value});
        let (status, _) = send(&app, Method::POST, "/redis/zadd", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) =
        send(&app, Method::GET, "/redis/zadd/scores?min=-inf&max=inf", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"value": "alice", "score": 10}, {"value": "bob", "score": 20}]));

    let (_, body) = send(&app, Method::GET, "/redis/zadd/scores?min=15", None).await;
    assert_eq!(body, json!([{"value": "bob", "score": 20}]));

    let (status, _) = send(&app, Method::GET, "/redis/zadd/scores?min=low", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_set_routes() {
    let app = app();
    let body = json!({"key": "tags", "values": ["hello world", "goodbye"]});
    let (status, _) = send(&app, Method::POST, "/redis/sadd", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = send(&app, Method::GET, "/redis/sadd/tags?search=world", None).await;
    assert_eq!(body, json!(["hello world"]));
    let (_, body) = send(&app, Method::GET, "/redis/sadd/tags", None).await;
    assert_eq!(body, json!(["goodbye", "hello world"]));

    let empty = json!({"key": "tags", "values": []});
    let (status, body) = send(&app, Method::POST, "/redis/sadd", Some(empty)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "InvalidInput");
}

#[tokio::test]
async fn test_flush_all() {
    let app = app();
    send(&app, Method::POST, "/redis", Some(json!({"key": "k", "value": "v"}))).await;
    let (status, _) = send(&app, Method::DELETE, "/redis", None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(&app, Method::GET, "/redis/k", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&app_with(Topology::Cluster), Method::DELETE, "/redis", None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"], "Unsupported");
}
