//! Cross-cutting behavior of the request pipeline.

use reqwest::Method;
use serde_json::{json, Value};

mod common;

use blog_backend::config::AppConfig;
use common::TestApp;

#[tokio::test]
async fn test_healthcheck() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/v1/healthcheck", None).await;
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "available");
    assert_eq!(body["systemInfo"]["environment"], "development");
    assert_eq!(body["systemInfo"]["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_not_found_and_method_not_allowed_envelopes() {
    let app = TestApp::spawn().await;

    let response = app.get("/api/v1/nowhere", None).await;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "the requested resource could not be found");

    // Ids must be positive integers.
    for path in ["/api/v1/post/abc", "/api/v1/post/0", "/api/v1/post/-4"] {
        assert_eq!(app.get(path, None).await.status(), 404, "{path}");
    }
    assert_eq!(app.get("/api/v1/post/99", None).await.status(), 404);

    let response = app
        .send_json(Method::POST, "/api/v1/healthcheck", None, json!({}))
        .await;
    assert_eq!(response.status(), 405);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "the POST method is not supported for this resource"
    );
}

#[tokio::test]
async fn test_security_headers_on_errors_too() {
    let app = TestApp::spawn().await;

    for path in ["/api/v1/healthcheck", "/api/v1/nowhere"] {
        let response = app.get(path, None).await;
        let headers = response.headers();
        assert_eq!(headers["x-frame-options"], "deny");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert_eq!(headers["x-xss-protection"], "0");
        assert_eq!(headers["referrer-policy"], "origin-when-cross-origin");
        assert!(headers.contains_key("content-security-policy"));
    }
}

#[tokio::test]
async fn test_malformed_authorization_header() {
    let app = TestApp::spawn().await;

    for value in ["Token abc", "Bearer", "Bearer a b", "Bearer short"] {
        let response = app
            .client
            .get(app.url("/api/v1/posts"))
            .header("authorization", value)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 401, "{value}");
        assert_eq!(response.headers()["www-authenticate"], "Bearer");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["error"], "invalid or missing authentication token");
    }
}

#[tokio::test]
async fn test_bearer_token_resolves_through_full_stack() {
    let app = TestApp::spawn().await;
    let bearer = app.activated_user("Ada", "ada@example.com").await;

    let response = app.get("/api/v1/healthcheck", Some(&bearer)).await;
    assert_eq!(response.status(), 200);
    assert!(response
        .headers()
        .get_all("vary")
        .iter()
        .any(|v| v == "Authorization"));

    let post = app.create_post(&bearer, "Signed in").await;
    let path = format!("/api/v1/posts/like/{}", post["id"]);
    let response = app
        .send_json(Method::PATCH, &path, Some(&bearer), json!({}))
        .await;
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["post"]["likedBy"].as_array().unwrap().len(), 1);

    let response = app
        .send_json(Method::DELETE, "/api/v1/auth/logout", Some(&bearer), json!({}))
        .await;
    assert_eq!(response.status(), 200);

    // The same header is rejected once its token is revoked.
    let response = app.get("/api/v1/healthcheck", Some(&bearer)).await;
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_anonymous_on_gated_route() {
    let app = TestApp::spawn().await;

    let response = app
        .send_json(Method::POST, "/api/v1/post", None, json!({}))
        .await;
    assert_eq!(response.status(), 401);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "you must be authenticated to access this resource"
    );
}

#[tokio::test]
async fn test_json_decoding_errors() {
    let app = TestApp::spawn().await;

    let cases = [
        ("", "body must not be empty"),
        ("{\"name\": \"Ada\"", "body contains badly-formed JSON"),
        ("{\"nickname\": \"ada\"}", "body contains unknown field \"nickname\""),
        ("{\"name\": 5}", "body contains incorrect JSON type"),
        ("{} {}", "body cannot contain more than one JSON value"),
    ];

    for (raw, expected) in cases {
        let response = app
            .client
            .post(app.url("/api/v1/auth/register"))
            .header("content-type", "application/json")
            .body(raw)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400, "{raw}");
        let body: Value = response.json().await.unwrap();
        let message = body["error"].as_str().unwrap();
        assert!(message.starts_with(expected), "{raw}: {message}");
    }
}

#[tokio::test]
async fn test_validation_errors_are_field_maps() {
    let app = TestApp::spawn().await;

    let response = app
        .send_json(
            Method::POST,
            "/api/v1/auth/register",
            None,
            json!({ "name": "", "email": "not-an-email", "password": "short" }),
        )
        .await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["name"], "must be provided");
    assert_eq!(body["error"]["email"], "must be a valid email address");
    assert_eq!(body["error"]["password"], "must be at least 8 bytes long");

    let response = app
        .send_json(Method::PUT, "/api/v1/auth/activate", None, json!({ "token": "abc" }))
        .await;
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["token"], "must be 26 bytes long");
}

#[tokio::test]
async fn test_rate_limit_rejects_after_burst() {
    let mut config = AppConfig::default();
    config.limiter.enabled = true;
    config.limiter.requests_per_second = 0.01;
    config.limiter.burst = 2;
    let app = TestApp::spawn_with(config).await;

    for _ in 0..2 {
        assert_eq!(app.get("/api/v1/healthcheck", None).await.status(), 200);
    }

    let response = app.get("/api/v1/healthcheck", None).await;
    assert_eq!(response.status(), 429);
    assert!(response.headers().contains_key("x-frame-options"));
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "rate limit exceeded");

    // A different forwarded client has its own bucket.
    let response = app
        .client
        .get(app.url("/api/v1/healthcheck"))
        .header("x-forwarded-for", "203.0.113.9")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_cors_preflight_for_trusted_origin() {
    let mut config = AppConfig::default();
    config.limiter.enabled = false;
    config.cors.trusted_origins = vec!["https://blog.example.com".to_string()];
    let app = TestApp::spawn_with(config).await;

    let response = app
        .client
        .request(Method::OPTIONS, app.url("/api/v1/post/1"))
        .header("origin", "https://blog.example.com")
        .header("access-control-request-method", "PATCH")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let headers = response.headers();
    assert_eq!(
        headers["access-control-allow-origin"],
        "https://blog.example.com"
    );
    assert_eq!(
        headers["access-control-allow-methods"],
        "OPTIONS, PUT, PATCH, DELETE"
    );

    let response = app
        .client
        .get(app.url("/api/v1/healthcheck"))
        .header("origin", "https://evil.example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(!response.headers().contains_key("access-control-allow-origin"));
    let vary: Vec<_> = response
        .headers()
        .get_all("vary")
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect();
    assert!(vary.contains(&"Origin".to_string()));
    assert!(vary.contains(&"Authorization".to_string()));
}
