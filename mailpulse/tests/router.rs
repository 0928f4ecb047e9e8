//! Integration tests for the HTTP adapter
//!
//! Exercises `POST /send` and the tracking pixel route through the full
//! router, with a recording transport in place of the provider.

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use mailpulse::config::SenderSettings;
use mailpulse::email::{DeliveryService, TemplateStore};
use mailpulse::handlers;
use mailpulse::state::AppState;
use mailpulse::tracking::{OpenTracker, TrackingId, PIXEL_GIF};
use mailpulse::transport::{ApiTransport, TransportError};
use parking_lot::Mutex;
use reqwest::StatusCode as ProviderStatus;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

/// Records posted payloads; fails every call when `fail` is set
#[derive(Default)]
struct RecordingTransport {
    posted: Mutex<Vec<Value>>,
    fail: bool,
}

#[async_trait]
impl ApiTransport for RecordingTransport {
    async fn post(&self, _endpoint: &str, payload: &Value) -> Result<Option<Value>, TransportError> {
        if self.fail {
            return Err(TransportError::Status {
                status: ProviderStatus::BAD_REQUEST,
                body: "sender domain not verified".to_string(),
            });
        }
        self.posted.lock().push(payload.clone());
        Ok(Some(json!({"id": "em_123", "status": "queued"})))
    }

    async fn get(
        &self,
        _endpoint: &str,
        _query: &[(String, String)],
    ) -> Result<Option<Value>, TransportError> {
        Ok(None)
    }

    async fn put(&self, _endpoint: &str, _payload: &Value) -> Result<Option<Value>, TransportError> {
        Ok(None)
    }

    async fn delete(&self, _endpoint: &str) -> Result<Option<Value>, TransportError> {
        Ok(None)
    }
}

fn sender() -> SenderSettings {
    SenderSettings {
        default_address: "noreply@myapp.com".to_string(),
        default_name: "My App".to_string(),
        default_reply_to: "support@myapp.com".to_string(),
        alert_recipients: Vec::new(),
    }
}

fn app_with(transport: Arc<RecordingTransport>, trust_forwarded_for: bool) -> (Router, AppState) {
    let templates = TemplateStore::from_sources([(
        "welcome.html".to_string(),
        "<h1>Welcome, {{ data.name }}!</h1>".to_string(),
    )])
    .unwrap();
    let delivery = DeliveryService::new(transport, templates, sender());
    let tracker = OpenTracker::in_memory("https://mail.example.com");

    let state = AppState::new(delivery, tracker).with_forwarded_for(trust_forwarded_for);
    (handlers::router(state.clone()), state)
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_send_html_email() {
    let transport = Arc::new(RecordingTransport::default());
    let (app, _) = app_with(Arc::clone(&transport), false);

    let response = app
        .oneshot(post_json(
            "/send",
            &json!({
                "to_address": "alice@example.com, bob@example.com",
                "from_address": "hello@myapp.com",
                "subject": "Hi",
                "html_body": "<p>Hello</p>"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["message"], "Email sent successfully!");
    assert_eq!(body["api_response"]["id"], "em_123");

    let posted = transport.posted.lock();
    assert_eq!(posted[0]["to"], json!(["alice@example.com", "bob@example.com"]));
    assert_eq!(posted[0]["from"], "My App <hello@myapp.com>");
    assert_eq!(posted[0]["reply_to"], "support@myapp.com");
}

#[tokio::test]
async fn test_send_template_email() {
    let transport = Arc::new(RecordingTransport::default());
    let (app, _) = app_with(Arc::clone(&transport), false);

    let response = app
        .oneshot(post_json(
            "/send",
            &json!({
                "to_address": "alice@example.com",
                "from_address": "hello@myapp.com",
                "template_name": "welcome.html",
                "context": {"name": "Alice"}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        transport.posted.lock()[0]["html"],
        "<h1>Welcome, Alice!</h1>"
    );
}

#[tokio::test]
async fn test_send_requires_body_or_template() {
    let transport = Arc::new(RecordingTransport::default());
    let (app, _) = app_with(Arc::clone(&transport), false);

    let response = app
        .oneshot(post_json(
            "/send",
            &json!({
                "to_address": "alice@example.com",
                "from_address": "hello@myapp.com",
                "html_body": "  "
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("html_body"));
    assert!(transport.posted.lock().is_empty());
}

#[tokio::test]
async fn test_send_rejects_bad_addresses_and_malformed_json() {
    let (app, _) = app_with(Arc::new(RecordingTransport::default()), false);

    let bad_address = app
        .clone()
        .oneshot(post_json(
            "/send",
            &json!({
                "to_address": "alice",
                "from_address": "hello@myapp.com",
                "html_body": "<p>x</p>"
            }),
        ))
        .await
        .unwrap();
    let missing_field = app
        .oneshot(post_json("/send", &json!({"to_address": "alice@example.com"})))
        .await
        .unwrap();

    assert_eq!(bad_address.status(), StatusCode::BAD_REQUEST);
    assert_eq!(missing_field.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_send_unknown_template() {
    let (app, _) = app_with(Arc::new(RecordingTransport::default()), false);

    let response = app
        .oneshot(post_json(
            "/send",
            &json!({
                "to_address": "alice@example.com",
                "from_address": "hello@myapp.com",
                "template_name": "missing.html"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_send_provider_failure() {
    let transport = Arc::new(RecordingTransport {
        fail: true,
        ..RecordingTransport::default()
    });
    let (app, _) = app_with(transport, false);

    let response = app
        .oneshot(post_json(
            "/send",
            &json!({
                "to_address": "alice@example.com",
                "from_address": "hello@myapp.com",
                "html_body": "<p>x</p>"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = json_body(response).await;
    assert!(body["error"].as_str().unwrap().contains("alice@example.com"));
}

#[tokio::test]
async fn test_pixel_records_first_open() {
    let (app, state) = app_with(Arc::new(RecordingTransport::default()), true);
    let record = state.tracker.register("alice@example.com").await.unwrap();
    let uri = format!("/track/pixel/{}", record.tracking_id);

    let first = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(&uri)
                .header(header::USER_AGENT, "Apple Mail")
                .header("x-forwarded-for", "203.0.113.5, 10.0.0.2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(first.headers()[header::CONTENT_TYPE], "image/gif");
    assert_eq!(first.headers()[header::CACHE_CONTROL], "no-store");
    let bytes = to_bytes(first.into_body(), usize::MAX).await.unwrap();
    assert_eq!(bytes.as_ref(), PIXEL_GIF.as_slice());

    let second = app
        .oneshot(
            Request::builder()
                .uri(&uri)
                .header(header::USER_AGENT, "Outlook")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::OK);

    let stored = state
        .tracker
        .find(&record.tracking_id.to_string())
        .await
        .unwrap();
    let opened = stored.opened().unwrap();
    assert_eq!(opened.user_agent.as_deref(), Some("Apple Mail"));
    assert_eq!(opened.ip, Some("203.0.113.5".parse().unwrap()));
}

#[tokio::test]
async fn test_pixel_ignores_forwarded_for_unless_trusted() {
    let (app, state) = app_with(Arc::new(RecordingTransport::default()), false);
    let record = state.tracker.register("alice@example.com").await.unwrap();

    app.oneshot(
        Request::builder()
            .uri(format!("/track/pixel/{}", record.tracking_id))
            .header("x-forwarded-for", "203.0.113.5")
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();

    let stored = state
        .tracker
        .find(&record.tracking_id.to_string())
        .await
        .unwrap();
    assert!(stored.is_opened());
    assert_eq!(stored.opened().unwrap().ip, None);
}

#[tokio::test]
async fn test_pixel_unknown_or_malformed_id() {
    let (app, _) = app_with(Arc::new(RecordingTransport::default()), false);

    for id in [TrackingId::new().to_string(), "not-a-uuid".to_string()] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/track/pixel/{id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
