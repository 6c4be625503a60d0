//! Full HTTP intake surface driven through the router, large payloads
//! included.
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower::ServiceExt;

use banana_edit::api::routes::{app, AppState};
use banana_edit::error::AppResult;
use banana_edit::provider::{EditRequest, GeneratedImage, ImageEditProvider};
use banana_edit::SessionState;

struct FixedProvider {
    reply: GeneratedImage,
}

#[async_trait]
impl ImageEditProvider for FixedProvider {
    async fn edit_image(&self, _request: &EditRequest) -> AppResult<GeneratedImage> {
        Ok(self.reply.clone())
    }
}

fn test_app(result_bytes: &[u8]) -> Router {
    let state = Arc::new(AppState {
        session: RwLock::new(SessionState::new()),
        provider: Arc::new(FixedProvider {
            reply: GeneratedImage {
                data: STANDARD.encode(result_bytes),
                mime_type: "image/jpeg".to_string(),
            },
        }),
    });
    app(state)
}

fn jpeg_of(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    bytes[0] = 0xFF;
    bytes[1] = 0xD8;
    bytes[2] = 0xFF;
    bytes
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn five_mb_upload_is_accepted_over_http() {
    let app = test_app(&[0xFF, 0xD8, 0xFF, 0xE0]);
    let image = jpeg_of(5 * 1024 * 1024);

    let response = app
        .oneshot(post_json(
            "/image",
            json!({ "data": STANDARD.encode(&image), "mime_type": "image/jpeg" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["status"], "IDLE");
    assert_eq!(snapshot["has_original"], true);
    assert_eq!(snapshot["mime_type"], "image/jpeg");
}

#[tokio::test]
async fn oversized_upload_is_rejected_and_leaves_state_intact() {
    let app = test_app(&[0xFF, 0xD8, 0xFF, 0xE0]);

    let small = jpeg_of(1024);
    let response = app
        .clone()
        .oneshot(post_json(
            "/image",
            json!({ "data": STANDARD.encode(&small), "mime_type": "image/jpeg" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Just over the 9 MiB cap, but within the transport body limit, so the
    // handler itself does the rejecting.
    let oversized = jpeg_of(9 * 1024 * 1024 + 1024);
    let response = app
        .clone()
        .oneshot(post_json(
            "/image",
            json!({ "data": STANDARD.encode(&oversized), "mime_type": "image/jpeg" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // The earlier upload survives the rejected one.
    let response = app.oneshot(get("/status")).await.unwrap();
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["has_original"], true);
    assert_eq!(snapshot["error"].as_str().unwrap_or(""), "Image too large. Please upload an image smaller than 9MB.");
}

#[tokio::test]
async fn upload_generate_download_over_http() {
    let result_bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x10, 0x20];
    let app = test_app(&result_bytes);
    let image = jpeg_of(5 * 1024 * 1024);

    let response = app
        .clone()
        .oneshot(post_json(
            "/image",
            json!({ "data": STANDARD.encode(&image), "mime_type": "image/jpeg" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(post_json(
            "/generate",
            json!({ "instruction": "Remove the background" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let snapshot = body_json(response).await;
    assert_eq!(snapshot["status"], "SUCCESS");
    assert_eq!(snapshot["has_generated"], true);

    let response = app.oneshot(get("/image/generated")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.contains("banana-edit-"));
    assert!(disposition.contains(".jpg"));
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    assert_eq!(bytes.as_ref(), result_bytes);
}

#[tokio::test]
async fn generate_without_image_is_bad_request() {
    let app = test_app(&[0xFF, 0xD8, 0xFF]);
    let response = app
        .oneshot(post_json("/generate", json!({ "instruction": "colorize" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
