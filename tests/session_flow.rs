//! End-to-end edit session flow against a scripted provider.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::sync::RwLock;

use banana_edit::error::{AppError, AppResult};
use banana_edit::provider::{EditRequest, GeneratedImage, ImageEditProvider};
use banana_edit::session::state::{ProcessingStatus, GENERATE_FAILED_MESSAGE};
use banana_edit::session::{run_generate, GenerateOutcome};
use banana_edit::SessionState;

/// Provider scripted to return fixed bytes (or fail), recording every call.
struct ScriptedProvider {
    calls: AtomicUsize,
    last_instruction: RwLock<Option<String>>,
    reply: Result<GeneratedImage, String>,
}

impl ScriptedProvider {
    fn succeeding(bytes: &[u8], mime_type: &str) -> Self {
        ScriptedProvider {
            calls: AtomicUsize::new(0),
            last_instruction: RwLock::new(None),
            reply: Ok(GeneratedImage {
                data: STANDARD.encode(bytes),
                mime_type: mime_type.to_string(),
            }),
        }
    }

    fn failing(message: &str) -> Self {
        ScriptedProvider {
            calls: AtomicUsize::new(0),
            last_instruction: RwLock::new(None),
            reply: Err(message.to_string()),
        }
    }
}

#[async_trait]
impl ImageEditProvider for ScriptedProvider {
    async fn edit_image(&self, request: &EditRequest) -> AppResult<GeneratedImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_instruction.write().await = Some(request.instruction.clone());
        match &self.reply {
            Ok(image) => Ok(image.clone()),
            Err(message) => Err(AppError::Provider(message.clone())),
        }
    }
}

fn five_mb_jpeg() -> Vec<u8> {
    let mut bytes = vec![0u8; 5 * 1024 * 1024];
    bytes[0] = 0xFF;
    bytes[1] = 0xD8;
    bytes[2] = 0xFF;
    bytes
}

#[tokio::test]
async fn upload_generate_download_scenario() {
    // Upload a 5 MB JPEG, ask for a background removal, download the result.
    let source = five_mb_jpeg();
    let result_bytes = [0xFF, 0xD8, 0xFF, 0xE0, 0x01, 0x02, 0x03];
    let provider = ScriptedProvider::succeeding(&result_bytes, "image/jpeg");

    let session = Arc::new(RwLock::new(SessionState::new()));
    session
        .write()
        .await
        .accept_image(STANDARD.encode(&source), source.len(), "image/jpeg".to_string())
        .unwrap();

    let outcome = run_generate(&session, &provider, "Remove the background")
        .await
        .unwrap();
    assert_eq!(outcome, GenerateOutcome::Applied);
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        provider.last_instruction.read().await.as_deref(),
        Some("Remove the background")
    );

    let state = session.read().await;
    assert_eq!(state.status(), ProcessingStatus::Success);
    assert_eq!(
        state.image().unwrap().generated.as_deref(),
        Some(STANDARD.encode(result_bytes).as_str())
    );

    let download = state.download().unwrap();
    assert_eq!(download.bytes, result_bytes);
    assert_eq!(download.mime_type, "image/jpeg");
    let stem = download
        .filename
        .strip_prefix("banana-edit-")
        .and_then(|rest| rest.strip_suffix(".jpg"))
        .expect("filename should be banana-edit-<timestamp>.jpg");
    stem.parse::<i64>().expect("timestamp should be numeric");
}

#[tokio::test]
async fn provider_request_carries_the_uploaded_image() {
    let provider = ScriptedProvider::succeeding(&[0xFF, 0xD8, 0xFF], "image/jpeg");
    let session = Arc::new(RwLock::new(SessionState::new()));
    let encoded = STANDARD.encode(b"source image");
    session
        .write()
        .await
        .accept_image(encoded.clone(), 12, "image/webp".to_string())
        .unwrap();

    run_generate(&session, &provider, "sketch it").await.unwrap();

    // The generate call answered the currently-held original.
    let state = session.read().await;
    assert_eq!(state.image().unwrap().original, encoded);
    assert_eq!(state.image().unwrap().mime_type, "image/webp");
}

#[tokio::test]
async fn provider_failure_surfaces_generic_message() {
    let provider = ScriptedProvider::failing("upstream 503");
    let session = Arc::new(RwLock::new(SessionState::new()));
    session
        .write()
        .await
        .accept_image(STANDARD.encode(b"img"), 3, "image/png".to_string())
        .unwrap();

    let outcome = run_generate(&session, &provider, "colorize").await.unwrap();
    assert_eq!(outcome, GenerateOutcome::Applied);

    let state = session.read().await;
    assert_eq!(state.status(), ProcessingStatus::Error);
    assert_eq!(state.error(), Some(GENERATE_FAILED_MESSAGE));
    assert!(state.image().unwrap().generated.is_none());
    // Failures are never retried automatically.
    assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failed_generate_can_be_reinvoked_by_the_user() {
    let failing = ScriptedProvider::failing("flaky");
    let session = Arc::new(RwLock::new(SessionState::new()));
    session
        .write()
        .await
        .accept_image(STANDARD.encode(b"img"), 3, "image/png".to_string())
        .unwrap();

    run_generate(&session, &failing, "colorize").await.unwrap();
    assert_eq!(session.read().await.status(), ProcessingStatus::Error);

    let succeeding = ScriptedProvider::succeeding(&[0x89, b'P', b'N', b'G'], "image/png");
    let outcome = run_generate(&session, &succeeding, "colorize").await.unwrap();
    assert_eq!(outcome, GenerateOutcome::Applied);
    assert_eq!(session.read().await.status(), ProcessingStatus::Success);
}
