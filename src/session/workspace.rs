//! Orchestration around `SessionState`: file intake and the single-flight
//! generate cycle.
//!
//! The state lives behind a `tokio::sync::RwLock` shared by the HTTP
//! handlers; the provider call itself runs with the lock released, and the
//! generation token decides whether the result is still welcome when it
//! lands.
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::{AppError, AppResult};
use crate::provider::ImageEditProvider;
use crate::session::state::{ProcessingStatus, SessionState, MAX_UPLOAD_BYTES};

/// How a generate call ended, as seen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Result (success or failure) was reduced into the session.
    Applied,
    /// The session moved on (reset or new upload) while the provider was
    /// working; the late result was dropped.
    Discarded,
    /// A generate was already in flight; nothing was issued.
    AlreadyProcessing,
}

/// Run one generate cycle against the provider.
///
/// Exactly one request is in flight at a time: a call made while another is
/// processing returns `AlreadyProcessing` without touching the session or
/// the network. Precondition failures (no image, empty instruction) surface
/// as `AppError::Validation` before any request is issued.
pub async fn run_generate(
    session: &RwLock<SessionState>,
    provider: &dyn ImageEditProvider,
    instruction: &str,
) -> AppResult<GenerateOutcome> {
    let (token, request) = {
        let mut state = session.write().await;
        if state.status() == ProcessingStatus::Processing {
            tracing::debug!("Generate ignored: request already in flight");
            return Ok(GenerateOutcome::AlreadyProcessing);
        }
        state.begin_generate(instruction)?
    };

    // Lock released while the provider works.
    let result = provider.edit_image(&request).await;

    let mut state = session.write().await;
    if state.apply_generate_result(token, result) {
        Ok(GenerateOutcome::Applied)
    } else {
        Ok(GenerateOutcome::Discarded)
    }
}

/// Read an image file from disk into the session.
///
/// The size cap is enforced from file metadata, before the bytes are read or
/// encoded. The session shows `Uploading` for the duration of the read; on
/// rejection the prior status is restored and only the error message changes.
pub async fn accept_image_file(
    session: &RwLock<SessionState>,
    path: &Path,
) -> AppResult<()> {
    let metadata = fs::metadata(path).await?;
    if metadata.len() > MAX_UPLOAD_BYTES as u64 {
        // Rejected on metadata alone; accept_image records the size-limit
        // error without touching prior image state.
        let mut state = session.write().await;
        return state.accept_image(String::new(), metadata.len() as usize, String::new());
    }

    let previous = session.write().await.begin_upload();
    match fs::read(path).await {
        Ok(bytes) => {
            let encoded = STANDARD.encode(&bytes);
            let mime_type = mime_from_path(path).to_string();
            let mut state = session.write().await;
            state.accept_image(encoded, bytes.len(), mime_type)
        }
        Err(err) => {
            let mut state = session.write().await;
            state.set_status(previous);
            Err(AppError::Io(err))
        }
    }
}

/// Content type from the file extension; the provider rejects anything it
/// cannot actually read, so this stays permissive.
pub fn mime_from_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}
