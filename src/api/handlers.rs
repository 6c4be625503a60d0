//! Axum request handlers for the HTTP API.
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::api::routes::AppState;
use crate::error::AppError;
use crate::provider::strip_data_uri;
use crate::session::presets::PRESETS;
use crate::session::state::{SessionSnapshot, MAX_UPLOAD_BYTES, SIZE_LIMIT_MESSAGE};
use crate::session::{run_generate, GenerateOutcome};

pub async fn root() -> &'static str {
    "BananaEdit API"
}

#[derive(Deserialize)]
pub struct UploadPayload {
    /// Image bytes as base64; a data-URI prefix is tolerated and stripped.
    pub data: String,
    pub mime_type: String,
}

#[derive(Deserialize)]
pub struct GeneratePayload {
    pub instruction: String,
}

pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UploadPayload>,
) -> Result<Json<SessionSnapshot>, (StatusCode, String)> {
    let cleaned = strip_data_uri(&payload.data).to_string();

    // Size cap is enforced from the encoded length alone; oversized input is
    // rejected before any decode work.
    let estimated = base64_decoded_len(&cleaned);
    if estimated > MAX_UPLOAD_BYTES {
        let mut session = state.session.write().await;
        let message = session
            .accept_image(cleaned, estimated, payload.mime_type)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_else(|| SIZE_LIMIT_MESSAGE.to_string());
        tracing::warn!("Upload rejected: {}", message);
        return Err((StatusCode::PAYLOAD_TOO_LARGE, message));
    }

    let bytes = STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid base64 image data: {}", e)))?;

    let mut session = state.session.write().await;
    session
        .accept_image(cleaned, bytes.len(), payload.mime_type)
        .map_err(|e| {
            tracing::warn!("Upload rejected: {}", e);
            (StatusCode::PAYLOAD_TOO_LARGE, e.to_string())
        })?;
    Ok(Json(session.snapshot()))
}

/// Decoded size of a padded base64 string, without decoding it. Invalid
/// input yields a harmless estimate; the decode itself still validates.
fn base64_decoded_len(encoded: &str) -> usize {
    let padding = encoded.bytes().rev().take_while(|&b| b == b'=').count();
    ((encoded.len() / 4) * 3).saturating_sub(padding.min(2))
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<GeneratePayload>,
) -> Result<Json<SessionSnapshot>, (StatusCode, String)> {
    let outcome = run_generate(
        &state.session,
        state.provider.as_ref(),
        &payload.instruction,
    )
    .await
    .map_err(|e| match e {
        AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
        other => {
            tracing::error!("Generate failed before reaching the provider: {}", other);
            (StatusCode::BAD_GATEWAY, other.to_string())
        }
    })?;

    if outcome == GenerateOutcome::AlreadyProcessing {
        return Err((
            StatusCode::CONFLICT,
            "A generate request is already in flight".to_string(),
        ));
    }
    // Provider failures are reduced into the session; the snapshot carries
    // status ERROR and the user-facing message.
    Ok(Json(state.session.read().await.snapshot()))
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    Json(state.session.read().await.snapshot())
}

pub async fn download_generated(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let download = state
        .session
        .read()
        .await
        .download()
        .map_err(|e| (StatusCode::NOT_FOUND, e.to_string()))?;
    let headers = [
        (header::CONTENT_TYPE, download.mime_type),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", download.filename),
        ),
    ];
    Ok((headers, download.bytes))
}

pub async fn reset(State(state): State<Arc<AppState>>) -> Json<SessionSnapshot> {
    let mut session = state.session.write().await;
    session.reset();
    Json(session.snapshot())
}

pub async fn presets() -> Json<Value> {
    let list: Vec<Value> = PRESETS
        .iter()
        .map(|p| json!({"name": p.name, "instruction": p.instruction}))
        .collect();
    Json(json!({ "presets": list }))
}
