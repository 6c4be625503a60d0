//! Edit session state: one explicit state object, mutated only through the
//! transition methods below.
//!
//! Transitions:
//! - `accept_image`: Idle-preserving; stores a new original and clears any
//!   previously generated result.
//! - `begin_generate` / `apply_generate_result`: the single-flight generate
//!   cycle. `begin_generate` hands out a generation token; a result is
//!   applied only while its token is still current, so anything arriving
//!   after a reset or a newer upload is discarded.
//! - `reset`: unconditional, idempotent return to Idle.
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::provider::{EditRequest, GeneratedImage};

/// Hard cap on accepted uploads. Larger inputs are rejected before any
/// encoding work to bound memory and request payload size.
pub const MAX_UPLOAD_BYTES: usize = 9 * 1024 * 1024;

pub const SIZE_LIMIT_MESSAGE: &str =
    "Image too large. Please upload an image smaller than 9MB.";
pub const GENERATE_FAILED_MESSAGE: &str = "Failed to generate image. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStatus {
    Idle,
    Uploading,
    Processing,
    Success,
    Error,
}

/// The image pair for one editing session. `generated` is cleared whenever a
/// new original is stored, never carried across uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Source image as base64, without a data-URI prefix.
    pub original: String,
    pub mime_type: String,
    pub generated: Option<String>,
    /// Detected content type of `generated`.
    pub generated_mime_type: Option<String>,
}

/// A user-retrievable file produced from the generated image.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// JSON-safe view of the session for status endpoints; never carries bytes.
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub status: ProcessingStatus,
    pub has_original: bool,
    pub has_generated: bool,
    pub mime_type: Option<String>,
    pub generated_mime_type: Option<String>,
    pub error: Option<String>,
}

pub struct SessionState {
    id: Uuid,
    status: ProcessingStatus,
    image: Option<ImageRecord>,
    error: Option<String>,
    /// Bumped by `accept_image` and `reset`; stale tokens are refused by
    /// `apply_generate_result`.
    generation: u64,
}

impl SessionState {
    pub fn new() -> Self {
        SessionState {
            id: Uuid::new_v4(),
            status: ProcessingStatus::Idle,
            image: None,
            error: None,
            generation: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn status(&self) -> ProcessingStatus {
        self.status
    }

    pub fn image(&self) -> Option<&ImageRecord> {
        self.image.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Mark the session as reading file bytes. Returns the prior status so
    /// the caller can restore it if intake fails.
    pub fn begin_upload(&mut self) -> ProcessingStatus {
        let previous = self.status;
        self.status = ProcessingStatus::Uploading;
        previous
    }

    pub fn set_status(&mut self, status: ProcessingStatus) {
        self.status = status;
    }

    /// Store a new original image. `byte_len` is the decoded size.
    ///
    /// Oversized input sets the size-limit error and leaves every other field
    /// untouched, so a bad upload never clobbers a prior session.
    pub fn accept_image(
        &mut self,
        data: String,
        byte_len: usize,
        mime_type: String,
    ) -> AppResult<()> {
        if byte_len > MAX_UPLOAD_BYTES {
            self.error = Some(SIZE_LIMIT_MESSAGE.to_string());
            return Err(AppError::Validation(SIZE_LIMIT_MESSAGE.to_string()));
        }
        self.image = Some(ImageRecord {
            original: data,
            mime_type,
            generated: None,
            generated_mime_type: None,
        });
        self.status = ProcessingStatus::Idle;
        self.error = None;
        self.generation += 1;
        Ok(())
    }

    /// Start a generate cycle. Preconditions: an original is present, the
    /// instruction is non-empty, and no generate is already in flight (the
    /// caller checks the status and treats in-flight as a no-op).
    ///
    /// Returns the generation token plus the request to hand the provider.
    pub fn begin_generate(&mut self, instruction: &str) -> AppResult<(u64, EditRequest)> {
        if self.status == ProcessingStatus::Processing {
            return Err(AppError::Validation(
                "a generate request is already in flight".to_string(),
            ));
        }
        let instruction = instruction.trim();
        if instruction.is_empty() {
            return Err(AppError::Validation(
                "An edit instruction is required.".to_string(),
            ));
        }
        let record = self.image.as_ref().ok_or_else(|| {
            AppError::Validation("Upload an image before generating.".to_string())
        })?;
        let request = EditRequest {
            image: record.original.clone(),
            mime_type: record.mime_type.clone(),
            instruction: instruction.to_string(),
        };
        self.status = ProcessingStatus::Processing;
        self.error = None;
        Ok((self.generation, request))
    }

    /// Reduce a provider outcome into the session. Returns false when the
    /// token is stale (reset or new upload happened mid-flight), in which
    /// case nothing is mutated.
    pub fn apply_generate_result(
        &mut self,
        token: u64,
        result: AppResult<GeneratedImage>,
    ) -> bool {
        if token != self.generation {
            tracing::debug!(
                token,
                current = self.generation,
                "Discarding stale generate result"
            );
            return false;
        }
        match result {
            Ok(generated) => {
                if let Some(record) = self.image.as_mut() {
                    record.generated = Some(generated.data);
                    record.generated_mime_type = Some(generated.mime_type);
                }
                self.status = ProcessingStatus::Success;
                self.error = None;
            }
            Err(err) => {
                tracing::error!("Generate failed: {}", err);
                self.status = ProcessingStatus::Error;
                self.error = Some(GENERATE_FAILED_MESSAGE.to_string());
            }
        }
        true
    }

    /// Produce the downloadable file. Valid whenever generated bytes exist,
    /// regardless of status.
    pub fn download(&self) -> AppResult<Download> {
        let record = self.image.as_ref().and_then(|r| {
            r.generated.as_ref().map(|g| (g, r.generated_mime_type.as_deref()))
        });
        let (generated, mime) = record.ok_or_else(|| {
            AppError::Validation("No generated image to download.".to_string())
        })?;
        let bytes = STANDARD.decode(generated.as_bytes())?;
        let mime_type = mime.unwrap_or("image/jpeg").to_string();
        let filename = format!(
            "banana-edit-{}.{}",
            Utc::now().timestamp_millis(),
            extension_for(&mime_type)
        );
        Ok(Download {
            filename,
            mime_type,
            bytes,
        })
    }

    /// Unconditional return to the initial state. The session id survives.
    pub fn reset(&mut self) {
        self.image = None;
        self.error = None;
        self.status = ProcessingStatus::Idle;
        self.generation += 1;
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            status: self.status,
            has_original: self.image.is_some(),
            has_generated: self
                .image
                .as_ref()
                .map(|r| r.generated.is_some())
                .unwrap_or(false),
            mime_type: self.image.as_ref().map(|r| r.mime_type.clone()),
            generated_mime_type: self
                .image
                .as_ref()
                .and_then(|r| r.generated_mime_type.clone()),
            error: self.error.clone(),
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "img",
    }
}
