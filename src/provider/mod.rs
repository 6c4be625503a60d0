//! Image-edit provider boundary.
//!
//! The provider is an external collaborator: it takes an image plus a text
//! instruction and answers with a new image. `ImageEditProvider` is the seam;
//! `GeminiClient` is the production implementation.
pub mod gemini;

use async_trait::async_trait;

use crate::error::AppResult;

pub use gemini::GeminiClient;

/// One outbound edit request. Constructed per generate call, never retained.
#[derive(Debug, Clone)]
pub struct EditRequest {
    /// Source image as base64, without any data-URI prefix.
    pub image: String,
    pub mime_type: String,
    pub instruction: String,
}

/// A successful provider answer: base64 image bytes plus their content type.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub data: String,
    pub mime_type: String,
}

#[async_trait]
pub trait ImageEditProvider: Send + Sync {
    /// Submit one edit request. A response without any image payload is an
    /// error, same as a transport failure.
    async fn edit_image(&self, request: &EditRequest) -> AppResult<GeneratedImage>;
}

/// Strip a `data:image/...;base64,` prefix if the caller handed us a data URI.
pub fn strip_data_uri(data: &str) -> &str {
    if data.starts_with("data:") {
        match data.find("base64,") {
            Some(idx) => &data[idx + "base64,".len()..],
            None => data,
        }
    } else {
        data
    }
}

/// Best-effort content-type detection from decoded image bytes.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        Some("image/png")
    } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(b"GIF8") {
        Some("image/gif")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_uri_prefix() {
        assert_eq!(strip_data_uri("data:image/png;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_uri("AAAA"), "AAAA");
        assert_eq!(strip_data_uri("data:奇"), "data:奇");
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A]), Some("image/png"));
        assert_eq!(sniff_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        let mut webp = b"RIFF\x00\x00\x00\x00WEBP".to_vec();
        webp.extend_from_slice(b"VP8 ");
        assert_eq!(sniff_mime(&webp), Some("image/webp"));
        assert_eq!(sniff_mime(b"GIF89a"), Some("image/gif"));
        assert_eq!(sniff_mime(b"plain text"), None);
        assert_eq!(sniff_mime(b""), None);
    }
}
