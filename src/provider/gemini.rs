//! Thin HTTP client for the Gemini image-edit endpoint.
//!
//! `edit_image` posts a `generateContent` request carrying the instruction
//! text and the source image as an inline-data part, then extracts the first
//! inline-data part found in the response candidates.
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::provider::{sniff_mime, strip_data_uri, EditRequest, GeneratedImage, ImageEditProvider};

/// Content type assumed when the provider reports none and the bytes are not
/// recognizable. Matches what the model returns in practice.
const FALLBACK_MIME: &str = "image/jpeg";

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<RequestPart>,
}

#[derive(Serialize)]
struct RequestPart {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "inlineData", skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug)]
struct InlineData {
    #[serde(rename = "mimeType", alias = "mime_type", default)]
    mime_type: Option<String>,
    data: String,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Deserialize, Debug, Default)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct ResponsePart {
    #[allow(dead_code)]
    text: Option<String>,
    #[serde(default, alias = "inlineData")]
    inline_data: Option<InlineData>,
}

impl GeminiClient {
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        let base = base_url.trim_end_matches('/').to_string();
        GeminiClient {
            client: Client::new(),
            base_url: base,
            api_key,
            model,
        }
    }
}

#[async_trait]
impl ImageEditProvider for GeminiClient {
    async fn edit_image(&self, request: &EditRequest) -> AppResult<GeneratedImage> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        tracing::info!("Sending edit request to provider at URL: {}", url);
        tracing::debug!("Instruction: {:?}", request.instruction);

        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    RequestPart {
                        text: Some(request.instruction.clone()),
                        inline_data: None,
                    },
                    RequestPart {
                        text: None,
                        inline_data: Some(InlineData {
                            mime_type: Some(request.mime_type.clone()),
                            data: strip_data_uri(&request.image).to_string(),
                        }),
                    },
                ],
            }],
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(AppError::HttpClient)?;

        if response.status().is_success() {
            let parsed: GenerateContentResponse =
                response.json().await.map_err(AppError::HttpClient)?;
            let image = extract_inline_image(parsed)?;
            tracing::info!(
                "Provider returned an image ({} base64 chars, {})",
                image.data.len(),
                image.mime_type
            );
            Ok(image)
        } else {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            let error_message = format!(
                "Edit request failed. Status: {}, Body: {}",
                status, error_body
            );
            tracing::error!("{}", error_message);
            Err(AppError::Provider(error_message))
        }
    }
}

/// Pull the first inline-data part out of the response. The returned content
/// type prefers what the provider reported, then what the bytes look like.
fn extract_inline_image(response: GenerateContentResponse) -> AppResult<GeneratedImage> {
    for candidate in response.candidates {
        for part in candidate.content.parts {
            if let Some(inline) = part.inline_data {
                let bytes = STANDARD.decode(inline.data.as_bytes())?;
                let mime_type = inline
                    .mime_type
                    .filter(|m| !m.is_empty())
                    .or_else(|| sniff_mime(&bytes).map(String::from))
                    .unwrap_or_else(|| FALLBACK_MIME.to_string());
                return Ok(GeneratedImage {
                    data: inline.data,
                    mime_type,
                });
            }
        }
    }
    Err(AppError::Provider(
        "No image data found in response".to_string(),
    ))
}
