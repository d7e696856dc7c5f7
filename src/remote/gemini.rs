/// Gemini provider
///
/// Direct REST calls against the Generative Language API:
/// `generateContent` for image edits and prompt enhancement, and the
/// Imagen `predict` endpoint for text-to-image generation

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ImageService, RemoteError};
use crate::config::Config;
use crate::state::data::Image;

/// Gemini client for edit / generate / enhance requests
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    edit_model: String,
    text_model: String,
    image_model: String,
}

impl GeminiClient {
    /// Build a client from the loaded configuration
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            edit_model: config.edit_model.clone(),
            text_model: config.text_model.clone(),
            image_model: config.image_model.clone(),
        })
    }

    /// Send a generateContent request
    pub async fn generate_content(
        &self,
        model: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, RemoteError> {
        self.post(&self.endpoint(model, "generateContent"), request).await
    }

    /// Send an Imagen predict request
    pub async fn predict(
        &self,
        model: &str,
        request: &PredictRequest,
    ) -> Result<PredictResponse, RemoteError> {
        self.post(&self.endpoint(model, "predict"), request).await
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.base_url, model, method)
    }

    async fn post<B, R>(&self, url: &str, body: &B) -> Result<R, RemoteError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(%url, "POST");

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(api_error(status, &body));
        }

        Ok(response.json().await?)
    }
}

impl ImageService for GeminiClient {
    async fn edit_image(&self, image: Image, prompt: String) -> Result<Image, RemoteError> {
        let request = GenerateContentRequest::new(vec![Content::user(vec![
            Part::inline(&image),
            Part::text(prompt),
        ])])
        .with_generation_config(GenerationConfig::image_only());

        let response = self.generate_content(&self.edit_model, &request).await?;
        edit_result(&response)
    }

    async fn generate_image(&self, prompt: String) -> Result<Image, RemoteError> {
        let request = PredictRequest::single_png(prompt);
        let response = self.predict(&self.image_model, &request).await?;
        generate_result(response)
    }

    async fn enhance_prompt(&self, prompt: String) -> Result<String, RemoteError> {
        let request = GenerateContentRequest::new(vec![Content::user(vec![Part::text(
            enhance_instruction(&prompt),
        )])]);

        let response = self.generate_content(&self.text_model, &request).await?;
        enhance_result(&response)
    }
}

/// The edited image, or why there is none
fn edit_result(response: &GenerateContentResponse) -> Result<Image, RemoteError> {
    match response.first_image() {
        Some(data) => Ok(Image::from_base64(&data.mime_type, &data.data)?),
        None => {
            let reason = response.block_reason();
            warn!(?reason, "edit response carried no image");
            Err(RemoteError::NoImage { reason })
        }
    }
}

/// First prediction that carries bytes. Imagen omits the type for PNG.
fn generate_result(response: PredictResponse) -> Result<Image, RemoteError> {
    let prediction = response
        .predictions
        .into_iter()
        .find(|p| p.bytes_base64_encoded.is_some())
        .ok_or(RemoteError::NoImage { reason: None })?;

    let mime_type = prediction.mime_type.as_deref().unwrap_or("image/png");
    let data = prediction.bytes_base64_encoded.unwrap_or_default();
    Ok(Image::from_base64(mime_type, &data)?)
}

fn enhance_result(response: &GenerateContentResponse) -> Result<String, RemoteError> {
    let text = response.text();
    let text = text.trim();
    if text.is_empty() {
        return Err(RemoteError::NoText);
    }
    Ok(text.to_string())
}

/// Meta-prompt used to rewrite a user's prompt
pub fn enhance_instruction(prompt: &str) -> String {
    format!(
        "Enhance the following image generation prompt to be more descriptive, vivid, and artistic. \
         Return only the enhanced prompt, without any preamble, labels, or quotation marks. \
         The original prompt is: \"{}\"",
        prompt
    )
}

// ========== generateContent wire types ==========

/// generateContent request body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

impl GenerateContentRequest {
    pub fn new(contents: Vec<Content>) -> Self {
        Self {
            contents,
            generation_config: None,
        }
    }

    pub fn with_generation_config(mut self, cfg: GenerationConfig) -> Self {
        self.generation_config = Some(cfg);
        self
    }
}

/// One message in a conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn user(parts: Vec<Part>) -> Self {
        Self {
            role: Some("user".to_string()),
            parts,
        }
    }
}

/// Text or inline binary data
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn inline(image: &Image) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: image.media_type().to_string(),
                data: image.to_base64(),
            }),
            ..Self::default()
        }
    }
}

/// Base64 payload with its media type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub response_modalities: Vec<String>,
}

impl GenerationConfig {
    /// Ask for an image-only answer
    pub fn image_only() -> Self {
        Self {
            response_modalities: vec!["IMAGE".to_string()],
        }
    }
}

/// generateContent response body
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,

    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
}

impl GenerateContentResponse {
    fn first_parts(&self) -> &[Part] {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| c.parts.as_slice())
            .unwrap_or_default()
    }

    /// First inline image of the first candidate
    pub fn first_image(&self) -> Option<&InlineData> {
        self.first_parts().iter().find_map(|p| p.inline_data.as_ref())
    }

    /// All text parts of the first candidate, concatenated
    pub fn text(&self) -> String {
        self.first_parts()
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect()
    }

    /// Why the model produced nothing, when it says
    pub fn block_reason(&self) -> Option<String> {
        self.prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone())
            .or_else(|| {
                self.candidates
                    .first()
                    .and_then(|c| c.finish_reason.clone())
                    .filter(|r| r != "STOP")
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,

    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

// ========== Imagen predict wire types ==========

/// Imagen predict request body
#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
}

impl PredictRequest {
    /// One square PNG for `prompt`
    pub fn single_png(prompt: impl Into<String>) -> Self {
        Self {
            instances: vec![PredictInstance {
                prompt: prompt.into(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: "1:1".to_string(),
                output_options: OutputOptions {
                    mime_type: "image/png".to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictInstance {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictParameters {
    pub sample_count: u32,
    pub aspect_ratio: String,
    pub output_options: OutputOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputOptions {
    pub mime_type: String,
}

/// Imagen predict response body
#[derive(Debug, Clone, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(default)]
    pub bytes_base64_encoded: Option<String>,

    #[serde(default)]
    pub mime_type: Option<String>,
}

// ========== Errors ==========

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetails {
    message: String,
}

fn parse_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ApiErrorResponse>(body)
        .ok()
        .map(|e| e.error.message)
}

fn api_error(status: StatusCode, body: &str) -> RemoteError {
    let message = parse_error_message(body).unwrap_or_else(|| body.to_string());
    RemoteError::Api {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::data::{FormatError, MediaType};
    use assert_matches::assert_matches;
    use serde_json::json;

    fn content_response(value: serde_json::Value) -> GenerateContentResponse {
        serde_json::from_value(value).unwrap()
    }

    fn predict_response(value: serde_json::Value) -> PredictResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_edit_result_decodes_image() {
        let response = content_response(json!({
            "candidates": [{
                "content": { "parts": [
                    { "text": "Done" },
                    { "inlineData": { "mimeType": "image/webp", "data": "AQID" } }
                ]},
                "finishReason": "STOP"
            }]
        }));

        let image = edit_result(&response).unwrap();
        assert_eq!(image.media_type().as_str(), "image/webp");
        assert_eq!(image.bytes(), &[1u8, 2, 3]);
    }

    #[test]
    fn test_edit_result_blocked() {
        let response = content_response(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }));
        assert_eq!(
            edit_result(&response),
            Err(RemoteError::NoImage {
                reason: Some("SAFETY".to_string())
            })
        );

        let response = content_response(json!({
            "candidates": [{
                "content": { "parts": [{ "text": "I can't do that" }] },
                "finishReason": "STOP"
            }]
        }));
        assert_eq!(
            edit_result(&response),
            Err(RemoteError::NoImage { reason: None })
        );
    }

    #[test]
    fn test_edit_result_bad_payload() {
        let response = content_response(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "image/png", "data": "not base64!" } }
            ]}}]
        }));
        assert_matches!(
            edit_result(&response),
            Err(RemoteError::Payload(FormatError::Base64(_)))
        );

        let response = content_response(json!({
            "candidates": [{ "content": { "parts": [
                { "inlineData": { "mimeType": "text/plain", "data": "AQID" } }
            ]}}]
        }));
        assert_matches!(
            edit_result(&response),
            Err(RemoteError::Payload(FormatError::NotAnImage(_)))
        );
    }

    #[test]
    fn test_generate_result_skips_empty_predictions() {
        let response = predict_response(json!({
            "predictions": [
                { "mimeType": "image/png" },
                { "bytesBase64Encoded": "AQID" }
            ]
        }));

        let image = generate_result(response).unwrap();
        assert_eq!(image.media_type().as_str(), "image/png");
        assert_eq!(image.bytes(), &[1u8, 2, 3]);
    }

    #[test]
    fn test_generate_result_without_bytes() {
        assert_eq!(
            generate_result(predict_response(json!({}))),
            Err(RemoteError::NoImage { reason: None })
        );
        assert_eq!(
            generate_result(predict_response(json!({
                "predictions": [{ "mimeType": "image/png" }]
            }))),
            Err(RemoteError::NoImage { reason: None })
        );
    }

    #[test]
    fn test_enhance_result_trims() {
        let response = content_response(json!({
            "candidates": [{ "content": { "parts": [
                { "text": "  A vivid red fox at dawn\n" }
            ]}}]
        }));
        assert_eq!(
            enhance_result(&response).unwrap(),
            "A vivid red fox at dawn"
        );
    }

    #[test]
    fn test_enhance_result_empty() {
        let response = content_response(json!({
            "candidates": [{ "content": { "parts": [{ "text": "   " }] } }]
        }));
        assert_eq!(enhance_result(&response), Err(RemoteError::NoText));
        assert_eq!(
            enhance_result(&content_response(json!({}))),
            Err(RemoteError::NoText)
        );
    }

    #[test]
    fn test_edit_request_shape() {
        let image = Image::new(MediaType::parse("image/jpeg").unwrap(), vec![1u8, 2, 3]).unwrap();
        let request = GenerateContentRequest::new(vec![Content::user(vec![
            Part::inline(&image),
            Part::text("make it snow"),
        ])])
        .with_generation_config(GenerationConfig::image_only());

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "inlineData": { "mimeType": "image/jpeg", "data": "AQID" } },
                        { "text": "make it snow" }
                    ]
                }],
                "generationConfig": { "responseModalities": ["IMAGE"] }
            })
        );
    }

    #[test]
    fn test_text_request_omits_generation_config() {
        let request = GenerateContentRequest::new(vec![Content::user(vec![Part::text("hi")])]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("generationConfig").is_none());
    }

    #[test]
    fn test_predict_request_shape() {
        let value = serde_json::to_value(PredictRequest::single_png("a red fox")).unwrap();
        assert_eq!(
            value,
            json!({
                "instances": [{ "prompt": "a red fox" }],
                "parameters": {
                    "sampleCount": 1,
                    "aspectRatio": "1:1",
                    "outputOptions": { "mimeType": "image/png" }
                }
            })
        );
    }

    #[test]
    fn test_first_image_skips_text_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Here you go" },
                        { "inlineData": { "mimeType": "image/png", "data": "iVBO" } }
                    ]
                },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();

        let image = response.first_image().unwrap();
        assert_eq!(image.mime_type, "image/png");
        assert_eq!(image.data, "iVBO");
        assert_eq!(response.text(), "Here you go");
        assert_eq!(response.block_reason(), None);
    }

    #[test]
    fn test_blocked_response() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        assert!(response.first_image().is_none());
        assert_eq!(response.text(), "");
        assert_eq!(response.block_reason().as_deref(), Some("SAFETY"));

        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "IMAGE_SAFETY" }]
        }))
        .unwrap();
        assert_eq!(response.block_reason().as_deref(), Some("IMAGE_SAFETY"));
    }

    #[test]
    fn test_predict_response() {
        let response: PredictResponse = serde_json::from_value(json!({
            "predictions": [{ "bytesBase64Encoded": "AQID", "mimeType": "image/png" }]
        }))
        .unwrap();

        let prediction = &response.predictions[0];
        assert_eq!(prediction.bytes_base64_encoded.as_deref(), Some("AQID"));
        assert_eq!(prediction.mime_type.as_deref(), Some("image/png"));
    }

    #[test]
    fn test_api_error_message() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            api_error(StatusCode::BAD_REQUEST, body),
            RemoteError::Api {
                status: 400,
                message: "API key not valid".to_string()
            }
        );

        assert_eq!(
            api_error(StatusCode::BAD_GATEWAY, "upstream down"),
            RemoteError::Api {
                status: 502,
                message: "upstream down".to_string()
            }
        );
    }

    #[test]
    fn test_enhance_instruction_quotes_prompt() {
        let instruction = enhance_instruction("a cat");
        assert!(instruction.starts_with("Enhance the following image generation prompt"));
        assert!(instruction.ends_with("The original prompt is: \"a cat\""));
    }
}
