//! REST client for the Gemini text and Imagen image endpoints.

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::{GeminiConfig, ScriptConfig};
use crate::error::{Result, FactoryError};
use crate::script::TextGenerator;
use crate::visuals::ImageGenerator;

const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub instances: Vec<PredictInstance>,
    pub parameters: PredictParameters,
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
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub predictions: Vec<Prediction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub bytes_base64_encoded: Option<String>,
    pub mime_type: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

impl PredictResponse {
    /// Decoded bytes of the first prediction
    pub fn first_image(&self) -> Result<Vec<u8>> {
        let prediction = self
            .predictions
            .first()
            .ok_or_else(|| FactoryError::Api("No image generated".to_string()))?;

        let encoded = prediction
            .bytes_base64_encoded
            .as_deref()
            .ok_or_else(|| FactoryError::Api("Image payload missing from response".to_string()))?;

        debug!("Received image payload ({})", prediction.mime_type.as_deref().unwrap_or("unknown type"));

        BASE64
            .decode(encoded)
            .map_err(|e| FactoryError::Api(format!("Invalid image payload: {}", e)))
    }
}

/// Gemini client shared by script processing and image generation
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
    script: ScriptConfig,
    api_key: String,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig, script: ScriptConfig) -> Result<Self> {
        let api_key = config.require_api_key()?.to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            config,
            script,
            api_key,
        })
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}/models/{}:{}", self.config.endpoint.trim_end_matches('/'), model, method)
    }

    async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<reqwest::Response> {
        debug!("POST {}", url);

        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(FactoryError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        Ok(response)
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate_text(&self, prompt: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part { text: Some(prompt.to_string()) }],
            }],
            generation_config: GenerationConfig {
                temperature: self.script.temperature,
                max_output_tokens: self.script.max_output_tokens,
            },
        };

        let url = self.model_url(&self.config.text_model, "generateContent");
        let response: GenerateContentResponse = self.post(&url, &request).await?.json().await?;

        response
            .first_text()
            .ok_or_else(|| FactoryError::Api("Text model returned no content".to_string()))
    }
}

#[async_trait]
impl ImageGenerator for GeminiClient {
    async fn generate_image(&self, prompt: &str) -> Result<Vec<u8>> {
        let request = PredictRequest {
            instances: vec![PredictInstance { prompt: prompt.to_string() }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: self.config.aspect_ratio.clone(),
            },
        };

        let url = self.model_url(&self.config.image_model, "predict");
        let response: PredictResponse = self.post(&url, &request).await?.json().await?;

        response.first_image()
    }
}
