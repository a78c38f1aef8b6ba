//! Groq provider for Whisper transcription over the OpenAI-compatible API

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error};

use crate::error::{Error, Result};

use super::{TranscriptionProvider, TranscriptionRequest, TranscriptionResponse};

/// Default API origin; overridable via the `api_endpoint` setting
pub const GROQ_API_BASE: &str = "https://api.groq.com/";

/// Groq Whisper transcription provider
pub struct GroqTranscriptionProvider {
    client: Client,
    api_key: Option<String>,
    endpoint: String,
}

impl GroqTranscriptionProvider {
    /// Create a new provider (API key loaded from environment if not provided)
    pub fn new(api_key: Option<String>) -> Self {
        let key = api_key.or_else(|| std::env::var("GROQ_API_KEY").ok());

        Self {
            client: Client::new(),
            api_key: key,
            endpoint: GROQ_API_BASE.to_string(),
        }
    }

    /// Override the API origin
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The API origin this provider talks to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| Error::ProviderNotConfigured("Groq API key not set".to_string()))
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.endpoint.trim_end_matches('/'), path)
    }

    /// List the models the account can use
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.api_url("openai/v1/models"))
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Model listing error: {} - {}", status, error_text);
            return Err(Error::Transcription(format!(
                "Model listing error: {} - {}",
                status, error_text
            )));
        }

        let listing: ModelsResponse = response.json().await?;
        Ok(listing.data.into_iter().map(|m| m.id).collect())
    }

    /// Check whether the configured credential is accepted by the provider.
    ///
    /// Performed against the model-listing route; a rejected credential
    /// yields `Ok(false)`, transport problems propagate as errors.
    pub async fn validate_key(&self) -> Result<bool> {
        let api_key = self.api_key()?;

        let response = self
            .client
            .get(self.api_url("openai/v1/models"))
            .header("Authorization", format!("Bearer {}", api_key))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(true);
        }
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Ok(false);
        }

        let error_text = response.text().await.unwrap_or_default();
        Err(Error::Transcription(format!(
            "Credential check failed: {} - {}",
            status, error_text
        )))
    }
}

#[derive(Debug, Deserialize)]
struct GroqTranscription {
    text: String,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[async_trait]
impl TranscriptionProvider for GroqTranscriptionProvider {
    fn name(&self) -> &'static str {
        "Groq Whisper"
    }

    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse> {
        let api_key = self.api_key()?;

        let file_part = reqwest::multipart::Part::bytes(request.audio)
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)
            .map_err(|e| Error::Transcription(format!("Failed to create form part: {e}")))?;

        let mut form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", request.model.clone())
            .text("response_format", "json")
            .text("temperature", "0");

        if let Some(lang) = &request.language {
            form = form.text("language", lang.clone());
        }

        debug!("Sending transcription request to Groq");

        let response = self
            .client
            .post(self.api_url("openai/v1/audio/transcriptions"))
            .header("Authorization", format!("Bearer {}", api_key))
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Transcription API error: {} - {}", status, error_text);
            return Err(Error::Transcription(format!(
                "Transcription API error: {} - {}",
                status, error_text
            )));
        }

        let transcription: GroqTranscription = response.json().await?;

        Ok(TranscriptionResponse {
            text: transcription.text,
        })
    }

    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}
