//! Transcription provider trait and types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Request for transcribing one audio file
#[derive(Debug, Clone)]
pub struct TranscriptionRequest {
    /// Encoded audio file contents
    pub audio: Vec<u8>,
    /// File name presented to the provider
    pub file_name: String,
    /// MIME type of the audio payload
    pub mime_type: String,
    /// Model identifier string
    pub model: String,
    /// Optional language hint (ISO 639-1 code, e.g., "en")
    pub language: Option<String>,
}

impl TranscriptionRequest {
    pub fn new(
        audio: Vec<u8>,
        file_name: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            audio,
            file_name: file_name.into(),
            mime_type: "audio/wav".to_string(),
            model: model.into(),
            language: None,
        }
    }

    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = mime_type.into();
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Response from transcription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptionResponse {
    /// Transcribed text
    pub text: String,
}

/// Trait for remote transcription providers
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &'static str;

    /// Transcribe audio to text
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionResponse>;

    /// Check if the provider is configured and ready
    fn is_configured(&self) -> bool;
}
