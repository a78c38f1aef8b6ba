//! Provider abstraction layer for remote transcription services
mod groq;
mod transcription;

pub use groq::{GROQ_API_BASE, GroqTranscriptionProvider};
pub use transcription::{TranscriptionProvider, TranscriptionRequest, TranscriptionResponse};
