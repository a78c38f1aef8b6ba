//! Scribe - local-first audio transcription engine
//!
//! Client core for an offline-capable transcription app: encrypted-at-rest
//! credential storage, transactional history and settings persistence,
//! an offline request cache with per-class strategies, and durable replay
//! of transcription requests that failed without connectivity.

pub mod cipher;
pub mod error;
pub mod export;
pub mod providers;
pub mod service;
pub mod store;
pub mod types;
pub mod worker;

pub use error::{Error, Result};
pub use types::*;

/// Re-export the main engine components for convenience
pub use cipher::DeviceCipher;
pub use providers::{GroqTranscriptionProvider, TranscriptionProvider};
pub use service::StorageService;
pub use store::{Collection, RecordStore};
pub use worker::{OfflineController, RetryQueue};
