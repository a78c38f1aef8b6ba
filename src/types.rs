//! Core types used throughout scribe

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for transcription records.
///
/// Caller-supplied or time-derived; generated sparsely from a single
/// execution context, so epoch-millis strings are unique enough.
pub type RecordId = String;

/// Current epoch time in integer milliseconds
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Render integer-millis as an ISO-8601 timestamp
pub fn millis_to_iso(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .unwrap_or_else(Utc::now)
        .to_rfc3339()
}

/// A persisted key/value setting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setting {
    pub key: String,
    pub value: serde_json::Value,
    pub timestamp: i64,
}

impl Setting {
    pub fn new(key: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            key: key.into(),
            value,
            timestamp: now_millis(),
        }
    }
}

/// A saved transcription.
///
/// Serialized with the export file's key spelling (`originalName`,
/// `fileSize`), which is the stable on-disk interchange format.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionRecord {
    pub id: RecordId,
    pub filename: String,
    pub original_name: String,
    pub text: String,
    pub model: String,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub file_size: u64,
    pub timestamp: i64,
    pub starred: bool,
}

/// Caller-supplied data for a new transcription record.
///
/// The storage layer assigns `timestamp` and defaults `starred` to false;
/// a missing `id` becomes a time-derived one.
#[derive(Debug, Clone, Default)]
pub struct NewTranscription {
    pub id: Option<RecordId>,
    pub filename: String,
    pub original_name: String,
    pub text: String,
    pub model: String,
    pub language: String,
    pub duration: Option<f64>,
    pub file_size: u64,
}

/// Per-day transcription usage counter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageCounter {
    /// Calendar date, `YYYY-MM-DD`
    pub date: String,
    pub count: u32,
    pub total_chars: u64,
}

impl UsageCounter {
    /// Zero-filled counter for a date with no activity
    pub fn empty(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            count: 0,
            total_chars: 0,
        }
    }
}

/// Everything needed to replay a failed transcription request and persist
/// its result: the request identity plus the record metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDescriptor {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub original_name: String,
    pub model: String,
    pub language: String,
    pub file_size: u64,
}

/// A transcription request that failed while offline, queued for replay.
///
/// The raw request body is stored beside the descriptor as a blob.
#[derive(Debug, Clone)]
pub struct FailedRequest {
    pub id: String,
    pub timestamp: i64,
    pub descriptor: RequestDescriptor,
    pub body: Vec<u8>,
}

/// The non-sensitive settings included in a data export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportedSettings {
    #[serde(default)]
    pub selected_model: serde_json::Value,
    #[serde(default)]
    pub selected_language: serde_json::Value,
    #[serde(default)]
    pub theme: serde_json::Value,
    #[serde(default)]
    pub notifications: serde_json::Value,
}

/// Full data export: history plus non-sensitive settings.
///
/// The credential setting is never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportData {
    pub transcriptions: Vec<TranscriptionRecord>,
    pub settings: ExportedSettings,
    pub export_date: String,
    pub version: String,
}
