//! Rendering of downloadable files: the full JSON export and the
//! single-record transcript text format.

use chrono::NaiveDate;

use crate::types::{TranscriptionRecord, millis_to_iso};

/// Render a transcription as a plain-text transcript file with the fixed
/// human-readable header block.
pub fn render_transcript(record: &TranscriptionRecord) -> String {
    format!(
        "Audio Transcription\n\
         ==================\n\
         File: {}\n\
         Model: {}\n\
         Language: {}\n\
         Date: {}\n\
         \n\
         Content:\n\
         --------\n\
         {}",
        record.original_name,
        record.model,
        record.language,
        millis_to_iso(record.timestamp),
        record.text,
    )
}

/// File name for a full data export taken on `date`
pub fn export_file_name(date: NaiveDate) -> String {
    format!("scribe-export-{}.json", date.format("%Y-%m-%d"))
}

/// File name for a single transcript download
pub fn transcript_file_name(record: &TranscriptionRecord) -> String {
    if record.filename.is_empty() {
        format!("transcription-{}.txt", record.timestamp)
    } else {
        record.filename.clone()
    }
}
