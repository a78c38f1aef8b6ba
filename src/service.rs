//! Public storage operations composed from the record store and the
//! device cipher.
//!
//! Every operation here recovers storage faults at the boundary: it logs
//! the fault and returns a safe default (`false`, `None`, or empty)
//! instead of propagating. The service is constructed explicitly and
//! injected into whatever layer needs it; [`StorageService::open`] is the
//! single initialization point.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Duration, Utc};
use serde_json::json;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cipher::{DeviceCipher, device_key_path};
use crate::error::Result;
use crate::store::{Collection, RecordStore};
use crate::types::{
    ExportData, ExportedSettings, FailedRequest, NewTranscription, RecordId, RequestDescriptor,
    Setting, TranscriptionRecord, UsageCounter, now_millis,
};

/// Settings key holding the obfuscated API credential
pub const SETTING_API_KEY: &str = "api_key";
pub const SETTING_API_ENDPOINT: &str = "api_endpoint";
pub const SETTING_SELECTED_MODEL: &str = "selected_model";
pub const SETTING_SELECTED_LANGUAGE: &str = "selected_language";
pub const SETTING_AUTO_SAVE_API_KEY: &str = "auto_save_api_key";
pub const SETTING_THEME: &str = "theme";
pub const SETTING_NOTIFICATIONS: &str = "notifications";

/// Default transcription provider origin
pub const DEFAULT_API_ENDPOINT: &str = "https://api.groq.com/";

/// Database file name under the data directory
pub const DB_FILE: &str = "scribe.db";

/// History cap applied to full exports
const EXPORT_LIMIT: usize = 1000;

/// Storage façade over the record store and device cipher
pub struct StorageService {
    store: RecordStore,
    cipher: DeviceCipher,
    key_path: Option<PathBuf>,
}

impl StorageService {
    /// Open the service against a data directory, creating the database
    /// and device key on first use. This is the one initialization the
    /// caller performs; all later operations assume an opened store.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let store = RecordStore::open(data_dir.join(DB_FILE))?;
        let key_path = device_key_path(data_dir);
        let cipher = DeviceCipher::load_or_create(&key_path);

        Ok(Self {
            store,
            cipher,
            key_path: Some(key_path),
        })
    }

    /// In-memory service with a throwaway device key (useful for testing)
    pub fn in_memory() -> Result<Self> {
        Ok(Self {
            store: RecordStore::in_memory()?,
            cipher: DeviceCipher::ephemeral(),
            key_path: None,
        })
    }

    /// Direct access to the underlying record store
    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    // ========== Credential ==========

    /// Obfuscate and persist the API credential. Returns success.
    pub fn store_credential(&self, plaintext: &str) -> bool {
        let obfuscated = self.cipher.obfuscate(plaintext);
        match self
            .store
            .put_setting(&Setting::new(SETTING_API_KEY, json!(obfuscated)))
        {
            Ok(()) => {
                debug!("API credential stored");
                true
            }
            Err(e) => {
                warn!("Failed to store credential: {e}");
                false
            }
        }
    }

    /// Retrieve and reveal the API credential, or `None` if absent
    pub fn get_credential(&self) -> Option<String> {
        match self.store.get_setting(SETTING_API_KEY) {
            Ok(Some(setting)) => setting
                .value
                .as_str()
                .map(|stored| self.cipher.reveal(stored)),
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to retrieve credential: {e}");
                None
            }
        }
    }

    // ========== Settings ==========

    /// Upsert a setting. Returns success.
    pub fn store_setting(&self, key: &str, value: serde_json::Value) -> bool {
        match self.store.put_setting(&Setting::new(key, value)) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to store setting {key}: {e}");
                false
            }
        }
    }

    /// Read a setting, falling back to `default` when absent or on fault
    pub fn get_setting(&self, key: &str, default: serde_json::Value) -> serde_json::Value {
        match self.store.get_setting(key) {
            Ok(Some(setting)) => setting.value,
            Ok(None) => default,
            Err(e) => {
                warn!("Failed to read setting {key}: {e}");
                default
            }
        }
    }

    // ========== Transcriptions ==========

    /// Persist a transcription and bump today's usage counter.
    ///
    /// Returns the record id, or `None` on storage fault. The counter
    /// update is a second, independent transaction; its failure is logged
    /// and otherwise ignored.
    pub fn store_transcription(&self, data: NewTranscription) -> Option<RecordId> {
        let id = data
            .id
            .unwrap_or_else(|| now_millis().to_string());

        let record = TranscriptionRecord {
            id: id.clone(),
            filename: data.filename,
            original_name: data.original_name,
            text: data.text,
            model: data.model,
            language: data.language,
            duration: data.duration,
            file_size: data.file_size,
            timestamp: now_millis(),
            starred: false,
        };

        if let Err(e) = self.store.put_transcription(&record) {
            warn!("Failed to store transcription: {e}");
            return None;
        }

        let chars = record.text.chars().count() as u64;
        if let Err(e) = self.store.increment_usage(&today(), chars) {
            warn!("Failed to update usage stats: {e}");
        }

        Some(id)
    }

    /// Most recent transcriptions, newest first
    pub fn get_all_transcriptions(&self, limit: usize) -> Vec<TranscriptionRecord> {
        match self.store.recent_transcriptions(limit) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to load transcriptions: {e}");
                Vec::new()
            }
        }
    }

    /// Look up a transcription by id
    pub fn get_transcription(&self, id: &str) -> Option<TranscriptionRecord> {
        match self.store.get_transcription(id) {
            Ok(record) => record,
            Err(e) => {
                warn!("Failed to load transcription {id}: {e}");
                None
            }
        }
    }

    /// Delete a transcription. Returns whether a record was removed.
    pub fn delete_transcription(&self, id: &str) -> bool {
        match self.store.delete_transcription(id) {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!("Failed to delete transcription {id}: {e}");
                false
            }
        }
    }

    /// Flip the starred flag on a record.
    ///
    /// `Some(state)` is the persisted new state; `None` means the record
    /// does not exist (or the write faulted), which is distinct from
    /// "now unstarred".
    pub fn toggle_star(&self, id: &str) -> Option<bool> {
        let mut record = self.get_transcription(id)?;
        record.starred = !record.starred;

        match self.store.put_transcription(&record) {
            Ok(()) => Some(record.starred),
            Err(e) => {
                warn!("Failed to toggle star on {id}: {e}");
                None
            }
        }
    }

    // ========== Usage ==========

    /// Usage counters for the trailing `days` calendar dates including
    /// today, oldest first, zero-filled for days without activity.
    pub fn get_usage_stats(&self, days: u32) -> Vec<UsageCounter> {
        let today = Utc::now().date_naive();
        let mut stats = Vec::with_capacity(days as usize);

        for back in (0..days as i64).rev() {
            let date = (today - Duration::days(back)).format("%Y-%m-%d").to_string();
            let counter = match self.store.get_usage(&date) {
                Ok(Some(counter)) => counter,
                Ok(None) => UsageCounter::empty(&date),
                Err(e) => {
                    warn!("Failed to read usage for {date}: {e}");
                    UsageCounter::empty(&date)
                }
            };
            stats.push(counter);
        }

        stats
    }

    // ========== Export / clear ==========

    /// Export history and non-sensitive settings. The credential is never
    /// part of the export.
    pub fn export_all(&self) -> Option<ExportData> {
        let transcriptions = match self.store.recent_transcriptions(EXPORT_LIMIT) {
            Ok(records) => records,
            Err(e) => {
                warn!("Failed to export data: {e}");
                return None;
            }
        };

        let settings = ExportedSettings {
            selected_model: self.get_setting(SETTING_SELECTED_MODEL, serde_json::Value::Null),
            selected_language: self.get_setting(SETTING_SELECTED_LANGUAGE, serde_json::Value::Null),
            theme: self.get_setting(SETTING_THEME, serde_json::Value::Null),
            notifications: self.get_setting(SETTING_NOTIFICATIONS, serde_json::Value::Null),
        };

        Some(ExportData {
            transcriptions,
            settings,
            export_date: Utc::now().to_rfc3339(),
            version: "1.0".to_string(),
        })
    }

    /// Empty all four collections and remove the persisted device key.
    /// Irreversible. The in-memory key is kept; it is never regenerated.
    pub fn clear_all(&self) -> bool {
        let mut ok = true;
        for collection in Collection::all() {
            if let Err(e) = self.store.clear(*collection) {
                warn!("Failed to clear {}: {e}", collection.table());
                ok = false;
            }
        }

        if let Some(key_path) = &self.key_path {
            match fs::remove_file(key_path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!("Failed to remove device key: {e}");
                    ok = false;
                }
            }
        }

        ok
    }

    // ========== Failed request queue ==========

    /// Persist a failed request for later replay. Returns the queue id.
    pub fn enqueue_failed_request(
        &self,
        descriptor: RequestDescriptor,
        body: Vec<u8>,
    ) -> Option<String> {
        let entry = FailedRequest {
            id: Uuid::new_v4().to_string(),
            timestamp: now_millis(),
            descriptor,
            body,
        };

        match self.store.put_failed_request(&entry) {
            Ok(()) => Some(entry.id),
            Err(e) => {
                warn!("Failed to enqueue request: {e}");
                None
            }
        }
    }

    /// All queued failed requests, oldest first
    pub fn pending_failed_requests(&self) -> Vec<FailedRequest> {
        match self.store.oldest_failed_requests() {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to read retry queue: {e}");
                Vec::new()
            }
        }
    }

    /// Remove a queued request after a successful replay
    pub fn remove_failed_request(&self, id: &str) -> bool {
        match self.store.delete_failed_request(id) {
            Ok(removed) => removed,
            Err(e) => {
                warn!("Failed to remove queued request {id}: {e}");
                false
            }
        }
    }
}

/// Default per-user data directory for the database and device key
pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("scribe"))
}

/// Today's calendar date as `YYYY-MM-DD`
pub(crate) fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_round_trip() {
        let service = StorageService::in_memory().unwrap();

        assert!(service.get_credential().is_none());
        assert!(service.store_credential("gsk_live_abc123"));
        assert_eq!(service.get_credential().as_deref(), Some("gsk_live_abc123"));

        // the stored value is not the plaintext
        let raw = service.get_setting(SETTING_API_KEY, serde_json::Value::Null);
        assert_ne!(raw.as_str(), Some("gsk_live_abc123"));
    }

    #[test]
    fn test_toggle_star_distinguishes_missing_record() {
        let service = StorageService::in_memory().unwrap();

        let id = service
            .store_transcription(NewTranscription {
                original_name: "clip.wav".to_string(),
                filename: "transcription-1.txt".to_string(),
                text: "hello".to_string(),
                model: "whisper-large-v3".to_string(),
                language: "en".to_string(),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(service.toggle_star(&id), Some(true));
        assert_eq!(service.toggle_star(&id), Some(false));
        assert_eq!(service.toggle_star("no-such-id"), None);
    }

    #[test]
    fn test_get_setting_falls_back_to_default() {
        let service = StorageService::in_memory().unwrap();
        let value = service.get_setting(SETTING_API_ENDPOINT, json!(DEFAULT_API_ENDPOINT));
        assert_eq!(value, json!(DEFAULT_API_ENDPOINT));
    }
}
