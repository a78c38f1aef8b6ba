//! Integration tests for the storage service
//!
//! These tests verify the public storage operations, credential
//! obfuscation at the storage boundary, and data persistence across
//! reopen.

use scribe::service::{SETTING_API_KEY, SETTING_SELECTED_MODEL, SETTING_THEME, StorageService};
use scribe::types::{NewTranscription, TranscriptionRecord};
use serde_json::json;

fn new_transcription(name: &str, text: &str) -> NewTranscription {
    NewTranscription {
        filename: format!("transcription-{name}.txt"),
        original_name: format!("{name}.mp3"),
        text: text.to_string(),
        model: "whisper-large-v3".to_string(),
        language: "en".to_string(),
        file_size: 4096,
        ..Default::default()
    }
}

fn raw_record(id: &str, timestamp: i64) -> TranscriptionRecord {
    TranscriptionRecord {
        id: id.to_string(),
        filename: format!("transcription-{id}.txt"),
        original_name: format!("{id}.mp3"),
        text: format!("text {id}"),
        model: "whisper-large-v3".to_string(),
        language: "en".to_string(),
        duration: None,
        file_size: 1024,
        timestamp,
        starred: false,
    }
}

// ============ Initialization ============

#[test]
fn test_fresh_service_is_empty() {
    let service = StorageService::in_memory().unwrap();

    assert!(service.get_credential().is_none());
    assert!(service.get_all_transcriptions(10).is_empty());
    assert!(service.pending_failed_requests().is_empty());
}

// ============ Settings ============

#[test]
fn test_setting_upsert_second_write_wins() {
    let service = StorageService::in_memory().unwrap();

    assert!(service.store_setting(SETTING_SELECTED_MODEL, json!("whisper-large-v3")));
    assert!(service.store_setting(SETTING_SELECTED_MODEL, json!("distil-whisper")));

    let value = service.get_setting(SETTING_SELECTED_MODEL, json!(null));
    assert_eq!(value, json!("distil-whisper"));
}

#[test]
fn test_get_setting_default_when_absent() {
    let service = StorageService::in_memory().unwrap();
    assert_eq!(
        service.get_setting("notifications", json!(true)),
        json!(true)
    );
}

// ============ Credential ============

#[test]
fn test_credential_never_stored_as_plaintext() {
    let service = StorageService::in_memory().unwrap();

    assert!(service.store_credential("gsk_live_secret"));
    assert_eq!(service.get_credential().as_deref(), Some("gsk_live_secret"));

    let stored = service.get_setting(SETTING_API_KEY, json!(null));
    assert_ne!(stored, json!("gsk_live_secret"));
}

// ============ Transcriptions ============

#[test]
fn test_store_and_retrieve_transcription() {
    let service = StorageService::in_memory().unwrap();

    let id = service
        .store_transcription(new_transcription("meeting", "hello world"))
        .unwrap();

    let record = service.get_transcription(&id).unwrap();
    assert_eq!(record.text, "hello world");
    assert_eq!(record.original_name, "meeting.mp3");
    assert!(!record.starred);
    assert!(record.timestamp > 0);
}

#[test]
fn test_retrieval_is_most_recent_first() {
    let service = StorageService::in_memory().unwrap();

    // explicit timestamps through the record store: t1 < t2 < t3
    for (id, ts) in [("t1", 1000), ("t2", 2000), ("t3", 3000)] {
        service.store().put_transcription(&raw_record(id, ts)).unwrap();
    }

    let recent = service.get_all_transcriptions(2);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].id, "t3");
    assert_eq!(recent[1].id, "t2");
}

#[test]
fn test_rapid_saves_keep_insertion_order() {
    let service = StorageService::in_memory().unwrap();

    let first = service
        .store_transcription(new_transcription("a", "one"))
        .unwrap();
    let second = service
        .store_transcription(new_transcription("b", "two"))
        .unwrap();

    let recent = service.get_all_transcriptions(10);
    assert_eq!(recent[0].id, second);
    assert_eq!(recent[1].id, first);
}

#[test]
fn test_delete_transcription_reports_outcome() {
    let service = StorageService::in_memory().unwrap();

    let id = service
        .store_transcription(new_transcription("x", "text"))
        .unwrap();

    assert!(service.delete_transcription(&id));
    assert!(!service.delete_transcription(&id));
    assert!(service.get_transcription(&id).is_none());
}

#[test]
fn test_star_toggle_round_trip() {
    let service = StorageService::in_memory().unwrap();

    let id = service
        .store_transcription(new_transcription("x", "text"))
        .unwrap();

    assert_eq!(service.toggle_star(&id), Some(true));
    assert!(service.get_transcription(&id).unwrap().starred);

    assert_eq!(service.toggle_star(&id), Some(false));
    assert!(!service.get_transcription(&id).unwrap().starred);

    // a missing record is distinguishable from "now unstarred"
    assert_eq!(service.toggle_star("missing"), None);
}

// ============ Usage counters ============

#[test]
fn test_usage_accumulates_per_day() {
    let service = StorageService::in_memory().unwrap();

    for text in ["one", "two", "three"] {
        service
            .store_transcription(new_transcription("clip", text))
            .unwrap();
    }

    let stats = service.get_usage_stats(1);
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].count, 3);
    assert_eq!(stats[0].total_chars, 3 + 3 + 5);
}

#[test]
fn test_usage_window_is_zero_filled_oldest_first() {
    let service = StorageService::in_memory().unwrap();

    service
        .store_transcription(new_transcription("clip", "hello"))
        .unwrap();

    let stats = service.get_usage_stats(7);
    assert_eq!(stats.len(), 7);

    // six empty days, then today
    for day in &stats[..6] {
        assert_eq!(day.count, 0);
        assert_eq!(day.total_chars, 0);
    }
    assert_eq!(stats[6].count, 1);

    // dates strictly increasing
    for pair in stats.windows(2) {
        assert!(pair[0].date < pair[1].date);
    }
}

// ============ Export ============

#[test]
fn test_export_contains_history_and_settings_but_never_credential() {
    let service = StorageService::in_memory().unwrap();

    service.store_credential("gsk_live_secret");
    service.store_setting(SETTING_SELECTED_MODEL, json!("whisper-large-v3"));
    service.store_setting(SETTING_THEME, json!("dark"));
    for name in ["a", "b", "c"] {
        service
            .store_transcription(new_transcription(name, "text"))
            .unwrap();
    }

    let export = service.export_all().unwrap();
    assert_eq!(export.transcriptions.len(), 3);
    assert_eq!(export.settings.selected_model, json!("whisper-large-v3"));
    assert_eq!(export.settings.theme, json!("dark"));
    assert_eq!(export.version, "1.0");

    let raw = serde_json::to_string(&export).unwrap();
    assert!(!raw.contains("gsk_live_secret"));
    assert!(!raw.contains("api_key"));
}

#[test]
fn test_export_caps_at_one_thousand_records() {
    let service = StorageService::in_memory().unwrap();

    for i in 0..1001 {
        service
            .store()
            .put_transcription(&raw_record(&format!("r{i}"), i))
            .unwrap();
    }

    let export = service.export_all().unwrap();
    assert_eq!(export.transcriptions.len(), 1000);

    // newest first; the single oldest record fell off
    assert_eq!(export.transcriptions[0].id, "r1000");
    assert!(export.transcriptions.iter().all(|r| r.id != "r0"));
}

// ============ Clear all ============

#[test]
fn test_clear_all_empties_every_collection() {
    let service = StorageService::in_memory().unwrap();

    service.store_credential("gsk_live_secret");
    service
        .store_transcription(new_transcription("x", "text"))
        .unwrap();

    assert!(service.clear_all());

    assert!(service.get_credential().is_none());
    assert!(service.get_all_transcriptions(10).is_empty());
    assert_eq!(service.get_usage_stats(1)[0].count, 0);
}

// ============ Durability ============

#[test]
fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();

    let id = {
        let service = StorageService::open(dir.path()).unwrap();
        service.store_credential("gsk_live_secret");
        service
            .store_transcription(new_transcription("kept", "persisted text"))
            .unwrap()
    };

    let reopened = StorageService::open(dir.path()).unwrap();
    assert_eq!(
        reopened.get_credential().as_deref(),
        Some("gsk_live_secret")
    );
    assert_eq!(
        reopened.get_transcription(&id).unwrap().text,
        "persisted text"
    );
}

#[test]
fn test_clear_all_removes_device_key_file() {
    let dir = tempfile::tempdir().unwrap();
    let service = StorageService::open(dir.path()).unwrap();
    service.store_credential("gsk_live_secret");

    let key_file = dir.path().join("device.key");
    assert!(key_file.exists());

    assert!(service.clear_all());
    assert!(!key_file.exists());

    // the in-memory key keeps working for this instance
    service.store_credential("gsk_new_secret");
    assert_eq!(service.get_credential().as_deref(), Some("gsk_new_secret"));
}
