//! SQLite record store for settings, transcription history, the failed
//! request queue, and per-day usage counters.
//!
//! Every operation is a single auto-committed statement, so calls are
//! atomic within one collection but nothing is atomic across collections.
//! A crash between a transcription write and its usage-counter bump can
//! leave the counter stale; callers accept that.

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::{FailedRequest, RequestDescriptor, Setting, TranscriptionRecord, UsageCounter};

/// The four logical collections held by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Settings,
    Transcriptions,
    FailedRequests,
    ApiUsage,
}

impl Collection {
    pub fn table(&self) -> &'static str {
        match self {
            Collection::Settings => "settings",
            Collection::Transcriptions => "transcriptions",
            Collection::FailedRequests => "failed_requests",
            Collection::ApiUsage => "api_usage",
        }
    }

    pub fn all() -> &'static [Collection] {
        &[
            Collection::Settings,
            Collection::Transcriptions,
            Collection::FailedRequests,
            Collection::ApiUsage,
        ]
    }
}

/// Storage backend using SQLite
pub struct RecordStore {
    conn: Mutex<Connection>,
}

impl RecordStore {
    /// Open or create a database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory database (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Initialize database schema. Safe to run on an existing database.
    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                timestamp INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS transcriptions (
                id TEXT PRIMARY KEY,
                filename TEXT NOT NULL,
                original_name TEXT NOT NULL,
                text TEXT NOT NULL,
                model TEXT NOT NULL,
                language TEXT NOT NULL,
                duration REAL,
                file_size INTEGER NOT NULL,
                timestamp INTEGER NOT NULL,
                starred INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS failed_requests (
                id TEXT PRIMARY KEY,
                timestamp INTEGER NOT NULL,
                descriptor TEXT NOT NULL,
                body BLOB NOT NULL
            );

            CREATE TABLE IF NOT EXISTS api_usage (
                date TEXT PRIMARY KEY,
                count INTEGER NOT NULL DEFAULT 0,
                total_chars INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_transcriptions_timestamp ON transcriptions(timestamp);
            CREATE INDEX IF NOT EXISTS idx_failed_requests_timestamp ON failed_requests(timestamp);
            "#,
        )?;

        info!("Database schema initialized");
        Ok(())
    }

    // ========== Settings ==========

    /// Save or update a setting (upsert by key)
    pub fn put_setting(&self, setting: &Setting) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO settings (key, value, timestamp)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                timestamp = excluded.timestamp
            "#,
            params![
                setting.key,
                serde_json::to_string(&setting.value)?,
                setting.timestamp
            ],
        )?;
        Ok(())
    }

    /// Get a setting by key
    pub fn get_setting(&self, key: &str) -> Result<Option<Setting>> {
        let row: Option<(String, i64)> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT value, timestamp FROM settings WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?
        };

        match row {
            Some((value, timestamp)) => Ok(Some(Setting {
                key: key.to_string(),
                value: serde_json::from_str(&value)?,
                timestamp,
            })),
            None => Ok(None),
        }
    }

    /// Delete a setting by key
    pub fn delete_setting(&self, key: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM settings WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    // ========== Transcriptions ==========

    /// Save a transcription record (upsert by id)
    pub fn put_transcription(&self, record: &TranscriptionRecord) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO transcriptions
                (id, filename, original_name, text, model, language,
                 duration, file_size, timestamp, starred)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.id,
                record.filename,
                record.original_name,
                record.text,
                record.model,
                record.language,
                record.duration,
                record.file_size as i64,
                record.timestamp,
                record.starred as i32,
            ],
        )?;
        debug!("Saved transcription {}", record.id);
        Ok(())
    }

    /// Get a transcription record by id
    pub fn get_transcription(&self, id: &str) -> Result<Option<TranscriptionRecord>> {
        let conn = self.conn.lock();
        conn.query_row(
            r#"
            SELECT id, filename, original_name, text, model, language,
                   duration, file_size, timestamp, starred
            FROM transcriptions
            WHERE id = ?1
            "#,
            params![id],
            map_transcription_row,
        )
        .optional()
        .map_err(Into::into)
    }

    /// Get the most recent transcriptions, newest first.
    ///
    /// Ties on `timestamp` resolve to the later insert.
    pub fn recent_transcriptions(&self, limit: usize) -> Result<Vec<TranscriptionRecord>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            r#"
            SELECT id, filename, original_name, text, model, language,
                   duration, file_size, timestamp, starred
            FROM transcriptions
            ORDER BY timestamp DESC, rowid DESC
            LIMIT ?1
            "#,
        )?;

        let records = stmt
            .query_map([limit as i64], map_transcription_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Delete a transcription record by id
    pub fn delete_transcription(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM transcriptions WHERE id = ?1", params![id])?;
        debug!("Deleted transcription {}: {} rows affected", id, rows);
        Ok(rows > 0)
    }

    /// Count all stored transcriptions
    pub fn transcription_count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM transcriptions", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ========== Failed request queue ==========

    /// Persist a failed request for later replay
    pub fn put_failed_request(&self, entry: &FailedRequest) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO failed_requests (id, timestamp, descriptor, body)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                entry.id,
                entry.timestamp,
                serde_json::to_string(&entry.descriptor)?,
                entry.body,
            ],
        )?;
        debug!("Queued failed request {}", entry.id);
        Ok(())
    }

    /// All queued failed requests, oldest first
    pub fn oldest_failed_requests(&self) -> Result<Vec<FailedRequest>> {
        let rows: Vec<(String, i64, String, Vec<u8>)> = {
            let conn = self.conn.lock();
            let mut stmt = conn.prepare(
                r#"
                SELECT id, timestamp, descriptor, body
                FROM failed_requests
                ORDER BY timestamp ASC, rowid ASC
                "#,
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let mut entries = Vec::with_capacity(rows.len());
        for (id, timestamp, descriptor, body) in rows {
            let descriptor: RequestDescriptor = serde_json::from_str(&descriptor)?;
            entries.push(FailedRequest {
                id,
                timestamp,
                descriptor,
                body,
            });
        }
        Ok(entries)
    }

    /// Remove a failed request after a successful replay
    pub fn delete_failed_request(&self, id: &str) -> Result<bool> {
        let conn = self.conn.lock();
        let rows = conn.execute("DELETE FROM failed_requests WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // ========== Usage counters ==========

    /// Increment the counter for a calendar date (upsert by date)
    pub fn increment_usage(&self, date: &str, chars: u64) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT INTO api_usage (date, count, total_chars)
            VALUES (?1, 1, ?2)
            ON CONFLICT(date) DO UPDATE SET
                count = count + 1,
                total_chars = total_chars + excluded.total_chars
            "#,
            params![date, chars as i64],
        )?;
        Ok(())
    }

    /// Get the counter for a calendar date, if any activity was recorded
    pub fn get_usage(&self, date: &str) -> Result<Option<UsageCounter>> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT date, count, total_chars FROM api_usage WHERE date = ?1",
            params![date],
            |row| {
                Ok(UsageCounter {
                    date: row.get(0)?,
                    count: row.get::<_, i64>(1)? as u32,
                    total_chars: row.get::<_, i64>(2)? as u64,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    // ========== Maintenance ==========

    /// Empty one collection, returning the number of removed records
    pub fn clear(&self, collection: Collection) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn.execute(&format!("DELETE FROM {}", collection.table()), [])?;
        debug!("Cleared {}: {} rows removed", collection.table(), rows);
        Ok(rows)
    }
}

fn map_transcription_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<TranscriptionRecord> {
    Ok(TranscriptionRecord {
        id: row.get(0)?,
        filename: row.get(1)?,
        original_name: row.get(2)?,
        text: row.get(3)?,
        model: row.get(4)?,
        language: row.get(5)?,
        duration: row.get(6)?,
        file_size: row.get::<_, i64>(7)? as u64,
        timestamp: row.get(8)?,
        starred: row.get::<_, i32>(9)? != 0,
    })
}
