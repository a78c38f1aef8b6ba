//! Named response caches backing the offline controller.
//!
//! Entries live in their own SQLite database, separate from the record
//! store: cache contents can always be rebuilt from the network and are
//! garbage collected wholesale when a new worker generation activates.

use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use tracing::debug;

use crate::error::Result;
use crate::types::now_millis;

/// A cached (or synthesized) response body with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct StoredResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl StoredResponse {
    pub fn ok(content_type: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: content_type.into(),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, for diagnostics and tests
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Persistent store of named caches, each mapping request URLs to
/// stored responses
pub struct CacheStore {
    conn: Mutex<Connection>,
}

impl CacheStore {
    /// Open or create the cache database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory cache store (useful for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS cache_entries (
                cache_name TEXT NOT NULL,
                request_url TEXT NOT NULL,
                status INTEGER NOT NULL,
                content_type TEXT NOT NULL,
                body BLOB NOT NULL,
                stored_at INTEGER NOT NULL,
                PRIMARY KEY (cache_name, request_url)
            );
            "#,
        )?;
        Ok(())
    }

    /// Store a response copy under a named cache, keyed by request URL
    pub fn put(&self, cache_name: &str, request_url: &str, response: &StoredResponse) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            r#"
            INSERT OR REPLACE INTO cache_entries
                (cache_name, request_url, status, content_type, body, stored_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                cache_name,
                request_url,
                response.status as i64,
                response.content_type,
                response.body,
                now_millis(),
            ],
        )?;
        debug!("Cached {} in {}", request_url, cache_name);
        Ok(())
    }

    /// Fetch a cached response from one named cache
    pub fn get(&self, cache_name: &str, request_url: &str) -> Result<Option<StoredResponse>> {
        let conn = self.conn.lock();
        conn.query_row(
            r#"
            SELECT status, content_type, body FROM cache_entries
            WHERE cache_name = ?1 AND request_url = ?2
            "#,
            params![cache_name, request_url],
            |row| {
                Ok(StoredResponse {
                    status: row.get::<_, i64>(0)? as u16,
                    content_type: row.get(1)?,
                    body: row.get(2)?,
                })
            },
        )
        .optional()
        .map_err(Into::into)
    }

    /// Fetch a cached response, checking the given caches in order
    pub fn lookup(&self, request_url: &str, caches: &[&str]) -> Result<Option<StoredResponse>> {
        for cache_name in caches {
            if let Some(response) = self.get(cache_name, request_url)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    /// Names of every cache that currently holds entries
    pub fn cache_names(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT DISTINCT cache_name FROM cache_entries")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Drop an entire named cache, returning the number of entries removed
    pub fn delete_cache(&self, cache_name: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let rows = conn.execute(
            "DELETE FROM cache_entries WHERE cache_name = ?1",
            params![cache_name],
        )?;
        debug!("Deleted cache {}: {} entries removed", cache_name, rows);
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_round_trip() {
        let cache = CacheStore::in_memory().unwrap();
        let response = StoredResponse::ok("text/css", b"body{}".to_vec());

        cache.put("static-v1", "/styles.css", &response).unwrap();
        let found = cache.get("static-v1", "/styles.css").unwrap().unwrap();
        assert_eq!(found, response);

        assert!(cache.get("dynamic-v1", "/styles.css").unwrap().is_none());
    }

    #[test]
    fn test_lookup_respects_cache_order() {
        let cache = CacheStore::in_memory().unwrap();
        cache
            .put("static-v1", "/app.js", &StoredResponse::ok("text/javascript", b"static".to_vec()))
            .unwrap();
        cache
            .put("dynamic-v1", "/app.js", &StoredResponse::ok("text/javascript", b"dynamic".to_vec()))
            .unwrap();

        let found = cache
            .lookup("/app.js", &["static-v1", "dynamic-v1"])
            .unwrap()
            .unwrap();
        assert_eq!(found.body, b"static".to_vec());
    }

    #[test]
    fn test_delete_cache_removes_only_that_generation() {
        let cache = CacheStore::in_memory().unwrap();
        cache
            .put("static-v0", "/", &StoredResponse::ok("text/html", b"old".to_vec()))
            .unwrap();
        cache
            .put("static-v1", "/", &StoredResponse::ok("text/html", b"new".to_vec()))
            .unwrap();

        assert_eq!(cache.delete_cache("static-v0").unwrap(), 1);

        let names = cache.cache_names().unwrap();
        assert_eq!(names, vec!["static-v1".to_string()]);
        assert!(cache.get("static-v1", "/").unwrap().is_some());
    }
}
