//! Reversible obfuscation of short secrets with a per-device keystream.
//!
//! This is obfuscation, not cryptographic confidentiality: it resists
//! casual inspection of the stored value, but anyone with read access to
//! both the obfuscated value and the device key can reverse it. If real
//! confidentiality is ever required, replace this with an authenticated
//! symmetric cipher and managed key storage.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Default file name for the persisted device key
pub const DEVICE_KEY_FILE: &str = "device.key";

/// Symmetric keystream cipher bound to one device installation.
///
/// The key is derived once and persisted outside the record store; losing
/// it (wiped data directory) permanently invalidates previously obfuscated
/// values. That is accepted, not recovered from.
pub struct DeviceCipher {
    key: Option<String>,
}

impl DeviceCipher {
    /// Load the device key from `path`, deriving and persisting a fresh one
    /// on first use. Never fails: if the key cannot be read or written the
    /// cipher degrades to the identity transform.
    pub fn load_or_create<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(existing) => {
                let existing = existing.trim();
                if !existing.is_empty() {
                    return Self {
                        key: Some(existing.to_string()),
                    };
                }
                warn!("Device key file is empty, regenerating");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!("Failed to read device key: {e}");
                return Self { key: None };
            }
        }

        let key = derive_device_key();
        if let Some(parent) = path.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warn!("Failed to create key directory: {e}");
                return Self { key: None };
            }
        }
        match fs::write(path, &key) {
            Ok(()) => {
                debug!("Generated new device key");
                Self { key: Some(key) }
            }
            Err(e) => {
                warn!("Failed to persist device key: {e}");
                Self { key: None }
            }
        }
    }

    /// Cipher with an explicit key (tests, or a key managed elsewhere)
    pub fn from_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
        }
    }

    /// Cipher with a throwaway key that is never persisted.
    ///
    /// Values obfuscated by it are unreadable once the instance is gone;
    /// meant for short-lived in-memory stores.
    pub fn ephemeral() -> Self {
        Self {
            key: Some(derive_device_key()),
        }
    }

    /// Cipher that passes values through unchanged
    pub fn disabled() -> Self {
        Self { key: None }
    }

    /// Obfuscate `plaintext` into printable text.
    ///
    /// Fails open: any problem returns the input unchanged.
    pub fn obfuscate(&self, plaintext: &str) -> String {
        let Some(key) = self.key.as_deref() else {
            return plaintext.to_string();
        };
        if plaintext.is_empty() || key.is_empty() {
            return plaintext.to_string();
        }

        let mixed: Vec<u8> = plaintext
            .bytes()
            .zip(key.bytes().cycle())
            .map(|(b, k)| b ^ k)
            .collect();
        STANDARD.encode(mixed)
    }

    /// Reverse [`DeviceCipher::obfuscate`].
    ///
    /// Fails open: undecodable input or a key mismatch returns the input
    /// unchanged.
    pub fn reveal(&self, obfuscated: &str) -> String {
        let Some(key) = self.key.as_deref() else {
            return obfuscated.to_string();
        };
        if obfuscated.is_empty() || key.is_empty() {
            return obfuscated.to_string();
        }

        let decoded = match STANDARD.decode(obfuscated) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to decode obfuscated value: {e}");
                return obfuscated.to_string();
            }
        };

        let mixed: Vec<u8> = decoded
            .into_iter()
            .zip(key.bytes().cycle())
            .map(|(b, k)| b ^ k)
            .collect();

        match String::from_utf8(mixed) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                warn!("Revealed value is not valid UTF-8: {e}");
                obfuscated.to_string()
            }
        }
    }
}

/// Default location for the device key under a data directory
pub fn device_key_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DEVICE_KEY_FILE)
}

/// Derive a fresh device key: 32 bytes of strong randomness mixed with
/// ambient host identifiers, hashed to a hex digest.
fn derive_device_key() -> String {
    let mut random = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut random);

    let mut hasher = Sha256::new();
    hasher.update(random);
    hasher.update(std::env::consts::OS);
    hasher.update(std::env::consts::ARCH);
    hasher.update(std::env::var("HOSTNAME").unwrap_or_default());
    hasher.update(std::env::var("LANG").unwrap_or_default());

    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}
