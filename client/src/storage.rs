//! Persisted client state.
//!
//! The stores only see [`KeyValueStore`]; this module fixes the key names and
//! provides a JSON-file implementation for the command-line client.

use serde_json::Value;
use sorteohub_core::environment::KeyValueStore;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Storage key names
pub mod keys {
    /// User bearer token
    pub const TOKEN: &str = "token";
    /// Serialized signed-in user
    pub const USER: &str = "user";
    /// Advertiser bearer token
    pub const ADVERTISER_TOKEN: &str = "advertiserToken";
    /// Cookie consent flag
    pub const COOKIE_CONSENT: &str = "cookieConsent";
    /// When consent was given (RFC 3339)
    pub const COOKIE_CONSENT_DATE: &str = "cookieConsentDate";
    /// Last selected UI language
    pub const LANGUAGE: &str = "language";
}

/// Key-value store persisted to a JSON object on disk
///
/// The whole map is held in memory and rewritten on every change. Write
/// failures are logged; the in-memory value stays authoritative for the
/// rest of the process.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl FileKeyValueStore {
    /// Open (or lazily create) the store at `path`
    ///
    /// A missing file starts empty. Non-string values in an existing file
    /// are kept as their JSON text.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is not a
    /// JSON object.
    pub fn open(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => BTreeMap::new(),
            Ok(text) => parse_entries(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e),
        };

        tracing::debug!(path = %path.display(), entries = entries.len(), "Opened client storage");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    /// Location of the backing file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        if let Err(error) = write_atomically(&self.path, entries) {
            tracing::warn!(path = %self.path.display(), %error, "Failed to persist client storage");
        }
    }
}

fn parse_entries(text: &str) -> io::Result<BTreeMap<String, String>> {
    let map: serde_json::Map<String, Value> = serde_json::from_str(text)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    Ok(map
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

fn write_atomically(path: &Path, entries: &BTreeMap<String, String>) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(entries)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(key).is_some() {
            self.persist(&entries);
        }
    }
}
