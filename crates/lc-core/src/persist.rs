//! Persistence of the session store to a key-value surface.
//!
//! The whole [`Store`] lives under one key as a JSON record:
//!
//! ```json
//! { "currentSessionId": "2025-01-01",
//!   "sessions": { "2025-01-01": { "id": "2025-01-01", "entries": [
//!       { "id": "…", "start": 0, "end": 6000, "createdAt": 6000 } ] } } }
//! ```
//!
//! Loading is lenient. Unknown fields are ignored and a session that fails
//! validation is dropped on its own instead of failing the whole load.
//! Saving is best-effort: errors come back as [`PersistError`] for the caller
//! to log, never as a panic.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::{ContractionLogEntry, Session, Store};
use crate::types::SessionId;

/// Key holding the serialized session store.
pub const STORE_KEY: &str = "labor-counter.session-store.v1";

/// Key holding the in-flight timer, so a restarted process can resume it.
pub const TIMER_KEY: &str = "labor-counter.timer.v1";

/// Usage ratio at or above which the storage warning is raised.
pub const STORAGE_WARNING_RATIO: f64 = 0.8;

/// Errors from a key-value backend.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// The write would exceed the available space.
    #[error("storage quota exceeded: {needed} bytes needed, {quota} available")]
    QuotaExceeded { needed: u64, quota: u64 },
    /// Any other backend failure.
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Errors while saving or loading a record.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to serialize {key}: {source}")]
    Serialize {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("malformed record under {key}: {message}")]
    Malformed { key: &'static str, message: String },
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Space used and available on a storage surface, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageEstimate {
    pub usage: u64,
    pub quota: u64,
}

impl StorageEstimate {
    /// Whether usage has reached [`STORAGE_WARNING_RATIO`] of a known quota.
    #[expect(clippy::cast_precision_loss, reason = "ratio only needs two digits")]
    pub fn is_near_quota(&self) -> bool {
        if self.quota == 0 {
            return false;
        }
        self.usage as f64 / self.quota as f64 >= STORAGE_WARNING_RATIO
    }
}

/// A string key-value surface the store is persisted to.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    fn remove(&mut self, key: &str) -> Result<(), StorageError>;

    /// Usage and quota, when the backend can tell.
    fn estimate(&self) -> Result<Option<StorageEstimate>, StorageError> {
        Ok(None)
    }
}

/// A key-value surface held in memory.
///
/// An optional byte quota makes writes fail the way a full browser store
/// would, and `fail_writes` forces every write to fail.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: HashMap<String, String>,
    quota: Option<u64>,
    pub fail_writes: bool,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects writes pushing usage past `quota` bytes.
    #[must_use]
    pub fn with_quota(quota: u64) -> Self {
        Self {
            quota: Some(quota),
            ..Self::default()
        }
    }

    fn usage(&self) -> u64 {
        self.usage_without("")
    }

    /// Bytes held by every key except `key`.
    fn usage_without(&self, key: &str) -> u64 {
        self.values
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| (k.len() + v.len()) as u64)
            .sum()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Backend("writes disabled".to_string()));
        }
        if let Some(quota) = self.quota {
            let needed = self.usage_without(key) + (key.len() + value.len()) as u64;
            if needed > quota {
                return Err(StorageError::QuotaExceeded { needed, quota });
            }
        }
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        self.values.remove(key);
        Ok(())
    }

    fn estimate(&self) -> Result<Option<StorageEstimate>, StorageError> {
        Ok(self.quota.map(|quota| StorageEstimate {
            usage: self.usage(),
            quota,
        }))
    }
}

/// A session that failed validation during load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedSession {
    pub key: String,
    pub reason: String,
}

/// The outcome of parsing a persisted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hydrated {
    pub store: Store,
    pub dropped: Vec<DroppedSession>,
}

/// Parses a persisted record, repairing what it can.
///
/// Sessions that fail validation are dropped. With no surviving sessions, or
/// when `currentSessionId` does not name a survivor, `today` becomes current
/// (and is created empty if absent). Only a record that is not a JSON object
/// at all is an error.
pub fn hydrate(raw: &str, today: &SessionId) -> Result<Hydrated, PersistError> {
    let value: Value = serde_json::from_str(raw).map_err(|e| PersistError::Malformed {
        key: STORE_KEY,
        message: e.to_string(),
    })?;
    let Value::Object(record) = value else {
        return Err(PersistError::Malformed {
            key: STORE_KEY,
            message: "record is not an object".to_string(),
        });
    };

    let mut sessions = BTreeMap::new();
    let mut dropped = Vec::new();
    if let Some(Value::Object(raw_sessions)) = record.get("sessions") {
        for (key, raw_session) in raw_sessions {
            match validate_session(key, raw_session) {
                Ok(session) => {
                    sessions.insert(session.id.clone(), session);
                }
                Err(reason) => dropped.push(DroppedSession {
                    key: key.clone(),
                    reason,
                }),
            }
        }
    }

    let current = record
        .get("currentSessionId")
        .and_then(Value::as_str)
        .and_then(|id| SessionId::new(id).ok())
        .filter(|id| sessions.contains_key(id))
        .unwrap_or_else(|| today.clone());

    Ok(Hydrated {
        store: Store::from_parts(current, sessions),
        dropped,
    })
}

/// Checks one persisted session. The map key is authoritative for its id.
fn validate_session(key: &str, raw: &Value) -> Result<Session, String> {
    let id = SessionId::new(key).map_err(|e| e.to_string())?;
    let fields: &Map<String, Value> = raw.as_object().ok_or("session is not an object")?;
    let raw_entries = fields
        .get("entries")
        .and_then(Value::as_array)
        .ok_or("entries missing or not an array")?;

    let mut seen = HashSet::new();
    let mut entries = Vec::with_capacity(raw_entries.len());
    for (position, raw_entry) in raw_entries.iter().enumerate() {
        let entry: ContractionLogEntry = serde_json::from_value(raw_entry.clone())
            .map_err(|e| format!("entry {position}: {e}"))?;
        if entry.end <= entry.start {
            return Err(format!("entry {}: end is not after start", entry.id));
        }
        if !seen.insert(entry.id.clone()) {
            return Err(format!("entry {}: duplicate id", entry.id));
        }
        entries.push(entry);
    }
    Ok(Session::new(id, entries))
}

/// Reads and writes the store through a [`KeyValueStore`].
#[derive(Debug)]
pub struct Gateway<K> {
    storage: K,
}

impl<K: KeyValueStore> Gateway<K> {
    pub const fn new(storage: K) -> Self {
        Self { storage }
    }

    pub const fn storage(&self) -> &K {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut K {
        &mut self.storage
    }

    /// Writes the whole store under [`STORE_KEY`].
    pub fn save(&mut self, store: &Store) -> Result<(), PersistError> {
        self.write_json(STORE_KEY, store)
    }

    /// Restores the store.
    ///
    /// `None` when nothing usable is stored: no record, an unreadable backend
    /// or a record that is not an object. Dropped sessions are logged.
    pub fn load(&self, today: &SessionId) -> Option<Store> {
        let raw = match self.storage.get(STORE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read session store");
                return None;
            }
        };
        match hydrate(&raw, today) {
            Ok(hydrated) => {
                for dropped in &hydrated.dropped {
                    tracing::warn!(session = %dropped.key, reason = %dropped.reason, "dropping invalid session");
                }
                Some(hydrated.store)
            }
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable session store");
                None
            }
        }
    }

    /// Whether the backend reports usage near its quota.
    ///
    /// Advisory only; a failed estimate reads as `false`.
    pub fn storage_warning(&self) -> bool {
        match self.storage.estimate() {
            Ok(estimate) => estimate.is_some_and(|e| e.is_near_quota()),
            Err(err) => {
                tracing::warn!(error = %err, "failed to estimate storage");
                false
            }
        }
    }

    pub(crate) fn write_json<T: Serialize>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), PersistError> {
        let json =
            serde_json::to_string(value).map_err(|source| PersistError::Serialize { key, source })?;
        self.storage.set(key, &json)?;
        Ok(())
    }

    pub(crate) fn read_json<T: DeserializeOwned>(
        &self,
        key: &'static str,
    ) -> Result<Option<T>, PersistError> {
        let Some(raw) = self.storage.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PersistError::Malformed {
                key,
                message: e.to_string(),
            })
    }

    pub(crate) fn remove(&mut self, key: &'static str) -> Result<(), PersistError> {
        self.storage.remove(key)?;
        Ok(())
    }
}
