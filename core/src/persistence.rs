use alloc::collections::BTreeMap;
use alloc::string::String;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::*;

/// Associates a persisted type with its storage key.
pub trait StorageKey {
    const KEY: &'static str;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
    #[error("Could not write to storage: {0}")]
    Write(String),
}

/// String key-value storage, such as the browser's local storage.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> core::result::Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: &str) -> core::result::Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> core::result::Result<(), StoreError>;
}

/// In-memory store for tests and hosts without persistent storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> core::result::Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> core::result::Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> core::result::Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> core::result::Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> core::result::Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> core::result::Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Everything needed to resume a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub player_lat: f64,
    pub player_lng: f64,
    pub hand: Option<Tier>,
    #[serde(default)]
    pub cell_state: SerializedCells,
    #[serde(default)]
    pub movement_mode: MovementMode,
    #[serde(default)]
    pub has_won: bool,
}

impl Snapshot {
    pub const fn player(&self) -> LatLng {
        LatLng::new(self.player_lat, self.player_lng)
    }
}

impl StorageKey for Snapshot {
    const KEY: &'static str = "gridmerge:session:v1";
}

/// Best-effort persistence of a single value. Failures are logged and never
/// reach the caller.
#[derive(Debug)]
pub struct Persistence<S> {
    store: S,
}

impl<S: KeyValueStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn save<T: Serialize + StorageKey>(&mut self, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(err) => {
                log::warn!("Could not serialize {}: {}", T::KEY, err);
                return;
            }
        };
        if let Err(err) = self.store.set(T::KEY, &json) {
            log::warn!("Could not save {}: {}", T::KEY, err);
        }
    }

    /// Stored value, or `None` when it is absent, unreadable, or malformed.
    pub fn load<T: DeserializeOwned + StorageKey>(&self) -> Option<T> {
        let json = match self.store.get(T::KEY) {
            Ok(Some(json)) => json,
            Ok(None) => return None,
            Err(err) => {
                log::warn!("Could not read {}: {}", T::KEY, err);
                return None;
            }
        };
        serde_json::from_str(&json)
            .inspect_err(|err| log::warn!("Discarding malformed {}: {}", T::KEY, err))
            .ok()
    }

    pub fn clear<T: StorageKey>(&mut self) {
        if let Err(err) = self.store.remove(T::KEY) {
            log::warn!("Could not clear {}: {}", T::KEY, err);
        }
    }
}
