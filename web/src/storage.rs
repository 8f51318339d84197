use gloo::storage::{LocalStorage, Storage};
use gridmerge_core::{KeyValueStore, StoreError};

/// The browser's local storage.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct LocalStore;

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        LocalStorage::raw()
            .get_item(key)
            .map_err(|err| StoreError::Unavailable(format!("{:?}", err)))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        LocalStorage::raw()
            .set_item(key, value)
            .map_err(|err| StoreError::Write(format!("{:?}", err)))
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        LocalStorage::raw()
            .remove_item(key)
            .map_err(|err| StoreError::Unavailable(format!("{:?}", err)))
    }
}
