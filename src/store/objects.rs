//! Structured objects stored as JSON strings.
//!
//! Objects and lists share the cache and commit path with scalar values;
//! only the storage key differs (see [`keys`](super::keys)).

use super::keys::{list_key, object_key};
use super::prefs::PrefsStore;
use super::value::Value;
use serde::Serialize;
use serde::de::DeserializeOwned;

impl PrefsStore {
    /// Stages `object` as JSON under the object key for `key`.
    ///
    /// Objects that fail to serialize are logged and not staged.
    pub fn put_object<T: Serialize + ?Sized>(&self, key: &str, object: &T) -> &Self {
        self.stage_json(object_key(key), object)
    }

    /// Stages `list` as a JSON array under the list key for `key` and `T`.
    ///
    /// An empty list is rejected with a warning and nothing is staged.
    pub fn put_list_object<T: Serialize>(&self, key: &str, list: &[T]) -> &Self {
        if list.is_empty() {
            tracing::warn!(key = %key, "Refusing to stage an empty list");
            return self;
        }
        self.stage_json(list_key::<T>(key), list)
    }

    /// Returns the object stored under `key`, if present and decodable.
    pub fn get_object<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.read_json(&object_key(key))
    }

    /// Returns the list of `T` stored under `key`, if present and decodable.
    pub fn get_list_object<T: DeserializeOwned>(&self, key: &str) -> Option<Vec<T>> {
        self.read_json(&list_key::<T>(key))
    }

    pub fn remove_object(&self, key: &str) {
        self.remove(&object_key(key));
    }

    /// Removes the list of `T` stored under `key`.
    pub fn remove_list_object<T>(&self, key: &str) {
        self.remove(&list_key::<T>(key));
    }

    fn stage_json<T: Serialize + ?Sized>(&self, storage_key: String, object: &T) -> &Self {
        match serde_json::to_string(object) {
            Ok(json) => self.put(storage_key, Value::String(json)),
            Err(e) => {
                tracing::warn!(key = %storage_key, error = %e, "Failed to serialize object");
                self
            },
        }
    }

    fn read_json<T: DeserializeOwned>(&self, storage_key: &str) -> Option<T> {
        let json: String = self.get_opt(storage_key)?;
        match serde_json::from_str(&json) {
            Ok(object) => Some(object),
            Err(e) => {
                tracing::debug!(key = %storage_key, error = %e, "Stored object does not decode");
                None
            },
        }
    }
}
