//! Extension key-value storage behind one `LoadSave` contract.
//!
//! Firefox exposes promise-based `browser.storage.local`; Chrome (and anything
//! unrecognised) goes through callback-based `chrome.storage.local`. Both deal
//! in whole records: a save overwrites everything stored under its key.

mod chrome;
mod firefox;
#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};

use crate::config::{StorageFlavor, Vendor};

use chrome::ChromeStorage;
use firefox::FirefoxStorage;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("could not encode record `{key}`: {message}")]
    Encode { key: String, message: String },
    #[error("could not decode record `{key}`: {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw access to one vendor's local storage area.
#[async_trait(?Send)]
pub trait LoadSave {
    /// `Ok(None)` when nothing is stored under `key`.
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError>;

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError>;

    fn flavor(&self) -> StorageFlavor;
}

pub fn backend_for(flavor: StorageFlavor) -> Box<dyn LoadSave> {
    match flavor {
        StorageFlavor::Promise => Box::new(FirefoxStorage),
        StorageFlavor::Callback => Box::new(ChromeStorage),
    }
}

/// Typed record access over whichever backend the vendor needs.
pub struct StorageAdapter {
    vendor: Vendor,
    backend: Box<dyn LoadSave>,
}

impl StorageAdapter {
    pub fn for_vendor(vendor: Vendor) -> Self {
        Self::with_backend(vendor, backend_for(vendor.storage_flavor()))
    }

    pub fn with_backend(vendor: Vendor, backend: Box<dyn LoadSave>) -> Self {
        Self { vendor, backend }
    }

    pub fn flavor(&self) -> StorageFlavor {
        self.backend.flavor()
    }

    pub async fn save<T: Serialize>(&self, key: &str, records: &[T]) -> Result<(), StorageError> {
        log::debug!("Browser type: {} (saving `{key}`)", self.vendor);
        let value = serde_json::to_value(records).map_err(|e| StorageError::Encode {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.backend.save(key, value).await
    }

    /// Missing records come back as an empty list.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, StorageError> {
        log::debug!("Browser type: {} (loading `{key}`)", self.vendor);
        match self.backend.load(key).await? {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(value) => serde_json::from_value(value).map_err(|source| StorageError::Decode {
                key: key.to_string(),
                source,
            }),
        }
    }
}

fn js_error_message(err: &JsValue) -> String {
    if let Some(error) = err.dyn_ref::<js_sys::Error>() {
        return String::from(error.message());
    }
    if let Some(text) = err.as_string() {
        return text;
    }
    // `chrome.runtime.lastError` is a plain object with a `message` field.
    js_sys::Reflect::get(err, &JsValue::from_str("message"))
        .ok()
        .and_then(|message| message.as_string())
        .unwrap_or_else(|| format!("{err:?}"))
}

fn items_object(key: &str, value: &Value) -> Result<JsValue, StorageError> {
    let serializer = serde_wasm_bindgen::Serializer::json_compatible();
    let encoded = value.serialize(&serializer).map_err(|e| StorageError::Encode {
        key: key.to_string(),
        message: e.to_string(),
    })?;
    let items = js_sys::Object::new();
    js_sys::Reflect::set(&items, &JsValue::from_str(key), &encoded)
        .map_err(|e| StorageError::Backend(js_error_message(&e)))?;
    Ok(items.into())
}

fn record_from_items(items: &JsValue, key: &str) -> Result<Option<Value>, StorageError> {
    if items.is_undefined() || items.is_null() {
        return Ok(None);
    }
    let record = js_sys::Reflect::get(items, &JsValue::from_str(key))
        .map_err(|e| StorageError::Backend(js_error_message(&e)))?;
    if record.is_undefined() || record.is_null() {
        return Ok(None);
    }
    let text = js_sys::JSON::stringify(&record)
        .map_err(|e| StorageError::Backend(js_error_message(&e)))?;
    decode_record(key, &String::from(text)).map(Some)
}

fn decode_record(key: &str, text: &str) -> Result<Value, StorageError> {
    serde_json::from_str(text).map_err(|source| StorageError::Decode {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStorage;
    use super::*;
    use crate::model::{Sheet, SheetId, Tag};
    use chrono::{TimeZone, Utc};
    use futures::executor::block_on;
    use serde_json::json;

    fn adapter(backend: MemoryStorage) -> StorageAdapter {
        StorageAdapter::with_backend(Vendor::Chrome, Box::new(backend))
    }

    fn sample_sheets() -> Vec<Sheet> {
        let at = Utc.with_ymd_and_hms(2024, 5, 2, 9, 30, 0).unwrap();
        let mut groceries = Sheet::new(SheetId(1), "Groceries", "<p>milk</p>", at);
        groceries.tags.push("Home".to_string());
        vec![groceries, Sheet::new(SheetId(2), "Ideas", "", at)]
    }

    #[test]
    fn missing_record_loads_as_empty_list() {
        let storage = adapter(MemoryStorage::new());
        let sheets: Vec<Sheet> = block_on(storage.load("sheets")).unwrap();
        assert!(sheets.is_empty());
        let tags: Vec<Tag> = block_on(storage.load("allTags")).unwrap();
        assert!(tags.is_empty());
    }

    #[test]
    fn null_record_loads_as_empty_list() {
        let backend = MemoryStorage::new();
        backend.insert("sheets", Value::Null);
        let sheets: Vec<Sheet> = block_on(adapter(backend).load("sheets")).unwrap();
        assert!(sheets.is_empty());
    }

    #[test]
    fn saved_records_load_back_equal() {
        let storage = adapter(MemoryStorage::new());
        let sheets = sample_sheets();
        block_on(storage.save("sheets", &sheets)).unwrap();
        let loaded: Vec<Sheet> = block_on(storage.load("sheets")).unwrap();
        assert_eq!(loaded, sheets);

        let tags = vec![Tag::new("Urgent", "#ff0000"), Tag::new("Home", "#00ff00")];
        block_on(storage.save("allTags", &tags)).unwrap();
        let loaded: Vec<Tag> = block_on(storage.load("allTags")).unwrap();
        assert_eq!(loaded, tags);
    }

    #[test]
    fn saving_twice_overwrites_instead_of_appending() {
        let backend = MemoryStorage::new();
        let probe = backend.clone();
        let storage = adapter(backend);
        let tags = vec![Tag::new("Urgent", "#ff0000")];

        block_on(storage.save("allTags", &tags)).unwrap();
        block_on(storage.save("allTags", &tags)).unwrap();

        let loaded: Vec<Tag> = block_on(storage.load("allTags")).unwrap();
        assert_eq!(loaded, tags);
        assert_eq!(probe.get("allTags"), Some(json!([{ "name": "Urgent", "color": "#ff0000" }])));
        assert_eq!(probe.save_count("allTags"), 2);
    }

    #[test]
    fn backend_failures_surface_as_errors() {
        let backend = MemoryStorage::new();
        backend.fail_key("sheets", "QUOTA_BYTES quota exceeded");
        let storage = adapter(backend);

        let err = block_on(storage.save("sheets", &sample_sheets())).unwrap_err();
        assert!(matches!(err, StorageError::Backend(ref m) if m.contains("quota")));
        assert!(block_on(storage.load::<Sheet>("sheets")).is_err());
    }

    #[test]
    fn malformed_record_is_a_decode_error() {
        let backend = MemoryStorage::new();
        backend.insert("allTags", json!({ "not": "a list" }));
        let err = block_on(adapter(backend).load::<Tag>("allTags")).unwrap_err();
        assert!(matches!(err, StorageError::Decode { ref key, .. } if key == "allTags"));
    }

    #[test]
    fn unreadable_stored_text_is_a_decode_error() {
        let err = decode_record("sheets", "[{\"id\": 1,").unwrap_err();
        assert!(matches!(err, StorageError::Decode { ref key, .. } if key == "sheets"));
        assert_eq!(decode_record("allTags", "[]").unwrap(), json!([]));
    }

    #[test]
    fn factory_builds_the_requested_backend() {
        assert_eq!(
            backend_for(StorageFlavor::Promise).flavor(),
            StorageFlavor::Promise
        );
        assert_eq!(
            backend_for(StorageFlavor::Callback).flavor(),
            StorageFlavor::Callback
        );
    }

    #[test]
    fn vendor_selects_backend_flavor() {
        assert_eq!(
            StorageAdapter::for_vendor(Vendor::Firefox).flavor(),
            StorageFlavor::Promise
        );
        assert_eq!(
            StorageAdapter::for_vendor(Vendor::Chrome).flavor(),
            StorageFlavor::Callback
        );
        assert_eq!(
            StorageAdapter::for_vendor(Vendor::Unknown).flavor(),
            StorageFlavor::Callback
        );
    }
}
