use async_trait::async_trait;
use serde_json::Value;
use wasm_bindgen::prelude::*;

use crate::config::StorageFlavor;

use super::{items_object, js_error_message, record_from_items, LoadSave, StorageError};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["browser", "storage", "local"], js_name = get)]
    async fn local_get(keys: &str) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["browser", "storage", "local"], js_name = set)]
    async fn local_set(items: &JsValue) -> Result<JsValue, JsValue>;
}

/// `browser.storage.local`, whose calls return promises.
#[derive(Clone, Copy, Debug, Default)]
pub struct FirefoxStorage;

#[async_trait(?Send)]
impl LoadSave for FirefoxStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let items = local_get(key)
            .await
            .map_err(|e| StorageError::Backend(js_error_message(&e)))?;
        record_from_items(&items, key)
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let items = items_object(key, &value)?;
        local_set(&items)
            .await
            .map_err(|e| StorageError::Backend(js_error_message(&e)))?;
        Ok(())
    }

    fn flavor(&self) -> StorageFlavor {
        StorageFlavor::Promise
    }
}
