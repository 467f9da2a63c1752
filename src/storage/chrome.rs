use async_trait::async_trait;
use js_sys::{Function, Promise, Reflect};
use serde_json::Value;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::config::StorageFlavor;

use super::{items_object, js_error_message, record_from_items, LoadSave, StorageError};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = get)]
    fn local_get(keys: &str, callback: &JsValue) -> Result<JsValue, JsValue>;

    #[wasm_bindgen(catch, js_namespace = ["chrome", "storage", "local"], js_name = set)]
    fn local_set(items: &JsValue, callback: &JsValue) -> Result<JsValue, JsValue>;
}

/// `chrome.storage.local`. Results arrive through callbacks and errors through
/// `chrome.runtime.lastError`, which is only meaningful inside the callback.
#[derive(Clone, Copy, Debug, Default)]
pub struct ChromeStorage;

fn last_error() -> Option<JsValue> {
    let chrome = Reflect::get(&js_sys::global(), &JsValue::from_str("chrome")).ok()?;
    let runtime = Reflect::get(&chrome, &JsValue::from_str("runtime")).ok()?;
    if runtime.is_undefined() || runtime.is_null() {
        return None;
    }
    let error = Reflect::get(&runtime, &JsValue::from_str("lastError")).ok()?;
    if error.is_undefined() || error.is_null() {
        None
    } else {
        Some(error)
    }
}

/// Runs `call` with a one-shot callback and settles the returned future from it.
async fn with_callback<F>(call: F) -> Result<JsValue, StorageError>
where
    F: FnOnce(&JsValue) -> Result<JsValue, JsValue>,
{
    let mut call = Some(call);
    let mut sync_error = None;
    let promise = Promise::new(&mut |resolve: Function, reject: Function| {
        let callback = Closure::once_into_js(move |result: JsValue| {
            let _ = match last_error() {
                Some(error) => reject.call1(&JsValue::NULL, &error),
                None => resolve.call1(&JsValue::NULL, &result),
            };
        });
        if let Some(call) = call.take() {
            if let Err(error) = call(&callback) {
                sync_error = Some(error);
            }
        }
    });
    // A throw (e.g. `chrome` missing) means the callback will never run.
    if let Some(error) = sync_error {
        return Err(StorageError::Backend(js_error_message(&error)));
    }
    JsFuture::from(promise)
        .await
        .map_err(|e| StorageError::Backend(js_error_message(&e)))
}

#[async_trait(?Send)]
impl LoadSave for ChromeStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        let items = with_callback(|callback| local_get(key, callback)).await?;
        record_from_items(&items, key)
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let items = items_object(key, &value)?;
        with_callback(|callback| local_set(&items, callback)).await?;
        Ok(())
    }

    fn flavor(&self) -> StorageFlavor {
        StorageFlavor::Callback
    }
}
