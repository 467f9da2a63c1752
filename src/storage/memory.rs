use async_trait::async_trait;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use super::{LoadSave, StorageError};
use crate::config::StorageFlavor;

#[derive(Default)]
struct Inner {
    records: HashMap<String, Value>,
    failures: HashMap<String, String>,
    saves: HashMap<String, usize>,
}

/// In-memory stand-in for an extension storage area. Clones share state, so a
/// test can keep a handle to inspect what the code under test wrote.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Rc<RefCell<Inner>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, key: &str, value: Value) {
        self.inner
            .borrow_mut()
            .records
            .insert(key.to_string(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.borrow().records.get(key).cloned()
    }

    /// Every later load or save of `key` fails with `message`.
    pub fn fail_key(&self, key: &str, message: &str) {
        self.inner
            .borrow_mut()
            .failures
            .insert(key.to_string(), message.to_string());
    }

    pub fn heal_key(&self, key: &str) {
        self.inner.borrow_mut().failures.remove(key);
    }

    pub fn save_count(&self, key: &str) -> usize {
        self.inner.borrow().saves.get(key).copied().unwrap_or(0)
    }

    fn check(&self, key: &str) -> Result<(), StorageError> {
        match self.inner.borrow().failures.get(key) {
            Some(message) => Err(StorageError::Backend(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait(?Send)]
impl LoadSave for MemoryStorage {
    async fn load(&self, key: &str) -> Result<Option<Value>, StorageError> {
        self.check(key)?;
        Ok(self.get(key))
    }

    async fn save(&self, key: &str, value: Value) -> Result<(), StorageError> {
        self.check(key)?;
        let mut inner = self.inner.borrow_mut();
        inner.records.insert(key.to_string(), value);
        *inner.saves.entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    // Same contract as the callback area the tests pair it with.
    fn flavor(&self) -> StorageFlavor {
        StorageFlavor::Callback
    }
}
