//! Cross-call bookkeeping shared by every call of one client.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug, Default)]
pub struct StateBag {
    values: RwLock<HashMap<String, Value>>,
}

impl StateBag {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        self.values.read().unwrap_or_else(|p| p.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.values.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.read().get(key).cloned()
    }

    /// Typed read; `None` when missing or of another shape.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn set(&self, key: impl Into<String>, value: impl Serialize) -> crate::Result<()> {
        let value = serde_json::to_value(value)?;
        self.write().insert(key.into(), value);
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.write().remove(key)
    }

    /// Read-modify-write under one lock.
    pub fn update<F>(&self, key: &str, f: F)
    where
        F: FnOnce(Option<Value>) -> Option<Value>,
    {
        let mut values = self.write();
        let current = values.remove(key);
        if let Some(next) = f(current) {
            values.insert(key.to_string(), next);
        }
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_typed() {
        let bag = StateBag::new();
        bag.set("isRefreshingToken", false).unwrap();
        assert_eq!(bag.get_as::<bool>("isRefreshingToken"), Some(false));
        assert_eq!(bag.get_as::<u32>("isRefreshingToken"), None);
    }

    #[test]
    fn test_update_counter() {
        let bag = StateBag::new();
        for _ in 0..3 {
            bag.update("hits", |v| {
                let n = v.and_then(|v| v.as_u64()).unwrap_or(0);
                Some(json!(n + 1))
            });
        }
        assert_eq!(bag.get("hits"), Some(json!(3)));
        bag.update("hits", |_| None);
        assert!(bag.keys().is_empty());
    }
}
