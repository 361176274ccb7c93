use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;
use spin_sdk::key_value::Store;

/// Persistence seam. Handlers receive `&dyn Datastore` instead of opening
/// a process-wide store, so the same code runs against Spin's key-value
/// store in the deployed component and against `MemoryStore` in the native
/// dev server and the test suite.
pub trait Datastore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>>;
    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()>;
    fn delete(&self, key: &str) -> anyhow::Result<()>;
}

/// JSON convenience layer over [`Datastore`].
pub trait DatastoreExt {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>>;
    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()>;
}

impl<S: Datastore + ?Sized> DatastoreExt for S {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set(key, &serde_json::to_vec(value)?)
    }
}

/// Spin's default key-value store.
pub struct SpinStore {
    inner: Store,
}

impl SpinStore {
    pub fn open_default() -> anyhow::Result<Self> {
        let inner = Store::open_default()
            .map_err(|e| anyhow::anyhow!("failed to open key-value store: {:?}", e))?;
        Ok(Self { inner })
    }
}

impl Datastore for SpinStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        self.inner
            .get(key)
            .map_err(|e| anyhow::anyhow!("kv get {}: {:?}", key, e))
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        self.inner
            .set(key, value)
            .map_err(|e| anyhow::anyhow!("kv set {}: {:?}", key, e))
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.inner
            .delete(key)
            .map_err(|e| anyhow::anyhow!("kv delete {}: {:?}", key, e))
    }
}

/// In-memory store backing the native dev server and tests.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Datastore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let entries = self.entries.lock().expect("store mutex poisoned");
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut entries = self.entries.lock().expect("store mutex poisoned");
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips_json() {
        let store = MemoryStore::new();
        let as_dyn: &dyn Datastore = &store;

        as_dyn.set_json("answer", &vec![1, 2, 3]).unwrap();
        let back: Option<Vec<i32>> = as_dyn.get_json("answer").unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));

        as_dyn.delete("answer").unwrap();
        let gone: Option<Vec<i32>> = as_dyn.get_json("answer").unwrap();
        assert!(gone.is_none());
    }

    #[test]
    fn missing_key_is_none() {
        let store = MemoryStore::new();
        let as_dyn: &dyn Datastore = &store;
        let value: Option<String> = as_dyn.get_json("nope").unwrap();
        assert!(value.is_none());
    }
}
