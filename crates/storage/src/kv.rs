//! Key-value store for engine records
//!
//! This module provides a type-safe key-value store using sled. Values are
//! stored as JSON under scoped keys such as `item:{id}`.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sled::Db;
use std::sync::Arc;
use thiserror::Error;

/// Key-value store error types
#[derive(Debug, Error)]
pub enum KvError {
    /// Sled database error
    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid key
    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// Result type for key-value operations
pub type Result<T> = std::result::Result<T, KvError>;

/// Key-value store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KvConfig {
    /// Database path
    pub path: String,
    /// Cache capacity in bytes
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
    /// Enable compression
    #[serde(default = "default_true")]
    pub use_compression: bool,
    /// Background flush interval in milliseconds (None flushes only on request)
    #[serde(default = "default_flush_every_ms")]
    pub flush_every_ms: Option<u64>,
}

fn default_cache_capacity() -> u64 {
    64 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_flush_every_ms() -> Option<u64> {
    Some(500)
}

impl Default for KvConfig {
    fn default() -> Self {
        Self {
            path: "trust_safety.db".to_string(),
            cache_capacity: default_cache_capacity(),
            use_compression: true,
            flush_every_ms: default_flush_every_ms(),
        }
    }
}

impl KvConfig {
    /// Create a new configuration with a custom path
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), ..Default::default() }
    }

    /// Set cache capacity in bytes
    pub fn cache_capacity(mut self, bytes: u64) -> Self {
        self.cache_capacity = bytes;
        self
    }

    /// Enable or disable compression
    pub fn use_compression(mut self, enabled: bool) -> Self {
        self.use_compression = enabled;
        self
    }

    /// Set flush interval in milliseconds
    pub fn flush_every_ms(mut self, ms: Option<u64>) -> Self {
        self.flush_every_ms = ms;
        self
    }
}

/// Key-value store implementation
pub struct KvStore {
    db: Arc<Db>,
    separator: &'static str,
}

impl KvStore {
    /// Create a new key-value store with configuration
    pub fn new(config: &KvConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .use_compression(config.use_compression)
            .flush_every_ms(config.flush_every_ms)
            .open()?;
        tracing::info!(path = %config.path, "key-value store opened");

        Ok(Self { db: Arc::new(db), separator: ":" })
    }

    /// Create an in-memory key-value store (for testing)
    pub fn in_memory() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;

        Ok(Self { db: Arc::new(db), separator: ":" })
    }

    /// Join scopes into a key, refusing empty segments
    pub fn scoped_key(&self, scopes: &[&str]) -> Result<String> {
        if scopes.is_empty() || scopes.iter().any(|s| s.is_empty()) {
            return Err(KvError::InvalidKey(scopes.join(self.separator)));
        }
        Ok(scopes.join(self.separator))
    }

    /// Get a value by key
    pub fn get<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        match self.db.get(key.as_bytes())? {
            Some(bytes) => {
                let value: T = serde_json::from_slice(&bytes)?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Get a value by scoped key (e.g., ["item", "abc"])
    pub fn get_scoped<T>(&self, scopes: &[&str]) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let key = self.scoped_key(scopes)?;
        self.get(&key)
    }

    /// Set a value by key
    pub fn set<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let bytes = serde_json::to_vec(value)?;
        self.db.insert(key.as_bytes(), bytes)?;
        Ok(())
    }

    /// Set a value by scoped key
    pub fn set_scoped<T>(&self, scopes: &[&str], value: &T) -> Result<()>
    where
        T: Serialize,
    {
        let key = self.scoped_key(scopes)?;
        self.set(&key, value)
    }

    /// Remove a value by key
    pub fn remove(&self, key: &str) -> Result<bool> {
        Ok(self.db.remove(key.as_bytes())?.is_some())
    }

    /// Remove a value by scoped key
    pub fn remove_scoped(&self, scopes: &[&str]) -> Result<bool> {
        let key = self.scoped_key(scopes)?;
        self.remove(&key)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> Result<bool> {
        Ok(self.db.contains_key(key.as_bytes())?)
    }

    /// Decode every value whose key starts with `prefix`, in key order
    pub fn values_with_prefix<T>(&self, prefix: &str) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let mut values = Vec::new();
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            let (_, value) = item?;
            values.push(serde_json::from_slice(&value)?);
        }
        Ok(values)
    }

    /// Count keys starting with `prefix`
    pub fn count_with_prefix(&self, prefix: &str) -> Result<usize> {
        let mut count = 0;
        for item in self.db.scan_prefix(prefix.as_bytes()) {
            item?;
            count += 1;
        }
        Ok(count)
    }

    /// Next value of a monotonic id that survives restarts
    pub fn generate_id(&self) -> Result<u64> {
        Ok(self.db.generate_id()?)
    }

    /// Flush pending writes to disk
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }

    /// Get the number of keys in the store
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if the store is empty
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct TestData {
        name: String,
        count: i32,
    }

    #[test]
    fn test_kv_store_creation() {
        let kv = KvStore::in_memory().unwrap();
        assert!(kv.is_empty());
    }

    #[test]
    fn test_set_and_get_struct() {
        let kv = KvStore::in_memory().unwrap();
        let data = TestData { name: "test".to_string(), count: 42 };

        kv.set_scoped(&["item", "a"], &data).unwrap();
        let retrieved: Option<TestData> = kv.get_scoped(&["item", "a"]).unwrap();
        assert_eq!(retrieved, Some(data));
        assert!(kv.contains("item:a").unwrap());
    }

    #[test]
    fn test_get_nonexistent() {
        let kv = KvStore::in_memory().unwrap();
        let value: Option<String> = kv.get("missing").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn test_remove() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("key", &"value".to_string()).unwrap();
        assert!(kv.remove_scoped(&["key"]).unwrap());
        assert!(!kv.remove("key").unwrap());
    }

    #[test]
    fn test_scoped_key_rejects_empty_segments() {
        let kv = KvStore::in_memory().unwrap();
        assert!(matches!(kv.scoped_key(&["item", ""]), Err(KvError::InvalidKey(_))));
        assert!(matches!(kv.scoped_key(&[]), Err(KvError::InvalidKey(_))));
        assert_eq!(kv.scoped_key(&["a", "b"]).unwrap(), "a:b");
    }

    #[test]
    fn test_values_with_prefix_in_key_order() {
        let kv = KvStore::in_memory().unwrap();
        kv.set("event:x:002", &2).unwrap();
        kv.set("event:x:001", &1).unwrap();
        kv.set("event:y:001", &10).unwrap();

        let values: Vec<i32> = kv.values_with_prefix("event:x:").unwrap();
        assert_eq!(values, vec![1, 2]);
        assert_eq!(kv.count_with_prefix("event:").unwrap(), 3);
    }

    #[test]
    fn test_generate_id_is_increasing() {
        let kv = KvStore::in_memory().unwrap();
        let first = kv.generate_id().unwrap();
        let second = kv.generate_id().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = TempDir::new().unwrap();
        let config = KvConfig::new(dir.path().join("kv.db").to_string_lossy().to_string())
            .flush_every_ms(None);

        {
            let kv = KvStore::new(&config).unwrap();
            kv.set("key", &"value".to_string()).unwrap();
            kv.flush().unwrap();
        }

        let kv = KvStore::new(&config).unwrap();
        let value: Option<String> = kv.get("key").unwrap();
        assert_eq!(value, Some("value".to_string()));
    }

    #[test]
    fn test_config_builder_and_serde() {
        let config = KvConfig::new("/tmp/test.db")
            .cache_capacity(1024)
            .use_compression(false)
            .flush_every_ms(None);
        assert_eq!(config.path, "/tmp/test.db");
        assert_eq!(config.cache_capacity, 1024);
        assert!(!config.use_compression);

        let parsed: KvConfig = serde_json::from_str(r#"{"path": "data.db"}"#).unwrap();
        assert_eq!(parsed.cache_capacity, 64 * 1024 * 1024);
        assert!(parsed.use_compression);
        assert_eq!(parsed.flush_every_ms, Some(500));
    }
}
