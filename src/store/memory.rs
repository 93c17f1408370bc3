//! Embedded in-memory store
//!
//! A keyspace of hashes and sets behind a single `RwLock`. Each trait call
//! takes the lock exactly once, so every call is atomic on its own while a
//! sequence of calls can interleave with other writers, same as a real
//! Redis server.

use super::SummaryStore;
use crate::error::{Result, SummaryError};
use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;

const WRONGTYPE: &str = "WRONGTYPE Operation against a key holding the wrong kind of value";

#[derive(Debug)]
enum Value {
    Hash(AHashMap<String, String>),
    Set(AHashSet<String>),
}

/// Thread-safe embedded store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: RwLock<AHashMap<String, Value>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys in the keyspace
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Number of members in the set at `key`
    pub fn scard(&self, key: &str) -> Result<usize> {
        match self.data.read().get(key) {
            Some(Value::Set(s)) => Ok(s.len()),
            Some(Value::Hash(_)) => Err(SummaryError::Store(WRONGTYPE.to_string())),
            None => Ok(0),
        }
    }

    /// Apply `f` to the hash at `key`, creating it if absent
    fn with_hash<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut AHashMap<String, String>) -> Result<R>,
    ) -> Result<R> {
        let mut data = self.data.write();
        let value = data
            .entry(key.to_string())
            .or_insert_with(|| Value::Hash(AHashMap::new()));
        match value {
            Value::Hash(h) => f(h),
            Value::Set(_) => Err(SummaryError::Store(WRONGTYPE.to_string())),
        }
    }
}

impl SummaryStore for InMemoryStore {
    fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        match self.data.read().get(key) {
            Some(Value::Set(s)) => Ok(s.contains(member)),
            Some(Value::Hash(_)) => Err(SummaryError::Store(WRONGTYPE.to_string())),
            None => Ok(false),
        }
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        let mut data = self.data.write();
        let value = data
            .entry(key.to_string())
            .or_insert_with(|| Value::Set(AHashSet::new()));
        match value {
            Value::Set(s) => Ok(s.insert(member.to_string())),
            Value::Hash(_) => Err(SummaryError::Store(WRONGTYPE.to_string())),
        }
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        match self.data.read().get(key) {
            Some(Value::Hash(h)) => Ok(h.get(field).cloned()),
            Some(Value::Set(_)) => Err(SummaryError::Store(WRONGTYPE.to_string())),
            None => Ok(None),
        }
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        self.with_hash(key, |h| {
            Ok(h.insert(field.to_string(), value.to_string()).is_none())
        })
    }

    fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        self.with_hash(key, |h| {
            let current: i64 = match h.get(field) {
                Some(v) => v
                    .parse()
                    .map_err(|_| SummaryError::Store("ERR hash value is not an integer".into()))?,
                None => 0,
            };
            let new_value = current.checked_add(delta).ok_or_else(|| {
                SummaryError::Store("ERR increment or decrement would overflow".into())
            })?;
            h.insert(field.to_string(), new_value.to_string());
            Ok(new_value)
        })
    }

    fn hincrbyfloat(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        self.with_hash(key, |h| {
            let current: f64 = match h.get(field) {
                Some(v) => v
                    .parse()
                    .map_err(|_| SummaryError::Store("ERR hash value is not a float".into()))?,
                None => 0.0,
            };
            let new_value = current + delta;
            if !new_value.is_finite() {
                return Err(SummaryError::Store(
                    "ERR increment would produce NaN or Infinity".into(),
                ));
            }
            h.insert(field.to_string(), new_value.to_string());
            Ok(new_value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_membership() {
        let store = InMemoryStore::new();
        assert!(!store.sismember("s", "1").unwrap());
        assert!(store.sadd("s", "1").unwrap());
        assert!(!store.sadd("s", "1").unwrap());
        assert!(store.sismember("s", "1").unwrap());
        assert_eq!(store.scard("s").unwrap(), 1);
    }

    #[test]
    fn test_hset_hget() {
        let store = InMemoryStore::new();
        assert_eq!(store.hget("h", "min").unwrap(), None);
        assert!(store.hset("h", "min", "1.5").unwrap());
        assert!(!store.hset("h", "min", "0.5").unwrap());
        assert_eq!(store.hget("h", "min").unwrap(), Some("0.5".to_string()));
    }

    #[test]
    fn test_hincrby_creates_and_increments() {
        let store = InMemoryStore::new();
        assert_eq!(store.hincrby("h", "counter", 1).unwrap(), 1);
        assert_eq!(store.hincrby("h", "counter", 4).unwrap(), 5);
        assert_eq!(store.hget("h", "counter").unwrap(), Some("5".to_string()));
    }

    #[test]
    fn test_hincrby_overflow() {
        let store = InMemoryStore::new();
        store.hset("h", "counter", &i64::MAX.to_string()).unwrap();
        assert!(matches!(
            store.hincrby("h", "counter", 1),
            Err(SummaryError::Store(_))
        ));
    }

    #[test]
    fn test_hincrbyfloat() {
        let store = InMemoryStore::new();
        store.hset("h", "sum", "10").unwrap();
        let v = store.hincrbyfloat("h", "sum", 2.5).unwrap();
        assert!((v - 12.5).abs() < 1e-9);
        let stored: f64 = store.hget("h", "sum").unwrap().unwrap().parse().unwrap();
        assert!((stored - 12.5).abs() < 1e-9);
    }

    #[test]
    fn test_hincrbyfloat_non_numeric() {
        let store = InMemoryStore::new();
        store.hset("h", "sum", "abc").unwrap();
        assert!(store.hincrbyfloat("h", "sum", 1.0).is_err());
    }

    #[test]
    fn test_wrong_type() {
        let store = InMemoryStore::new();
        store.sadd("k", "1").unwrap();
        assert!(store.hget("k", "f").is_err());
        assert!(store.hset("k", "f", "v").is_err());

        store.hset("h", "f", "v").unwrap();
        assert!(store.sismember("h", "1").is_err());
        assert!(store.sadd("h", "1").is_err());
    }
}
