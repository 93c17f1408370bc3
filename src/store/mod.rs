//! Store client abstraction
//!
//! The aggregation engine only needs five primitives from the backing store:
//! set membership, set add, hash field read, hash field write and atomic
//! hash field increments (integer and float). Every call is blocking and
//! individually atomic; nothing here groups several calls into a transaction.
//!
//! Two implementations are provided:
//! - [`InMemoryStore`]: embedded keyspace for tests and single-process use
//! - [`RedisStore`]: pooled client for a Redis-protocol server

mod memory;
mod remote;
mod resp;

pub use memory::InMemoryStore;
pub use remote::{RedisStore, RedisStoreConfig};
pub use resp::{RespParser, RespValue};

use crate::error::Result;
use std::sync::Arc;

/// Capabilities the aggregation engine requires from the shared store
pub trait SummaryStore: Send + Sync {
    /// SISMEMBER: is `member` in the set at `key`
    fn sismember(&self, key: &str, member: &str) -> Result<bool>;

    /// SADD: add `member` to the set at `key`, true if newly added
    fn sadd(&self, key: &str, member: &str) -> Result<bool>;

    /// HGET: read one field of the hash at `key`
    fn hget(&self, key: &str, field: &str) -> Result<Option<String>>;

    /// HSET: overwrite one field of the hash at `key`, true if the field is new
    fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool>;

    /// HINCRBY: atomically add `delta` to an integer field, returning the new value
    fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64>;

    /// HINCRBYFLOAT: atomically add `delta` to a float field, returning the new value
    fn hincrbyfloat(&self, key: &str, field: &str, delta: f64) -> Result<f64>;
}

impl<S: SummaryStore + ?Sized> SummaryStore for Arc<S> {
    fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        (**self).sismember(key, member)
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        (**self).sadd(key, member)
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        (**self).hget(key, field)
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        (**self).hset(key, field, value)
    }

    fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        (**self).hincrby(key, field, delta)
    }

    fn hincrbyfloat(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        (**self).hincrbyfloat(key, field, delta)
    }
}

impl<S: SummaryStore + ?Sized> SummaryStore for Box<S> {
    fn sismember(&self, key: &str, member: &str) -> Result<bool> {
        (**self).sismember(key, member)
    }

    fn sadd(&self, key: &str, member: &str) -> Result<bool> {
        (**self).sadd(key, member)
    }

    fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        (**self).hget(key, field)
    }

    fn hset(&self, key: &str, field: &str, value: &str) -> Result<bool> {
        (**self).hset(key, field, value)
    }

    fn hincrby(&self, key: &str, field: &str, delta: i64) -> Result<i64> {
        (**self).hincrby(key, field, delta)
    }

    fn hincrbyfloat(&self, key: &str, field: &str, delta: f64) -> Result<f64> {
        (**self).hincrbyfloat(key, field, delta)
    }
}
