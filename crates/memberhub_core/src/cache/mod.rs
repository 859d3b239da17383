//! Cache port and adapters.
//!
//! # Responsibility
//! - Define the key/value contract the repository projects entities into.
//! - Provide typed JSON helpers on top of the string contract.
//!
//! # Invariants
//! - The cache is a disposable projection; no caller treats it as the system
//!   of record.
//! - Implementations are thread-safe (`Send + Sync`).

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

pub mod key;
mod memory;

pub use key::CacheKeys;
pub use memory::{MemoryCache, NoopCache};

pub type CacheResult<T> = Result<T, CacheError>;

#[derive(Debug)]
pub enum CacheError {
    /// Backend unreachable or internally broken.
    Unavailable(String),
    /// Cached value could not be (de)serialized.
    Codec(serde_json::Error),
    /// `get_int` found a non-integer value.
    NotInteger(String),
}

impl Display for CacheError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "cache unavailable: {message}"),
            Self::Codec(err) => write!(f, "cache value codec error: {err}"),
            Self::NotInteger(key) => write!(f, "cache value at `{key}` is not an integer"),
        }
    }
}

impl Error for CacheError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Codec(err) => Some(err),
            Self::Unavailable(_) => None,
            Self::NotInteger(_) => None,
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(value: serde_json::Error) -> Self {
        Self::Codec(value)
    }
}

/// Key/value cache contract.
pub trait Cache: Send + Sync {
    fn get(&self, key: &str) -> CacheResult<Option<String>>;

    /// Stores `value`, replacing any previous value; `ttl = None` never expires.
    fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> CacheResult<()>;

    fn del(&self, key: &str) -> CacheResult<()>;

    /// Removes every key starting with `prefix`, returning the removed count.
    fn delete_prefix(&self, prefix: &str) -> CacheResult<u64>;

    fn get_int(&self, key: &str) -> CacheResult<Option<i64>> {
        match self.get(key)? {
            Some(raw) => raw
                .trim()
                .parse::<i64>()
                .map(Some)
                .map_err(|_| CacheError::NotInteger(key.to_string())),
            None => Ok(None),
        }
    }

    fn set_expire(&self, key: &str, value: &str, ttl_secs: u64) -> CacheResult<()> {
        self.set(key, value, Some(Duration::from_secs(ttl_secs)))
    }
}

/// Reads and decodes a JSON value.
pub fn get_typed<T: DeserializeOwned>(cache: &dyn Cache, key: &str) -> CacheResult<Option<T>> {
    match cache.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Encodes a value as JSON and stores it.
pub fn set_typed<T: Serialize>(
    cache: &dyn Cache,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> CacheResult<()> {
    let raw = serde_json::to_string(value)?;
    cache.set(key, &raw, ttl)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        id: i64,
        name: String,
    }

    #[test]
    fn typed_roundtrip_through_memory_cache() {
        let cache = MemoryCache::new();
        let value = Sample {
            id: 9,
            name: "nine".to_string(),
        };
        set_typed(&cache, "k", &value, None).unwrap();
        let loaded: Option<Sample> = get_typed(&cache, "k").unwrap();
        assert_eq!(loaded, Some(value));
    }

    #[test]
    fn typed_get_reports_codec_errors() {
        let cache = MemoryCache::new();
        cache.set("k", "{not json", None).unwrap();
        let err = get_typed::<Sample>(&cache, "k").unwrap_err();
        assert!(matches!(err, CacheError::Codec(_)));
    }

    #[test]
    fn get_int_parses_and_rejects() {
        let cache = MemoryCache::new();
        cache.set("n", "42", None).unwrap();
        cache.set("s", "abc", None).unwrap();
        assert_eq!(cache.get_int("n").unwrap(), Some(42));
        assert_eq!(cache.get_int("missing").unwrap(), None);
        assert!(matches!(
            cache.get_int("s"),
            Err(CacheError::NotInteger(_))
        ));
    }
}
