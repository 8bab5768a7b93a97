//! Host capabilities injected into component code
//!
//! The engine does not implement storage, network, scheduling or messaging.
//! The host supplies implementations of these traits; the engine only hands
//! them to each component invocation and drops them when the render ends.

use crate::{Value, ValueMap};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Failure reported by a host capability
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    #[error("{0} capability is not available on this host")]
    Unavailable(&'static str),

    #[error("{capability} failed: {message}")]
    Failed {
        capability: &'static str,
        message: String,
    },
}

/// Result type for capability calls
pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;

/// Persistent key-value storage
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> CapabilityResult<Option<Value>>;
    fn set(&self, key: &str, value: Value) -> CapabilityResult<()>;
    fn delete(&self, key: &str) -> CapabilityResult<()>;
}

/// Outbound HTTP fetch
pub trait Fetch: Send + Sync {
    fn fetch(&self, request: &FetchRequest) -> CapabilityResult<FetchResponse>;
}

/// Scheduler for future one-shot and cron jobs
pub trait Scheduler: Send + Sync {
    /// Run `job` once at `at_ms`; returns the job id
    fn run_at(&self, job: &str, at_ms: i64, data: Value) -> CapabilityResult<String>;
    /// Run `job` on a cron schedule; returns the job id
    fn run_cron(&self, job: &str, cron: &str, data: Value) -> CapabilityResult<String>;
    fn cancel(&self, job_id: &str) -> CapabilityResult<()>;
}

/// Messaging / notification delivery
pub trait Messaging: Send + Sync {
    fn send(&self, recipient: &str, subject: &str, body: &str) -> CapabilityResult<()>;
}

/// An outbound request for [`Fetch`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub url: String,
    pub method: String,
    #[serde(default)]
    pub headers: ValueMap,
    #[serde(default)]
    pub body: Option<String>,
}

impl FetchRequest {
    /// Create a GET request
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: ValueMap::new(),
            body: None,
        }
    }
}

/// Response returned by [`Fetch`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResponse {
    pub status: u16,
    pub body: String,
}

/// In-memory [`KeyValueStore`]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<IndexMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> CapabilityError {
        CapabilityError::Failed {
            capability: "storage",
            message: "lock poisoned".to_string(),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> CapabilityResult<Option<Value>> {
        let entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> CapabilityResult<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> CapabilityResult<()> {
        let mut entries = self.entries.lock().map_err(|_| Self::poisoned())?;
        entries.shift_remove(key);
        Ok(())
    }
}

/// Placeholder used when the host provides no network access
#[derive(Debug, Default, Clone, Copy)]
pub struct NoFetch;

impl Fetch for NoFetch {
    fn fetch(&self, _request: &FetchRequest) -> CapabilityResult<FetchResponse> {
        Err(CapabilityError::Unavailable("fetch"))
    }
}

/// Placeholder used when the host provides no scheduler
#[derive(Debug, Default, Clone, Copy)]
pub struct NoScheduler;

impl Scheduler for NoScheduler {
    fn run_at(&self, _job: &str, _at_ms: i64, _data: Value) -> CapabilityResult<String> {
        Err(CapabilityError::Unavailable("scheduler"))
    }

    fn run_cron(&self, _job: &str, _cron: &str, _data: Value) -> CapabilityResult<String> {
        Err(CapabilityError::Unavailable("scheduler"))
    }

    fn cancel(&self, _job_id: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unavailable("scheduler"))
    }
}

/// Placeholder used when the host provides no messaging
#[derive(Debug, Default, Clone, Copy)]
pub struct NoMessaging;

impl Messaging for NoMessaging {
    fn send(&self, _recipient: &str, _subject: &str, _body: &str) -> CapabilityResult<()> {
        Err(CapabilityError::Unavailable("messaging"))
    }
}

/// The bundle of capabilities available inside a component invocation
#[derive(Clone)]
pub struct Capabilities {
    pub storage: Arc<dyn KeyValueStore>,
    pub fetch: Arc<dyn Fetch>,
    pub scheduler: Arc<dyn Scheduler>,
    pub messaging: Arc<dyn Messaging>,
}

impl Capabilities {
    /// In-memory storage and no network, scheduler or messaging
    pub fn new() -> Self {
        Self {
            storage: Arc::new(MemoryStore::new()),
            fetch: Arc::new(NoFetch),
            scheduler: Arc::new(NoScheduler),
            messaging: Arc::new(NoMessaging),
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_fetch(mut self, fetch: Arc<dyn Fetch>) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_messaging(mut self, messaging: Arc<dyn Messaging>) -> Self {
        self.messaging = messaging;
        self
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.get("score").unwrap(), None);

        store.set("score", Value::Int(3)).unwrap();
        assert_eq!(store.get("score").unwrap(), Some(Value::Int(3)));

        store.delete("score").unwrap();
        assert_eq!(store.get("score").unwrap(), None);
    }

    #[test]
    fn test_default_bundle_has_no_network() {
        let caps = Capabilities::default();
        let err = caps.fetch.fetch(&FetchRequest::get("https://example.com")).unwrap_err();
        assert_eq!(err, CapabilityError::Unavailable("fetch"));
        assert!(caps.messaging.send("u/someone", "hi", "body").is_err());
        assert!(caps.scheduler.run_cron("digest", "0 * * * *", Value::Null).is_err());
    }
}
