//! Transient key-value storage for OAuth state and freshly issued credentials.
//!
//! The flow controller only needs `set` with a TTL, `get` and `delete`, so the
//! backend is an injected [`KeyValueStore`]. [`InMemoryStore`] is the default
//! backend used by the binary and the tests.
//!
//! Keys are templated as `{kind}:{org_id}:{user_id}`, one entry per principal.

mod memory;

pub use memory::{run_expiry_sweeper, InMemoryStore};

use anyhow::Result;
use async_trait::async_trait;

/// TTL-keyed string store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value. The entry
    /// disappears after `ttl_seconds`.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Returns `None` for missing or expired keys.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// What a store entry holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyKind {
    State,
    Credentials,
}

impl KeyKind {
    fn as_str(self) -> &'static str {
        match self {
            KeyKind::State => "state",
            KeyKind::Credentials => "credentials",
        }
    }

    /// Composite key for a principal.
    pub fn key(self, org_id: &str, user_id: &str) -> String {
        format!("{}:{}:{}", self.as_str(), org_id, user_id)
    }
}
