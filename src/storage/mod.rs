//! Persistence adapter for exploration state.
//!
//! State is written to a plain key-value capability ([`KeyValueStore`]) so
//! the backing store can be swapped: SQLite for the binary, an in-memory map
//! for tests. [`SessionStore`] layers the per-variant key scheme and the
//! load-with-fallback policy on top.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StorageResult;
use crate::explorer::Variant;
use crate::session::{ManagerSnapshot, SessionManager};

/// Durable string key-value storage.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// Write a value, replacing any previous one
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
}

/// Key holding the last-used variant.
pub const VARIANT_KEY: &str = "tracetree:variant";

/// Key holding the tabs of one variant.
pub fn tabs_key(variant: Variant) -> String {
    format!("tracetree:tabs:{}", variant)
}

/// Saves and restores session managers, one key per variant.
#[derive(Debug, Clone)]
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    /// Wrap a key-value store
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// The underlying key-value store
    pub fn inner(&self) -> &S {
        &self.store
    }

    /// Serialize `manager` under the variant's key.
    pub async fn save(&self, variant: Variant, manager: &SessionManager) -> StorageResult<()> {
        let payload = serde_json::to_string(&manager.snapshot())?;
        self.store.set(&tabs_key(variant), &payload).await?;
        debug!(variant = %variant, tabs = manager.len(), "Sessions saved");
        Ok(())
    }

    /// Restore the variant's manager.
    ///
    /// Never fails: a missing key, unreadable store or malformed payload all
    /// yield a single default session anchored at `root_node_id`.
    pub async fn load(
        &self,
        variant: Variant,
        root_node_id: &str,
        max_sessions: usize,
    ) -> SessionManager {
        let key = tabs_key(variant);
        let raw = match self.store.get(&key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(variant = %variant, "No stored sessions; starting fresh");
                return SessionManager::new(root_node_id, max_sessions);
            }
            Err(e) => {
                warn!(
                    variant = %variant,
                    error = %e,
                    "Failed to read stored sessions; starting fresh"
                );
                return SessionManager::new(root_node_id, max_sessions);
            }
        };

        match serde_json::from_str::<ManagerSnapshot>(&raw) {
            Ok(snapshot) => {
                let manager = SessionManager::from_snapshot(snapshot, root_node_id, max_sessions);
                debug!(variant = %variant, tabs = manager.len(), "Sessions restored");
                manager
            }
            Err(e) => {
                warn!(
                    variant = %variant,
                    error = %e,
                    "Stored sessions are malformed; starting fresh"
                );
                SessionManager::new(root_node_id, max_sessions)
            }
        }
    }

    /// Record the last-used variant
    pub async fn save_variant(&self, variant: Variant) -> StorageResult<()> {
        self.store.set(VARIANT_KEY, &variant.to_string()).await
    }

    /// The last-used variant, if one was stored and is recognized
    pub async fn load_variant(&self) -> Option<Variant> {
        match self.store.get(VARIANT_KEY).await {
            Ok(Some(raw)) => match raw.parse::<Variant>() {
                Ok(variant) => Some(variant),
                Err(e) => {
                    warn!(stored = %raw, error = %e, "Ignoring unknown stored variant");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read stored variant");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;

    struct BrokenStore;

    #[async_trait]
    impl KeyValueStore for BrokenStore {
        async fn get(&self, _key: &str) -> StorageResult<Option<String>> {
            Err(StorageError::Query {
                message: "disk on fire".to_string(),
            })
        }

        async fn set(&self, _key: &str, _value: &str) -> StorageResult<()> {
            Err(StorageError::Query {
                message: "disk on fire".to_string(),
            })
        }
    }

    #[test]
    fn test_keys_are_namespaced_per_variant() {
        assert_eq!(tabs_key(Variant::Windows), "tracetree:tabs:windows");
        assert_eq!(tabs_key(Variant::Linux), "tracetree:tabs:linux");
        assert_ne!(tabs_key(Variant::Windows), VARIANT_KEY);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let store = SessionStore::new(MemoryStore::new());
        let mut manager = SessionManager::new("root", 10);
        manager.create_session("root");
        manager.active_mut().toggle_hint("root");

        store.save(Variant::Linux, &manager).await.unwrap();
        let restored = store.load(Variant::Linux, "root", 10).await;

        assert_eq!(restored, manager);
    }

    #[tokio::test]
    async fn test_absent_key_defaults() {
        let store = SessionStore::new(MemoryStore::new());
        let manager = store.load(Variant::Windows, "win-root", 10).await;
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.active().node_hierarchy[0].node_id, "win-root");
    }

    #[tokio::test]
    async fn test_corrupted_payload_defaults() {
        let memory = MemoryStore::new();
        memory.set(&tabs_key(Variant::Linux), "{not json").await.unwrap();
        let store = SessionStore::new(memory);

        let manager = store.load(Variant::Linux, "root", 10).await;
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.active().name, "Set 1");
    }

    #[tokio::test]
    async fn test_missing_fields_default() {
        let memory = MemoryStore::new();
        memory.set(&tabs_key(Variant::Linux), r#"{"tabs": []}"#).await.unwrap();
        let store = SessionStore::new(memory);

        let manager = store.load(Variant::Linux, "root", 10).await;
        assert_eq!(manager.len(), 1);
    }

    #[tokio::test]
    async fn test_broken_store_never_fails_load() {
        let store = SessionStore::new(BrokenStore);
        let manager = store.load(Variant::Linux, "root", 10).await;
        assert_eq!(manager.len(), 1);
        assert!(store.load_variant().await.is_none());
        assert!(store.save(Variant::Linux, &manager).await.is_err());
    }

    #[tokio::test]
    async fn test_variant_round_trip() {
        let store = SessionStore::new(MemoryStore::new());
        assert!(store.load_variant().await.is_none());

        store.save_variant(Variant::Windows).await.unwrap();
        assert_eq!(store.load_variant().await, Some(Variant::Windows));

        store.inner().set(VARIANT_KEY, "solaris").await.unwrap();
        assert!(store.load_variant().await.is_none());
    }
}
