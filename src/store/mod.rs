//! Record store abstraction: one record per blink, keyed by id.
//!
//! `update_atomic` is the only mutation path for existing records and runs the
//! mutator inside a per-blink critical section. Different blinks never contend.

pub mod file;
pub mod locks;
pub mod memory;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;
use crate::models::BlinkRecord;

pub use file::FileStore;
pub use locks::KeyedLocks;
pub use memory::MemoryStore;

#[async_trait]
pub trait BlinkStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Option<BlinkRecord>>;

    /// All records, ordered by id.
    async fn list(&self) -> Result<Vec<BlinkRecord>>;

    /// Persist a new record. Returns `false` (and writes nothing) if the id exists.
    async fn insert_new(&self, record: BlinkRecord) -> Result<bool>;

    /// Read-modify-write under the record's lock. `None` if the id is unknown, in which
    /// case the mutator is not called.
    async fn update_atomic(
        &self,
        id: &str,
        mutator: &mut (dyn for<'r> FnMut(&'r mut BlinkRecord) + Send),
    ) -> Result<Option<BlinkRecord>>;

    fn backend(&self) -> &'static str;

    async fn titles(&self) -> Result<Vec<String>> {
        Ok(self.list().await?.into_iter().map(|r| r.title).collect())
    }
}

pub type SharedStore = Arc<dyn BlinkStore>;

/// Ids are used as file names; anything outside `[A-Za-z0-9_-]` is rejected.
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub async fn build_store(cfg: &StoreConfig) -> anyhow::Result<SharedStore> {
    let store: SharedStore = match cfg.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::open(&cfg.dir).await?),
    };
    tracing::info!(target: "store", backend = store.backend(), "record store ready");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_validation() {
        assert!(is_valid_id("a1b2c3d4e5f60718"));
        assert!(is_valid_id("legacy_id-7"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id("../etc/passwd"));
        assert!(!is_valid_id("a/b"));
        assert!(!is_valid_id("a.json"));
    }
}
