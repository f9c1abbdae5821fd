//! In-process store. Mutations run under the map's write lock.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::Result;
use crate::models::BlinkRecord;
use crate::store::BlinkStore;

#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, BlinkRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing records (later duplicates overwrite earlier ones).
    pub fn with_records(records: impl IntoIterator<Item = BlinkRecord>) -> Self {
        let map = records
            .into_iter()
            .map(|mut r| {
                r.strip_derived();
                (r.id.clone(), r)
            })
            .collect();
        Self {
            records: RwLock::new(map),
        }
    }
}

#[async_trait]
impl BlinkStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<BlinkRecord>> {
        Ok(self.records.read().get(id).cloned())
    }

    async fn list(&self) -> Result<Vec<BlinkRecord>> {
        Ok(self.records.read().values().cloned().collect())
    }

    async fn insert_new(&self, mut record: BlinkRecord) -> Result<bool> {
        record.strip_derived();
        let mut map = self.records.write();
        if map.contains_key(&record.id) {
            return Ok(false);
        }
        map.insert(record.id.clone(), record);
        Ok(true)
    }

    async fn update_atomic(
        &self,
        id: &str,
        mutator: &mut (dyn for<'r> FnMut(&'r mut BlinkRecord) + Send),
    ) -> Result<Option<BlinkRecord>> {
        let mut map = self.records.write();
        Ok(map.get_mut(id).map(|record| {
            mutator(record);
            record.strip_derived();
            record.clone()
        }))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_new_never_overwrites() {
        let store = MemoryStore::new();
        let mut a = BlinkRecord::new("b1", "first");
        assert!(store.insert_new(a.clone()).await.unwrap());
        a.title = "second".into();
        assert!(!store.insert_new(a).await.unwrap());
        assert_eq!(store.get("b1").await.unwrap().unwrap().title, "first");
    }

    #[tokio::test]
    async fn update_unknown_id_skips_mutator() {
        let store = MemoryStore::new();
        let mut called = false;
        let out = store
            .update_atomic("nope", &mut |_r: &mut BlinkRecord| called = true)
            .await
            .unwrap();
        assert!(out.is_none());
        assert!(!called);
    }

    #[tokio::test]
    async fn list_is_ordered_by_id() {
        let store = MemoryStore::with_records(vec![
            BlinkRecord::new("c", "c"),
            BlinkRecord::new("a", "a"),
            BlinkRecord::new("b", "b"),
        ]);
        let ids: Vec<String> = store.list().await.unwrap().into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(store.titles().await.unwrap(), vec!["a", "b", "c"]);
    }
}
