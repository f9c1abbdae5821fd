//! File-per-record store: `<dir>/<id>.json`.
//!
//! Writes go to `<id>.json.tmp` and are renamed into place, so readers observe either
//! the old or the new record. Writers for the same id serialize on a keyed lock.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::warn;

use crate::error::{BlinkError, Result};
use crate::models::BlinkRecord;
use crate::store::{is_valid_id, BlinkStore, KeyedLocks};

#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    locks: KeyedLocks,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).await?;
        Ok(Self {
            dir,
            locks: KeyedLocks::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> Option<PathBuf> {
        is_valid_id(id).then(|| self.dir.join(format!("{id}.json")))
    }

    async fn read_path(path: &Path) -> Result<Option<BlinkRecord>> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_path(path: &Path, record: &BlinkRecord) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}

#[async_trait]
impl BlinkStore for FileStore {
    async fn get(&self, id: &str) -> Result<Option<BlinkRecord>> {
        match self.path_for(id) {
            Some(path) => Self::read_path(&path).await,
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<BlinkRecord>> {
        let mut out = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match Self::read_path(&path).await {
                Ok(Some(r)) => out.push(r),
                Ok(None) => {}
                Err(e) => {
                    warn!(target: "store", path = %path.display(), error = %e, "skipping unreadable record");
                }
            }
        }
        out.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(out)
    }

    async fn insert_new(&self, mut record: BlinkRecord) -> Result<bool> {
        let Some(path) = self.path_for(&record.id) else {
            return Err(BlinkError::InvalidInput(format!(
                "invalid blink id '{}'",
                record.id
            )));
        };
        let _guard = self.locks.acquire(&record.id).await;
        if fs::try_exists(&path).await? {
            return Ok(false);
        }
        record.strip_derived();
        Self::write_path(&path, &record).await?;
        Ok(true)
    }

    async fn update_atomic(
        &self,
        id: &str,
        mutator: &mut (dyn for<'r> FnMut(&'r mut BlinkRecord) + Send),
    ) -> Result<Option<BlinkRecord>> {
        let Some(path) = self.path_for(id) else {
            return Ok(None);
        };
        let _guard = self.locks.acquire(id).await;
        let Some(mut record) = Self::read_path(&path).await? else {
            return Ok(None);
        };
        mutator(&mut record);
        record.strip_derived();
        Self::write_path(&path, &record).await?;
        Ok(Some(record))
    }

    fn backend(&self) -> &'static str {
        "file"
    }
}
