use std::{
    collections::{BTreeMap, BTreeSet},
    io::Write,
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::Context;
use parking_lot::RwLock;
use piecestore_core::Id20;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::{ClosedError, PieceCompletion, PieceKey};

#[derive(Serialize, Deserialize, Default)]
struct SerializedCompletionDatabase {
    torrents: BTreeMap<Id20, BTreeSet<u32>>,
}

impl SerializedCompletionDatabase {
    fn contains(&self, key: &PieceKey) -> bool {
        self.torrents
            .get(&key.info_hash)
            .is_some_and(|pieces| pieces.contains(&key.index))
    }

    // Returns true if anything changed.
    fn update(&mut self, key: PieceKey, complete: bool) -> bool {
        if complete {
            return self
                .torrents
                .entry(key.info_hash)
                .or_default()
                .insert(key.index);
        }
        let Some(pieces) = self.torrents.get_mut(&key.info_hash) else {
            return false;
        };
        let removed = pieces.remove(&key.index);
        if pieces.is_empty() {
            self.torrents.remove(&key.info_hash);
        }
        removed
    }
}

/// Stores completion flags in a single JSON file, rewritten on every change.
pub struct JsonPieceCompletion {
    db_filename: PathBuf,
    db_content: RwLock<SerializedCompletionDatabase>,
    closed: AtomicBool,
}

impl std::fmt::Debug for JsonPieceCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "JSON piece completion: {:?}", self.db_filename)
    }
}

impl JsonPieceCompletion {
    pub fn new(db_filename: PathBuf) -> anyhow::Result<Self> {
        if let Some(parent) = db_filename.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("couldn't create directory {parent:?} for piece completion")
            })?;
        }

        let db = match std::fs::read(&db_filename) {
            Ok(buf) => serde_json::from_slice(&buf)
                .with_context(|| format!("error deserializing {db_filename:?}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Default::default(),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("error opening piece completion {db_filename:?}"));
            }
        };
        debug!(filename=?db_filename, "opened piece completion");

        Ok(Self {
            db_filename,
            db_content: RwLock::new(db),
            closed: AtomicBool::new(false),
        })
    }

    pub fn filename(&self) -> &Path {
        &self.db_filename
    }

    fn check_open(&self) -> anyhow::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClosedError.into());
        }
        Ok(())
    }

    fn tmp_filename(&self) -> PathBuf {
        let mut tmp = self.db_filename.clone().into_os_string();
        tmp.push(".tmp");
        tmp.into()
    }

    fn flush(&self, db: &SerializedCompletionDatabase) -> anyhow::Result<()> {
        let tmp_filename = self.tmp_filename();
        let mut tmp = std::fs::OpenOptions::new()
            .create(true)
            .truncate(true)
            .write(true)
            .open(&tmp_filename)
            .with_context(|| format!("error opening {tmp_filename:?}"))?;

        let buf = serde_json::to_vec(db).context("error serializing")?;
        tmp.write_all(&buf)
            .with_context(|| format!("error writing {tmp_filename:?}"))?;
        tmp.sync_all()
            .with_context(|| format!("error syncing {tmp_filename:?}"))?;

        std::fs::rename(&tmp_filename, &self.db_filename)
            .context("error renaming piece completion file")?;
        trace!(filename=?self.db_filename, "wrote piece completion");
        Ok(())
    }
}

impl PieceCompletion for JsonPieceCompletion {
    fn get(&self, key: PieceKey) -> anyhow::Result<bool> {
        self.check_open()?;
        Ok(self.db_content.read().contains(&key))
    }

    fn set(&self, key: PieceKey, complete: bool) -> anyhow::Result<()> {
        self.check_open()?;
        // The write lock is held across the flush so that flushes happen in
        // the same order as updates.
        let mut db = self.db_content.write();
        if !db.update(key, complete) {
            return Ok(());
        }
        if let Err(e) = self.flush(&db) {
            // Keep memory in sync with what is on disk.
            db.update(key, !complete);
            return Err(e);
        }
        Ok(())
    }

    fn close(&self) -> anyhow::Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let db = self.db_content.read();
        self.flush(&db)?;
        debug!(filename=?self.db_filename, "closed piece completion");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    fn key(b: u8, index: u32) -> PieceKey {
        PieceKey {
            info_hash: Id20::new([b; 20]),
            index,
        }
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::with_prefix("piecestore_test").unwrap();
        let filename = dir.path().join("completion.json");

        let c = JsonPieceCompletion::new(filename.clone()).unwrap();
        assert!(!c.get(key(1, 0)).unwrap());
        c.set(key(1, 0), true).unwrap();
        c.set(key(1, 5), true).unwrap();
        c.set(key(2, 5), true).unwrap();
        c.set(key(2, 5), false).unwrap();
        c.close().unwrap();

        let c = JsonPieceCompletion::new(filename).unwrap();
        assert!(c.get(key(1, 0)).unwrap());
        assert!(c.get(key(1, 5)).unwrap());
        assert!(!c.get(key(1, 1)).unwrap());
        assert!(!c.get(key(2, 5)).unwrap());
    }

    #[test]
    fn test_set_is_durable_without_close() {
        let dir = TempDir::with_prefix("piecestore_test").unwrap();
        let filename = dir.path().join("completion.json");

        let c = JsonPieceCompletion::new(filename.clone()).unwrap();
        c.set(key(9, 3), true).unwrap();

        let other = JsonPieceCompletion::new(filename).unwrap();
        assert!(other.get(key(9, 3)).unwrap());
    }

    #[test]
    fn test_missing_file_is_empty_and_parent_created() {
        let dir = TempDir::with_prefix("piecestore_test").unwrap();
        let filename = dir.path().join("nested").join("completion.json");
        let c = JsonPieceCompletion::new(filename.clone()).unwrap();
        assert!(!c.get(key(1, 0)).unwrap());
        assert!(filename.parent().unwrap().is_dir());
        assert!(!filename.exists());
    }

    #[test]
    fn test_unchanged_set_does_not_write() {
        let dir = TempDir::with_prefix("piecestore_test").unwrap();
        let filename = dir.path().join("completion.json");
        let c = JsonPieceCompletion::new(filename.clone()).unwrap();
        c.set(key(1, 0), false).unwrap();
        assert!(!filename.exists());
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::with_prefix("piecestore_test").unwrap();
        let filename = dir.path().join("completion.json");
        std::fs::write(&filename, b"not json").unwrap();
        assert!(JsonPieceCompletion::new(filename).is_err());
    }

    #[test]
    fn test_closed() {
        let dir = TempDir::with_prefix("piecestore_test").unwrap();
        let c = JsonPieceCompletion::new(dir.path().join("completion.json")).unwrap();
        c.close().unwrap();
        c.close().unwrap();
        let err = c.set(key(1, 0), true).unwrap_err();
        assert!(err.downcast_ref::<ClosedError>().is_some());
    }
}
