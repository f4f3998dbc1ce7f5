use std::{
    collections::HashSet,
    sync::atomic::{AtomicBool, Ordering},
};

use parking_lot::RwLock;

use super::{ClosedError, PieceCompletion, PieceKey};

/// Keeps completion flags in memory only.
#[derive(Debug, Default)]
pub struct InMemoryPieceCompletion {
    completed: RwLock<HashSet<PieceKey>>,
    closed: AtomicBool,
}

impl InMemoryPieceCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_open(&self) -> anyhow::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ClosedError.into());
        }
        Ok(())
    }
}

impl PieceCompletion for InMemoryPieceCompletion {
    fn get(&self, key: PieceKey) -> anyhow::Result<bool> {
        self.check_open()?;
        Ok(self.completed.read().contains(&key))
    }

    fn set(&self, key: PieceKey, complete: bool) -> anyhow::Result<()> {
        self.check_open()?;
        let mut g = self.completed.write();
        if complete {
            g.insert(key);
        } else {
            g.remove(&key);
        }
        Ok(())
    }

    fn close(&self) -> anyhow::Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use piecestore_core::Id20;

    use super::*;

    fn key(index: u32) -> PieceKey {
        PieceKey {
            info_hash: Id20::new([3; 20]),
            index,
        }
    }

    #[test]
    fn test_get_set() {
        let c = InMemoryPieceCompletion::new();
        assert!(!c.get(key(0)).unwrap());
        c.set(key(0), true).unwrap();
        c.set(key(0), true).unwrap();
        assert!(c.get(key(0)).unwrap());
        assert!(!c.get(key(1)).unwrap());
        c.set(key(0), false).unwrap();
        assert!(!c.get(key(0)).unwrap());
    }

    #[test]
    fn test_closed() {
        let c = InMemoryPieceCompletion::new();
        c.close().unwrap();
        c.close().unwrap();
        let err = c.get(key(0)).unwrap_err();
        assert!(err.downcast_ref::<ClosedError>().is_some());
        assert!(c.set(key(0), true).is_err());
    }
}
