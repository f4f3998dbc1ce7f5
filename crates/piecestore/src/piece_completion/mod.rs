pub mod in_memory;
pub mod json;

use std::sync::Arc;

use piecestore_core::{Id20, PieceDescriptor};

pub use in_memory::InMemoryPieceCompletion;
pub use json::JsonPieceCompletion;

/// Identity of one piece of one torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PieceKey {
    pub info_hash: Id20,
    pub index: u32,
}

impl PieceKey {
    pub fn new(info_hash: Id20, piece: &PieceDescriptor) -> Self {
        Self {
            info_hash,
            index: piece.index,
        }
    }
}

#[derive(thiserror::Error, Debug)]
#[error("piece completion store is closed")]
pub struct ClosedError;

/// Persists one completion flag per piece.
///
/// Implementations must be safe to call from many threads at once. `set`
/// must be durable by the time it returns.
pub trait PieceCompletion: core::fmt::Debug + Send + Sync {
    /// Unknown pieces are not complete.
    fn get(&self, key: PieceKey) -> anyhow::Result<bool>;
    fn set(&self, key: PieceKey, complete: bool) -> anyhow::Result<()>;
    /// Flush and release. Calling it again is a no-op.
    fn close(&self) -> anyhow::Result<()>;
}

impl<T: PieceCompletion + ?Sized> PieceCompletion for Arc<T> {
    fn get(&self, key: PieceKey) -> anyhow::Result<bool> {
        (**self).get(key)
    }

    fn set(&self, key: PieceKey, complete: bool) -> anyhow::Result<()> {
        (**self).set(key, complete)
    }

    fn close(&self) -> anyhow::Result<()> {
        (**self).close()
    }
}
