//!
//! File-backed storage for torrents.
//!
//! A torrent's content is one logical byte stream cut into pieces, stored on
//! disk as any number of files. This crate maps reads and writes at arbitrary
//! offsets onto those files and tracks which pieces have been completed.
//!
//! # Quick usage example
//!
//! ```no_run
//! use piecestore::*;
//!
//! let storage = FilesystemStorage::new("/tmp/where-to-store").unwrap();
//! let layout = TorrentLayout::new(
//!     Id20::new([0xab; 20]),
//!     "album",
//!     vec![FileEntry::new(["01.flac"], 5), FileEntry::new(["02.flac"], 10)],
//!     8,
//! )
//! .unwrap();
//!
//! let torrent = storage.open_torrent(&layout);
//! let piece = torrent.piece(layout.piece(0).unwrap());
//! piece.write_at(b"01234567", 0).unwrap();
//! piece.mark_complete().unwrap();
//! assert!(piece.is_complete().unwrap());
//!
//! storage.close().unwrap();
//! ```
//!
//! # Overview
//! The main type to start off with is [`FilesystemStorage`]. It hands out a
//! [`FilesystemTorrentStorage`] per torrent, which in turn hands out a
//! [`FilesystemPiece`] per piece.

pub mod error;
pub mod options;
pub mod piece_completion;
pub mod storage;

pub use error::StorageError;
pub use options::{FilesystemStorageOptions, PieceCompletionBackend};
pub use piece_completion::{
    ClosedError, InMemoryPieceCompletion, JsonPieceCompletion, PieceCompletion, PieceKey,
};
pub use storage::{FilesystemPiece, FilesystemStorage, FilesystemTorrentStorage, PieceReader};

pub use piecestore_core::{FileEntry, Id20, PieceDescriptor, TorrentLayout};


/// The cargo version of piecestore.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
