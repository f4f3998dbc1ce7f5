mod file_range;
pub mod paths;
mod piece_reader;

use std::path::{Path, PathBuf};

use anyhow::Context;
use piecestore_core::{FileEntry, PieceDescriptor, TorrentLayout};
use tracing::{debug, warn};

use crate::{
    error::{Result, StorageError},
    options::{FilesystemStorageOptions, PieceCompletionBackend},
    piece_completion::{InMemoryPieceCompletion, JsonPieceCompletion, PieceCompletion, PieceKey},
};

use self::file_range::FileRangeIo;

pub use self::piece_reader::PieceReader;

/// File-based storage for torrents under one base directory.
///
/// Owns the piece completion store. Torrent and piece handles borrow from it,
/// so they can't outlive [`FilesystemStorage::close`].
#[derive(Debug)]
pub struct FilesystemStorage {
    base_dir: PathBuf,
    opts: FilesystemStorageOptions,
    completion: Box<dyn PieceCompletion>,
    closed: bool,
}

impl FilesystemStorage {
    pub fn new(base_dir: impl Into<PathBuf>) -> anyhow::Result<Self> {
        Self::with_options(base_dir, Default::default())
    }

    pub fn with_options(
        base_dir: impl Into<PathBuf>,
        opts: FilesystemStorageOptions,
    ) -> anyhow::Result<Self> {
        let base_dir = base_dir.into();
        let completion: Box<dyn PieceCompletion> = match &opts.completion {
            PieceCompletionBackend::Json { filename } => {
                let filename = base_dir.join(filename);
                Box::new(
                    JsonPieceCompletion::new(filename)
                        .context("error opening piece completion store")?,
                )
            }
            PieceCompletionBackend::InMemory => Box::new(InMemoryPieceCompletion::new()),
        };
        Ok(Self::from_boxed(base_dir, opts, completion))
    }

    /// Uses the given completion store instead of the one named in `opts.completion`.
    pub fn with_completion(
        base_dir: impl Into<PathBuf>,
        opts: FilesystemStorageOptions,
        completion: impl PieceCompletion + 'static,
    ) -> Self {
        Self::from_boxed(base_dir.into(), opts, Box::new(completion))
    }

    fn from_boxed(
        base_dir: PathBuf,
        opts: FilesystemStorageOptions,
        completion: Box<dyn PieceCompletion>,
    ) -> Self {
        debug!(?base_dir, ?completion, "opened filesystem storage");
        Self {
            base_dir,
            opts,
            completion,
            closed: false,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn options(&self) -> &FilesystemStorageOptions {
        &self.opts
    }

    /// No disk access happens here, files are created on first write.
    pub fn open_torrent<'a>(&'a self, layout: &'a TorrentLayout) -> FilesystemTorrentStorage<'a> {
        FilesystemTorrentStorage {
            storage: self,
            layout,
        }
    }

    /// Releases the piece completion store.
    pub fn close(mut self) -> Result<()> {
        self.closed = true;
        self.completion.close().map_err(StorageError::Completion)?;
        debug!(base_dir=?self.base_dir, "closed filesystem storage");
        Ok(())
    }
}

impl Drop for FilesystemStorage {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(e) = self.completion.close() {
            warn!(base_dir=?self.base_dir, "error closing piece completion store: {e:#}");
        }
    }
}

/// One torrent's view of a [`FilesystemStorage`].
#[derive(Debug, Clone, Copy)]
pub struct FilesystemTorrentStorage<'a> {
    storage: &'a FilesystemStorage,
    layout: &'a TorrentLayout,
}

impl<'a> FilesystemTorrentStorage<'a> {
    fn io(&self) -> FileRangeIo<'a> {
        FileRangeIo::new(self.layout, &self.storage.base_dir, &self.storage.opts)
    }

    pub fn layout(&self) -> &'a TorrentLayout {
        self.layout
    }

    /// `base/<info hash hex>/<name>/<file path...>`.
    pub fn file_path(&self, file: &FileEntry) -> PathBuf {
        self.io().file_path(file)
    }

    /// Reads from the torrent's whole logical stream.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        self.io().read_at(buf, offset)
    }

    /// Writes to the torrent's whole logical stream.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        self.io().write_at(buf, offset)
    }

    pub fn piece(&self, piece: PieceDescriptor) -> FilesystemPiece<'a> {
        FilesystemPiece {
            torrent: *self,
            piece,
        }
    }

    /// Indices of the layout's pieces marked complete.
    pub fn completed_pieces(&self) -> Result<Vec<u32>> {
        let mut completed = Vec::new();
        for piece in self.layout.iter_pieces() {
            if self.piece(piece).is_complete()? {
                completed.push(piece.index);
            }
        }
        Ok(completed)
    }
}

/// One piece of a torrent: a window onto the logical stream plus a completion flag.
///
/// Offsets passed to [`read_at`](Self::read_at) and [`write_at`](Self::write_at)
/// are relative to the start of the piece.
#[derive(Debug, Clone, Copy)]
pub struct FilesystemPiece<'a> {
    torrent: FilesystemTorrentStorage<'a>,
    piece: PieceDescriptor,
}

impl<'a> FilesystemPiece<'a> {
    pub fn descriptor(&self) -> &PieceDescriptor {
        &self.piece
    }

    pub fn key(&self) -> PieceKey {
        PieceKey::new(*self.torrent.layout.info_hash(), &self.piece)
    }

    // Translates a piece-relative offset into the torrent's stream.
    fn stream_offset(&self, offset: u64, len: usize) -> Result<u64> {
        self.piece
            .offset
            .checked_add(offset)
            .ok_or(StorageError::OutOfBounds {
                offset,
                len,
                limit: self.piece.length as u64,
            })
    }

    /// Reads are clamped to the piece. If clamping happened the result is
    /// `Eof` carrying the number of bytes read.
    pub fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        let len = self.piece.length as u64;
        if offset >= len {
            return Err(StorageError::Eof { read: 0 });
        }
        let max = len - offset;
        let pos = self.stream_offset(offset, buf.len())?;
        if buf.len() as u64 > max {
            let n = self.torrent.read_at(&mut buf[..max as usize], pos)?;
            return Err(StorageError::Eof { read: n });
        }
        self.torrent.read_at(buf, pos)
    }

    /// Writes must fit into the piece.
    pub fn write_at(&self, buf: &[u8], offset: u64) -> Result<usize> {
        let len = self.piece.length as u64;
        if offset
            .checked_add(buf.len() as u64)
            .is_none_or(|end| end > len)
        {
            return Err(StorageError::OutOfBounds {
                offset,
                len: buf.len(),
                limit: len,
            });
        }
        let pos = self.stream_offset(offset, buf.len())?;
        self.torrent.write_at(buf, pos)
    }

    pub fn is_complete(&self) -> Result<bool> {
        self.torrent
            .storage
            .completion
            .get(self.key())
            .map_err(StorageError::Completion)
    }

    pub fn mark_complete(&self) -> Result<()> {
        let key = self.key();
        self.torrent
            .storage
            .completion
            .set(key, true)
            .map_err(StorageError::Completion)?;
        debug!(info_hash=?key.info_hash, piece=key.index, "marked piece complete");
        Ok(())
    }

    /// A `Read + Seek` cursor over this piece.
    pub fn reader(&self) -> PieceReader<'a> {
        PieceReader::new(*self)
    }
}
