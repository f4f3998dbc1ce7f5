use std::{
    fs::{DirBuilder, File, OpenOptions},
    io::{ErrorKind, Read, Seek, SeekFrom, Write},
    path::{Path, PathBuf},
};

use piecestore_core::{FileEntry, TorrentLayout};
use tracing::trace;

use crate::{
    error::{Result, StorageError},
    options::FilesystemStorageOptions,
};

use super::paths::torrent_file_path;

/// Exposes the files of one torrent as a single byte array.
///
/// Every call opens, uses and closes the files it touches. Nothing is cached
/// and nothing is locked: concurrent writes to overlapping ranges of the same
/// file interleave however the filesystem interleaves them.
pub(crate) struct FileRangeIo<'a> {
    layout: &'a TorrentLayout,
    base_dir: &'a Path,
    opts: &'a FilesystemStorageOptions,
}

impl<'a> FileRangeIo<'a> {
    pub fn new(
        layout: &'a TorrentLayout,
        base_dir: &'a Path,
        opts: &'a FilesystemStorageOptions,
    ) -> Self {
        Self {
            layout,
            base_dir,
            opts,
        }
    }

    pub fn file_path(&self, file: &FileEntry) -> PathBuf {
        torrent_file_path(
            self.base_dir,
            self.layout.info_hash(),
            self.layout.name(),
            &file.path,
        )
    }

    /// Fills `buf` from logical offset `offset`.
    ///
    /// Returns `Ok(buf.len())` when filled. A short or missing file stops the
    /// walk with `UnexpectedEof` if any non-empty file follows it, and `Eof`
    /// otherwise. Running out of files yields `Eof`.
    pub fn read_at(&self, mut buf: &mut [u8], mut offset: u64) -> Result<usize> {
        let files = self.layout.files();
        let mut read = 0;
        for (idx, fi) in files.iter().enumerate() {
            if offset >= fi.length {
                offset -= fi.length;
                continue;
            }
            if buf.is_empty() {
                return Ok(read);
            }
            let to_read = std::cmp::min(buf.len() as u64, fi.length - offset) as usize;
            let path = self.file_path(fi);
            let n = read_file_at(&path, &mut buf[..to_read], offset, read)?;
            read += n;
            buf = &mut buf[n..];

            if n < to_read {
                let more_data_expected = files[idx + 1..].iter().any(|f| f.length > 0);
                trace!(
                    ?path,
                    offset,
                    expected = to_read,
                    got = n,
                    more_data_expected,
                    "short read"
                );
                if more_data_expected {
                    return Err(StorageError::UnexpectedEof { read });
                }
                return Err(StorageError::Eof { read });
            }
            if buf.is_empty() {
                return Ok(read);
            }
            offset = 0;
        }
        Err(StorageError::Eof { read })
    }

    /// Writes all of `buf` at logical offset `offset`, creating directories
    /// and files as needed. Ranges past the end of the torrent are rejected
    /// before anything is written.
    pub fn write_at(&self, mut buf: &[u8], mut offset: u64) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let total = self.layout.total_length();
        if offset
            .checked_add(buf.len() as u64)
            .is_none_or(|end| end > total)
        {
            return Err(StorageError::OutOfBounds {
                offset,
                len: buf.len(),
                limit: total,
            });
        }

        let mut written = 0;
        for fi in self.layout.files() {
            if offset >= fi.length {
                offset -= fi.length;
                continue;
            }
            let to_write = std::cmp::min(buf.len() as u64, fi.length - offset) as usize;
            let path = self.file_path(fi);
            write_file_at(&path, &buf[..to_write], offset, written, self.opts)?;
            written += to_write;
            buf = &buf[to_write..];
            if buf.is_empty() {
                break;
            }
            offset = 0;
        }
        Ok(written)
    }
}

// A missing file reads as an empty one. Returns fewer bytes than asked for
// only if the file ends early.
fn read_file_at(path: &Path, buf: &mut [u8], offset: u64, transferred: usize) -> Result<usize> {
    let mut f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            trace!(?path, "file missing");
            return Ok(0);
        }
        Err(source) => {
            return Err(StorageError::Open {
                path: path.to_owned(),
                transferred,
                source,
            });
        }
    };
    let read_err = |read: usize, source: std::io::Error| StorageError::Read {
        path: path.to_owned(),
        transferred: transferred + read,
        source,
    };
    f.seek(SeekFrom::Start(offset))
        .map_err(|e| read_err(0, e))?;

    let mut read = 0;
    while read < buf.len() {
        match f.read(&mut buf[read..]) {
            Ok(0) => break,
            Ok(n) => read += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(read_err(read, e)),
        }
    }
    trace!(?path, offset, len = buf.len(), read, "read");
    Ok(read)
}

fn write_file_at(
    path: &Path,
    buf: &[u8],
    offset: u64,
    transferred: usize,
    opts: &FilesystemStorageOptions,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent, opts.dir_mode).map_err(|source| StorageError::CreateDir {
            path: parent.to_owned(),
            transferred,
            source,
        })?;
    }
    let mut f = open_for_write(path, opts.file_mode).map_err(|source| StorageError::Open {
        path: path.to_owned(),
        transferred,
        source,
    })?;
    let write_err = |written: usize, source: std::io::Error| StorageError::Write {
        path: path.to_owned(),
        transferred: transferred + written,
        source,
    };
    f.seek(SeekFrom::Start(offset))
        .map_err(|e| write_err(0, e))?;

    let mut written = 0;
    while written < buf.len() {
        match f.write(&buf[written..]) {
            Ok(0) => return Err(write_err(written, ErrorKind::WriteZero.into())),
            Ok(n) => written += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(write_err(written, e)),
        }
    }
    trace!(?path, offset, len = buf.len(), "wrote");
    Ok(())
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn create_dir_all(path: &Path, mode: u32) -> std::io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(mode);
    }
    builder.create(path)
}

#[cfg_attr(not(unix), allow(unused_variables))]
fn open_for_write(path: &Path, mode: u32) -> std::io::Result<File> {
    let mut oo = OpenOptions::new();
    oo.write(true).create(true).truncate(false);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        oo.mode(mode);
    }
    oo.open(path)
}
