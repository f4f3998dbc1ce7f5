use crate::{
    error::Error,
    hash_id::Id20,
    lengths::{Lengths, PieceInfo},
};

/// One constituent file of a torrent.
///
/// `path` is relative to the torrent's own directory. It is empty only for the
/// single file of a single-file torrent, which is stored under the torrent name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: Vec<String>,
    pub length: u64,
}

impl FileEntry {
    pub fn new<S: Into<String>>(path: impl IntoIterator<Item = S>, length: u64) -> Self {
        Self {
            path: path.into_iter().map(Into::into).collect(),
            length,
        }
    }
}

/// A piece as a window `[offset, offset + length)` onto the torrent's logical stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceDescriptor {
    pub index: u32,
    pub offset: u64,
    pub length: u32,
}

impl PieceDescriptor {
    /// `None` if the piece would end past `u64::MAX`.
    pub const fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.length as u64)
    }
}

impl From<PieceInfo> for PieceDescriptor {
    fn from(p: PieceInfo) -> Self {
        Self {
            index: p.piece_index.get(),
            offset: p.offset,
            length: p.len,
        }
    }
}

/// Read-only description of a torrent's files and piece geometry.
///
/// The order of `files` defines the logical concatenation and never changes
/// for the lifetime of the layout.
#[derive(Debug, Clone)]
pub struct TorrentLayout {
    info_hash: Id20,
    name: String,
    files: Vec<FileEntry>,
    lengths: Lengths,
}

fn validate_component(bit: &str) -> Result<(), Error> {
    if bit.is_empty() {
        return Err(Error::EmptyPathComponent);
    }
    if bit == ".." || bit == "." {
        return Err(Error::PathTraversal(bit.to_owned()));
    }
    if bit.contains('/') || bit.contains('\\') {
        return Err(Error::SeparatorInName(bit.to_owned()));
    }
    Ok(())
}

impl TorrentLayout {
    /// A multi-file layout. Every file must have a non-empty path.
    pub fn new(
        info_hash: Id20,
        name: impl Into<String>,
        files: Vec<FileEntry>,
        piece_length: u32,
    ) -> Result<Self, Error> {
        for f in files.iter() {
            if f.path.is_empty() {
                return Err(Error::EmptyFilePath);
            }
            for bit in f.path.iter() {
                validate_component(bit)?;
            }
        }
        Self::build(info_hash, name.into(), files, piece_length)
    }

    /// A single-file layout, stored directly under the torrent name.
    pub fn single_file(
        info_hash: Id20,
        name: impl Into<String>,
        length: u64,
        piece_length: u32,
    ) -> Result<Self, Error> {
        let files = vec![FileEntry {
            path: Vec::new(),
            length,
        }];
        Self::build(info_hash, name.into(), files, piece_length)
    }

    fn build(
        info_hash: Id20,
        name: String,
        files: Vec<FileEntry>,
        piece_length: u32,
    ) -> Result<Self, Error> {
        if name.is_empty() {
            return Err(Error::EmptyName);
        }
        validate_component(&name)?;
        let total_length = files
            .iter()
            .try_fold(0u64, |acc, f| acc.checked_add(f.length))
            .ok_or(Error::LengthOverflow)?;
        let lengths = Lengths::new(total_length, piece_length)?;
        Ok(Self {
            info_hash,
            name,
            files,
            lengths,
        })
    }

    pub fn info_hash(&self) -> &Id20 {
        &self.info_hash
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn lengths(&self) -> &Lengths {
        &self.lengths
    }

    pub fn total_length(&self) -> u64 {
        self.lengths.total_length()
    }

    pub fn piece_count(&self) -> u32 {
        self.lengths.total_pieces()
    }

    pub fn piece(&self, index: u32) -> Option<PieceDescriptor> {
        let index = self.lengths.validate_piece_index(index)?;
        Some(PieceDescriptor {
            index: index.get(),
            offset: self.lengths.piece_offset(index),
            length: self.lengths.piece_length(index),
        })
    }

    pub fn iter_pieces(&self) -> impl Iterator<Item = PieceDescriptor> + use<> {
        self.lengths.iter_piece_infos().map(PieceDescriptor::from)
    }

    /// Files together with their logical offset (the prefix sum of the
    /// lengths of all files before them).
    pub fn iter_file_offsets(&self) -> impl Iterator<Item = (u64, &FileEntry)> {
        self.files.iter().scan(0u64, |acc_offset, f| {
            let offset = *acc_offset;
            *acc_offset += f.length;
            Some((offset, f))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id() -> Id20 {
        Id20::new([7; 20])
    }

    fn two_files() -> TorrentLayout {
        TorrentLayout::new(
            id(),
            "t",
            vec![FileEntry::new(["a"], 5), FileEntry::new(["sub", "b"], 10)],
            4,
        )
        .unwrap()
    }

    #[test]
    fn test_total_length_and_pieces() {
        let l = two_files();
        assert_eq!(l.total_length(), 15);
        assert_eq!(l.piece_count(), 4);
        assert_eq!(
            l.piece(3),
            Some(PieceDescriptor {
                index: 3,
                offset: 12,
                length: 3
            })
        );
        assert_eq!(l.piece(4), None);
        assert_eq!(l.iter_pieces().map(|p| p.length as u64).sum::<u64>(), 15);
    }

    #[test]
    fn test_piece_end() {
        let l = two_files();
        assert_eq!(l.piece(3).unwrap().end(), Some(15));
        let hand_built = PieceDescriptor {
            index: 0,
            offset: u64::MAX - 1,
            length: 4,
        };
        assert_eq!(hand_built.end(), None);
    }

    #[test]
    fn test_file_offsets_are_prefix_sums() {
        let l = TorrentLayout::new(
            id(),
            "t",
            vec![
                FileEntry::new(["a"], 5),
                FileEntry::new(["empty"], 0),
                FileEntry::new(["b"], 10),
            ],
            16,
        )
        .unwrap();
        let offsets: Vec<u64> = l.iter_file_offsets().map(|(o, _)| o).collect();
        assert_eq!(offsets, vec![0, 5, 5]);
    }

    #[test]
    fn test_single_file() {
        let l = TorrentLayout::single_file(id(), "movie.mkv", 100, 32).unwrap();
        assert_eq!(l.files().len(), 1);
        assert!(l.files()[0].path.is_empty());
        assert_eq!(l.piece_count(), 4);
    }

    #[test]
    fn test_no_files() {
        let l = TorrentLayout::new(id(), "t", vec![], 16).unwrap();
        assert_eq!(l.total_length(), 0);
        assert_eq!(l.piece_count(), 0);
    }

    #[test]
    fn test_rejects_bad_paths() {
        let bad = |path: Vec<&str>| {
            TorrentLayout::new(id(), "t", vec![FileEntry::new(path, 1)], 16).unwrap_err()
        };
        assert!(matches!(bad(vec![]), Error::EmptyFilePath));
        assert!(matches!(bad(vec!["..", "etc"]), Error::PathTraversal(_)));
        assert!(matches!(bad(vec!["a/b"]), Error::SeparatorInName(_)));
        assert!(matches!(bad(vec!["a", ""]), Error::EmptyPathComponent));
        assert!(matches!(
            TorrentLayout::single_file(id(), "", 1, 16),
            Err(Error::EmptyName)
        ));
        assert!(matches!(
            TorrentLayout::single_file(id(), "..", 1, 16),
            Err(Error::PathTraversal(_))
        ));
    }
}
