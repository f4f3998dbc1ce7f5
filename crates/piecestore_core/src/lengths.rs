use crate::error::Error;

pub const fn ceil_div_u64(a: u64, b: u64) -> u64 {
    a.div_ceil(b)
}

pub const fn last_element_size_u64(total: u64, chunk_size: u64) -> u64 {
    let rem = total % chunk_size;
    if rem == 0 {
        return chunk_size;
    }
    rem
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PieceInfo {
    pub piece_index: ValidPieceIndex,
    pub offset: u64,
    pub len: u32,
}

/// Piece geometry of one torrent: how its logical stream is cut into pieces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lengths {
    total_length: u64,
    piece_length: u32,
    total_pieces: u32,
    last_piece_length: u32,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidPieceIndex(u32);
impl std::fmt::Display for ValidPieceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl std::fmt::Debug for ValidPieceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl ValidPieceIndex {
    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Lengths {
    pub fn new(total_length: u64, piece_length: u32) -> Result<Self, Error> {
        if piece_length == 0 {
            return Err(Error::ZeroPieceLength);
        }
        let total_pieces = ceil_div_u64(total_length, piece_length as u64);
        let total_pieces =
            u32::try_from(total_pieces).map_err(|_| Error::TooManyPieces(total_pieces))?;
        let last_piece_length = if total_length == 0 {
            0
        } else {
            last_element_size_u64(total_length, piece_length as u64) as u32
        };
        Ok(Self {
            total_length,
            piece_length,
            total_pieces,
            last_piece_length,
        })
    }
    pub const fn total_length(&self) -> u64 {
        self.total_length
    }
    pub const fn default_piece_length(&self) -> u32 {
        self.piece_length
    }
    pub const fn total_pieces(&self) -> u32 {
        self.total_pieces
    }
    pub const fn validate_piece_index(&self, index: u32) -> Option<ValidPieceIndex> {
        if index >= self.total_pieces {
            return None;
        }
        Some(ValidPieceIndex(index))
    }
    pub const fn last_piece_id(&self) -> Option<ValidPieceIndex> {
        if self.total_pieces == 0 {
            return None;
        }
        Some(ValidPieceIndex(self.total_pieces - 1))
    }
    pub const fn piece_length(&self, index: ValidPieceIndex) -> u32 {
        if index.0 + 1 == self.total_pieces {
            return self.last_piece_length;
        }
        self.piece_length
    }
    pub const fn piece_offset(&self, index: ValidPieceIndex) -> u64 {
        index.0 as u64 * self.piece_length as u64
    }

    pub fn iter_piece_infos(&self) -> impl Iterator<Item = PieceInfo> + use<> {
        let this = *self;
        (0..self.total_pieces).map(move |idx| {
            let piece_index = ValidPieceIndex(idx);
            PieceInfo {
                piece_index,
                offset: this.piece_offset(piece_index),
                len: this.piece_length(piece_index),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_lengths() -> Lengths {
        Lengths::new(1174243328, 262144).unwrap()
    }

    #[test]
    fn test_total_pieces() {
        let l = make_lengths();
        assert_eq!(l.total_pieces(), 4480);
    }

    #[test]
    fn test_total_pieces_2() {
        let l = Lengths::new(4148166656, 2097152).unwrap();
        assert_eq!(l.total_pieces(), 1978);
    }

    #[test]
    fn test_piece_length() {
        let l = make_lengths();
        let p = l.validate_piece_index(4479).unwrap();

        assert_eq!(l.piece_length(l.validate_piece_index(0).unwrap()), 262144);
        assert_eq!(l.piece_length(p), 100352);
        assert_eq!(l.piece_offset(p), 4479 * 262144);
        assert!(l.validate_piece_index(4480).is_none());
    }

    #[test]
    fn test_exact_multiple_has_full_last_piece() {
        let l = Lengths::new(32, 16).unwrap();
        assert_eq!(l.total_pieces(), 2);
        assert_eq!(l.piece_length(l.last_piece_id().unwrap()), 16);
    }

    #[test]
    fn test_empty_torrent() {
        let l = Lengths::new(0, 16).unwrap();
        assert_eq!(l.total_pieces(), 0);
        assert!(l.last_piece_id().is_none());
        assert_eq!(l.iter_piece_infos().count(), 0);
    }

    #[test]
    fn test_zero_piece_length() {
        assert!(matches!(Lengths::new(10, 0), Err(Error::ZeroPieceLength)));
    }

    #[test]
    fn test_iter_piece_infos_partition_stream() {
        let l = Lengths::new(15, 4).unwrap();
        let infos: Vec<_> = l.iter_piece_infos().map(|p| (p.offset, p.len)).collect();
        assert_eq!(infos, vec![(0, 4), (4, 4), (8, 4), (12, 3)]);
    }
}
