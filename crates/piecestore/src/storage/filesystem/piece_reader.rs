use std::io::{Read, Seek, SeekFrom};

use super::FilesystemPiece;

/// Sequential reader over one piece. Reaching the end of the piece reads as
/// `Ok(0)`; missing data in the middle of the torrent is an
/// [`UnexpectedEof`](std::io::ErrorKind::UnexpectedEof) error.
#[derive(Debug, Clone, Copy)]
pub struct PieceReader<'a> {
    piece: FilesystemPiece<'a>,
    pos: u64,
}

impl<'a> PieceReader<'a> {
    pub(super) fn new(piece: FilesystemPiece<'a>) -> Self {
        Self { piece, pos: 0 }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }
}

impl Read for PieceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.piece.read_at(buf, self.pos) {
            Ok(n) => {
                self.pos += n as u64;
                Ok(n)
            }
            Err(e) => {
                // Hand out what was read; the error comes back on the next call.
                let n = e.bytes_transferred();
                if n > 0 || e.is_eof() {
                    self.pos += n as u64;
                    return Ok(n);
                }
                Err(e.into())
            }
        }
    }
}

impl Seek for PieceReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let len = self.piece.descriptor().length as u64;
        let new_pos = match pos {
            SeekFrom::Start(p) => Some(p),
            SeekFrom::End(d) => len.checked_add_signed(d),
            SeekFrom::Current(d) => self.pos.checked_add_signed(d),
        };
        match new_pos {
            Some(p) => {
                self.pos = p;
                Ok(p)
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "invalid seek to a negative or overflowing position",
            )),
        }
    }
}
