#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("piece length must be greater than 0")]
    ZeroPieceLength,
    #[error("too many pieces: {0}")]
    TooManyPieces(u64),
    #[error("torrent has no name")]
    EmptyName,
    #[error("multi-file torrent has a file with no path")]
    EmptyFilePath,
    #[error("empty path component in filename")]
    EmptyPathComponent,
    #[error("path traversal detected, {0:?} in filename")]
    PathTraversal(String),
    #[error("suspicious separator in filename bit {0:?}")]
    SeparatorInName(String),
    #[error("total length overflows u64")]
    LengthOverflow,
}
