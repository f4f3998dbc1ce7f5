pub mod filesystem;

pub use filesystem::{FilesystemPiece, FilesystemStorage, FilesystemTorrentStorage, PieceReader};
