pub mod error;
pub mod hash_id;
pub mod layout;
pub mod lengths;

pub use error::Error;
pub use hash_id::Id20;
pub use layout::{FileEntry, PieceDescriptor, TorrentLayout};
