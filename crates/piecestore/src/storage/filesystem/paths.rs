use std::path::{Path, PathBuf};

use piecestore_core::Id20;

/// The directory holding everything of one torrent: `base/<info hash hex>/<name>`.
///
/// The info hash component keeps torrents sharing a base directory apart.
pub fn torrent_dir(base_dir: &Path, info_hash: &Id20, name: &str) -> PathBuf {
    let mut p = base_dir.to_path_buf();
    p.push(info_hash.as_string());
    p.push(name);
    p
}

/// Where a constituent file lives on disk. An empty `segments` (single-file
/// torrents) resolves to the torrent directory itself.
pub fn torrent_file_path<S: AsRef<str>>(
    base_dir: &Path,
    info_hash: &Id20,
    name: &str,
    segments: &[S],
) -> PathBuf {
    let mut p = torrent_dir(base_dir, info_hash, name);
    for bit in segments {
        p.push(bit.as_ref());
    }
    p
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_multi_file_path() {
        let ih = Id20::from_str("00112233445566778899aabbccddeeff00112233").unwrap();
        let p = torrent_file_path(Path::new("/data"), &ih, "album", &["cd1", "01.flac"]);
        assert_eq!(
            p,
            Path::new("/data/00112233445566778899aabbccddeeff00112233/album/cd1/01.flac")
        );
    }

    #[test]
    fn test_single_file_path() {
        let ih = Id20::new([0xab; 20]);
        let p = torrent_file_path::<&str>(Path::new("base"), &ih, "movie.mkv", &[]);
        assert_eq!(p, Path::new("base").join(ih.as_string()).join("movie.mkv"));
    }

    #[test]
    fn test_different_torrents_do_not_collide() {
        let a = torrent_file_path(Path::new("b"), &Id20::new([1; 20]), "same", &["f"]);
        let b = torrent_file_path(Path::new("b"), &Id20::new([2; 20]), "same", &["f"]);
        assert_ne!(a, b);
    }
}
