use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_COMPLETION_FILENAME: &str = ".piece-completion.json";

/// Where piece completion flags are kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PieceCompletionBackend {
    /// A JSON file; relative paths are resolved against the storage base directory.
    Json { filename: PathBuf },
    /// Nothing survives a restart.
    InMemory,
}

impl Default for PieceCompletionBackend {
    fn default() -> Self {
        PieceCompletionBackend::Json {
            filename: PathBuf::from(DEFAULT_COMPLETION_FILENAME),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesystemStorageOptions {
    /// Mode for directories created on write. Only used on unix.
    pub dir_mode: u32,
    /// Mode for files created on write. Only used on unix.
    pub file_mode: u32,
    pub completion: PieceCompletionBackend,
}

impl Default for FilesystemStorageOptions {
    fn default() -> Self {
        Self {
            dir_mode: 0o770,
            file_mode: 0o660,
            completion: Default::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let opts: FilesystemStorageOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, FilesystemStorageOptions::default());
        assert_eq!(opts.dir_mode, 0o770);
        assert_eq!(opts.file_mode, 0o660);
    }

    #[test]
    fn test_in_memory_backend() {
        let opts: FilesystemStorageOptions =
            serde_json::from_str(r#"{"completion": {"type": "in_memory"}, "file_mode": 384}"#)
                .unwrap();
        assert_eq!(opts.completion, PieceCompletionBackend::InMemory);
        assert_eq!(opts.file_mode, 0o600);
        assert_eq!(opts.dir_mode, 0o770);
    }

    #[test]
    fn test_json_backend_filename() {
        let opts: FilesystemStorageOptions = serde_json::from_str(
            r#"{"completion": {"type": "json", "filename": "/var/lib/done.json"}}"#,
        )
        .unwrap();
        assert_eq!(
            opts.completion,
            PieceCompletionBackend::Json {
                filename: "/var/lib/done.json".into()
            }
        );
    }
}
