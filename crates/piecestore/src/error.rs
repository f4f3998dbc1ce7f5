use std::path::PathBuf;

#[derive(thiserror::Error, Debug)]
pub enum StorageError {
    /// The logical stream (or the piece window) really ended.
    #[error("end of file after {read} bytes")]
    Eof { read: usize },
    /// A file was short or missing while more data was expected after it.
    #[error("unexpected end of file after {read} bytes")]
    UnexpectedEof { read: usize },

    #[error("error creating directory {path:?}: {source:#}")]
    CreateDir {
        path: PathBuf,
        transferred: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("error opening {path:?}: {source:#}")]
    Open {
        path: PathBuf,
        transferred: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("error reading {path:?}: {source:#}")]
    Read {
        path: PathBuf,
        transferred: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("error writing {path:?}: {source:#}")]
    Write {
        path: PathBuf,
        transferred: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("range {offset}+{len} is out of bounds, limit {limit}")]
    OutOfBounds { offset: u64, len: usize, limit: u64 },

    #[error("piece completion store error: {0:#}")]
    Completion(#[source] anyhow::Error),
}

impl StorageError {
    /// Bytes read or written before the operation stopped.
    pub fn bytes_transferred(&self) -> usize {
        match self {
            StorageError::Eof { read } | StorageError::UnexpectedEof { read } => *read,
            StorageError::CreateDir { transferred, .. }
            | StorageError::Open { transferred, .. }
            | StorageError::Read { transferred, .. }
            | StorageError::Write { transferred, .. } => *transferred,
            StorageError::OutOfBounds { .. } | StorageError::Completion(_) => 0,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self, StorageError::Eof { .. })
    }

    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, StorageError::UnexpectedEof { .. })
    }
}

impl From<StorageError> for std::io::Error {
    fn from(e: StorageError) -> Self {
        use std::io::ErrorKind;
        match e {
            StorageError::CreateDir { source, .. }
            | StorageError::Open { source, .. }
            | StorageError::Read { source, .. }
            | StorageError::Write { source, .. } => source,
            StorageError::Eof { .. } | StorageError::UnexpectedEof { .. } => {
                std::io::Error::new(ErrorKind::UnexpectedEof, e)
            }
            StorageError::OutOfBounds { .. } => std::io::Error::new(ErrorKind::InvalidInput, e),
            StorageError::Completion(_) => std::io::Error::other(e),
        }
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
