use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatasetError {
    // Discovery
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Required file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    // Record format
    #[error("Malformed record in {}: {message}", path.display())]
    Format { path: PathBuf, message: String },

    #[error("Pickle error in {}: {source}", path.display())]
    Pickle {
        path: PathBuf,
        #[source]
        source: serde_pickle::Error,
    },

    // Partitioner never merges into an existing output
    #[error("Target directory already exists: {}", .0.display())]
    TargetExists(PathBuf),

    #[error("Index {index} out of range for split of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid sampling rates: {message}")]
    InvalidRates { message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Image error for {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Coarse classification of a [`DatasetError`], one entry per failure class
/// a caller may want to react to differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Discovery,
    Format,
    Conflict,
    Range,
    Config,
    Io,
}

impl DatasetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DatasetError::DirectoryNotFound(_) | DatasetError::FileNotFound(_) => {
                ErrorKind::Discovery
            }
            DatasetError::Format { .. } | DatasetError::Pickle { .. } => ErrorKind::Format,
            DatasetError::TargetExists(_) => ErrorKind::Conflict,
            DatasetError::IndexOutOfRange { .. } => ErrorKind::Range,
            DatasetError::InvalidRates { .. } | DatasetError::InvalidConfig(_) => ErrorKind::Config,
            DatasetError::IoError(_) | DatasetError::Image { .. } => ErrorKind::Io,
        }
    }

    pub(crate) fn format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        DatasetError::Format {
            path: path.into(),
            message: message.into(),
        }
    }
}
