use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ArcfetchError>;

#[derive(Error, Debug)]
pub enum ArcfetchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Home directory not found")]
    HomeDirectoryNotFound,

    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },
}

impl ArcfetchError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        ArcfetchError::ConfigError {
            message: message.into(),
        }
    }
}

/// Failures while retrieving an archive into memory.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Download failed: {url}: {reason}")]
    NetworkError { url: String, reason: String },
}

impl FetchError {
    pub fn invalid_url<U: Into<String>, R: ToString>(url: U, reason: R) -> Self {
        FetchError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn network<U: Into<String>, R: ToString>(url: U, reason: R) -> Self {
        FetchError::NetworkError {
            url: url.into(),
            reason: reason.to_string(),
        }
    }
}

/// Failures while decoding an in-memory archive onto disk.
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("Malformed archive: {reason}")]
    MalformedArchive { reason: String },

    #[error("Decompression failed: {reason}")]
    DecompressionError { reason: String },

    #[error("Unsupported archive format: {tag}")]
    UnsupportedFormat { tag: String },

    #[error("Extraction failed: {source}")]
    ExtractionFailure {
        #[source]
        source: Box<ExtractError>,
    },

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ExtractError {
    pub fn malformed<R: ToString>(reason: R) -> Self {
        ExtractError::MalformedArchive {
            reason: reason.to_string(),
        }
    }

    pub fn decompression<R: ToString>(reason: R) -> Self {
        ExtractError::DecompressionError {
            reason: reason.to_string(),
        }
    }

    pub fn io<P: Into<PathBuf>>(path: P, source: std::io::Error) -> Self {
        ExtractError::Io {
            path: path.into(),
            source,
        }
    }

    /// Wraps a decoder error into the umbrella failure used when the
    /// format was guessed rather than named.
    pub fn into_failure(self) -> Self {
        match self {
            failure @ ExtractError::ExtractionFailure { .. } => failure,
            other => ExtractError::ExtractionFailure {
                source: Box::new(other),
            },
        }
    }
}
