//! Error taxonomy for the update pipeline.

use sheetpatch_common::AddressError;
use std::error::Error as StdError;
use std::path::{Path, PathBuf};
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Why a single cell in a batch could not be written.
#[derive(Debug, Error)]
pub enum CellUpdateCause {
    #[error(transparent)]
    Address(#[from] AddressError),

    #[error("{backend} backend rejected the write: {source}")]
    Backend {
        backend: &'static str,
        #[source]
        source: BoxError,
    },
}

impl CellUpdateCause {
    pub fn from_backend<E>(backend: &'static str, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        CellUpdateCause::Backend {
            backend,
            source: Box::new(err),
        }
    }
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("template `{reference}` not found (tried {})", .attempted.join(", "))]
    TemplateNotFound {
        reference: String,
        attempted: Vec<String>,
    },

    #[error("workbook {} contains no sheets", .path.display())]
    NoSheet { path: PathBuf },

    #[error("failed to update cell {address}: {source}")]
    CellUpdate {
        address: String,
        #[source]
        source: CellUpdateCause,
    },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{backend} backend failed on {}: {source}", .path.display())]
    Backend {
        backend: &'static str,
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl UpdateError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UpdateError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn from_backend<E>(backend: &'static str, path: &Path, err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        UpdateError::Backend {
            backend,
            path: path.to_path_buf(),
            source: Box::new(err),
        }
    }

    /// Offending cell address, for `CellUpdate` failures.
    pub fn address(&self) -> Option<&str> {
        match self {
            UpdateError::CellUpdate { address, .. } => Some(address),
            _ => None,
        }
    }

    /// Underlying address parse error, if that is what aborted the batch.
    pub fn address_error(&self) -> Option<&AddressError> {
        match self {
            UpdateError::CellUpdate {
                source: CellUpdateCause::Address(err),
                ..
            } => Some(err),
            _ => None,
        }
    }
}
