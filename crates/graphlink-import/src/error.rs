//! Error types for the graphlink-import crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    SourceRead(#[from] SourceReadError),

    #[error("Graph error: {0}")]
    Store(#[from] graphlink_graph::StoreError),

    #[error("Invalid mapping: {0}")]
    Mapping(#[from] graphlink_core::ConfigurationError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to obtain rows from a row source.
#[derive(Error, Debug)]
pub enum SourceReadError {
    #[error("Cannot open row source {path}: {reason}")]
    Open { path: PathBuf, reason: String },

    #[error("Read error in {path} at record {record}: {reason}")]
    Io {
        path: PathBuf,
        record: usize,
        reason: String,
    },

    /// A single record could not be decoded; the rest of the source is fine.
    #[error("Malformed record {record}: {reason}")]
    Malformed { record: usize, reason: String },
}

impl SourceReadError {
    /// Whether the source as a whole can no longer be read.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Malformed { .. })
    }
}

impl From<config::ConfigError> for ImportError {
    fn from(e: config::ConfigError) -> Self {
        Self::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImportError>;
