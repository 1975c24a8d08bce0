//! Error type shared by the loader, the classifier and the writers.
//!
//! Only `ResourceNotFound` and `Config` are meant to abort a run. The other
//! variants describe per-record or per-output faults that callers log and
//! skip past.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// An input file does not exist.
    #[error("File not found: {}", .path.display())]
    ResourceNotFound { path: PathBuf },

    /// A reference table row lacks a required column.
    #[error("Missing expected column '{0}'")]
    MissingColumn(String),

    /// A flow log line that cannot be classified.
    #[error("Invalid log line {line_number}: {reason}")]
    MalformedLine { line_number: u64, reason: String },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// An output destination could not be written.
    #[error("Failed to write {}: {reason}", .path.display())]
    WriteFailure { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AnalyzerError {
    /// Maps an error from opening `path`, keeping `NotFound` distinct.
    pub fn from_open(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            AnalyzerError::ResourceNotFound { path }
        } else {
            AnalyzerError::Io { path, source: err }
        }
    }

    /// Returns the error kind as a string matching the variant name.
    pub fn kind(&self) -> &'static str {
        match self {
            AnalyzerError::ResourceNotFound { .. } => "ResourceNotFound",
            AnalyzerError::MissingColumn(_) => "MissingColumn",
            AnalyzerError::MalformedLine { .. } => "MalformedLine",
            AnalyzerError::Io { .. } => "Io",
            AnalyzerError::Csv(_) => "Csv",
            AnalyzerError::WriteFailure { .. } => "WriteFailure",
            AnalyzerError::Config(_) => "Config",
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AnalyzerError::ResourceNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
