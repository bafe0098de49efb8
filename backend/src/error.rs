//! Error types for the Infraload conversion pipeline.
//!
//! - [`CsvError`] - a single decode/parse attempt failed
//! - [`ConfigError`] - run configuration errors (fatal)
//! - [`SchemaError`] - schema file rejected (job is skipped)
//! - [`JobError`] - reason a job was skipped
//!
//! Only [`ConfigError`] aborts a run. Everything else is reported per job
//! and the remaining jobs still execute.

use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// CSV Parsing Errors
// =============================================================================

/// Errors from one attempt at decoding and parsing a table.
#[derive(Debug, Error)]
pub enum CsvError {
    /// The bytes are not valid in the candidate encoding.
    #[error("bytes are not valid {0}")]
    EncodingError(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format: {0}")]
    ParseError(String),

    /// A data row has more fields than the header.
    #[error("Line {line}: expected {expected} fields, saw {found}")]
    RowTooWide {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// A quoted field is still open at end of input.
    #[error("Line {0}: quoted field is never closed")]
    UnterminatedQuote(u64),

    /// Empty file.
    #[error("CSV file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in CSV")]
    NoHeaders,
}

impl From<csv::Error> for CsvError {
    fn from(e: csv::Error) -> Self {
        CsvError::ParseError(e.to_string())
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

/// Errors in the run configuration. These abort the run before any job.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A candidate encoding cannot be provided by the decoder library.
    #[error("Encoding '{0}' is not supported by this build")]
    DependencyMissing(String),

    /// The candidate encoding list is empty.
    #[error("At least one candidate encoding is required")]
    NoEncodings,

    /// Delimiter is not a single ASCII character.
    #[error("Invalid delimiter '{0}': expected a single ASCII character")]
    InvalidDelimiter(String),

    /// Manifest could not be read.
    #[error("Cannot read manifest {path}: {source}")]
    ManifestIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Manifest is not valid YAML for the expected shape.
    #[error("Invalid manifest {path}: {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

// =============================================================================
// Schema Errors
// =============================================================================

/// A schema file that cannot drive a conversion job.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema file could not be read.
    #[error("Cannot read schema: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML syntax error or missing required field.
    #[error("Malformed schema: {0}")]
    Malformed(#[from] serde_yaml::Error),

    /// Version is missing or not the one this engine understands.
    #[error("unsupported schema version {found} (expected {expected})")]
    UnsupportedVersion { found: String, expected: i64 },

    /// A mapping targets the generated `id` field.
    #[error("Field name '{0}' is reserved for the generated identifier")]
    ReservedField(String),
}

// =============================================================================
// Job Errors
// =============================================================================

/// Why a single job was skipped.
#[derive(Debug, Error)]
pub enum JobError {
    /// Schema rejected.
    #[error("{path}: {source}")]
    SchemaInvalid {
        path: PathBuf,
        #[source]
        source: SchemaError,
    },

    /// Source table does not exist.
    #[error("missing CSV: {0}")]
    SourceMissing(PathBuf),

    /// Source table exists but no candidate encoding could parse it.
    #[error("{path}: unreadable with every candidate encoding (detected: {detected}): {source}")]
    SourceUnreadable {
        path: PathBuf,
        detected: String,
        #[source]
        source: CsvError,
    },

    /// Source table exists but could not be read from disk.
    #[error("Cannot read {path}: {source}")]
    SourceIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output could not be serialized or written.
    #[error("Cannot write {path}: {message}")]
    OutputFailed { path: PathBuf, message: String },
}

impl JobError {
    /// Short machine-readable kind, used in run reports.
    pub fn kind(&self) -> &'static str {
        match self {
            JobError::SchemaInvalid { .. } => "schemaInvalid",
            JobError::SourceMissing(_) => "sourceMissing",
            JobError::SourceUnreadable { .. } | JobError::SourceIo { .. } => "sourceUnreadable",
            JobError::OutputFailed { .. } => "outputFailed",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for a single table parse attempt.
pub type CsvResult<T> = Result<T, CsvError>;

/// Result type for configuration.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Result type for schema loading.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for job steps.
pub type JobResult<T> = Result<T, JobError>;
