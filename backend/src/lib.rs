//! # Infraload - schema-driven CSV to JSON conversion
//!
//! Infraload turns irregular survey/inventory tables (bridges, tunnels,
//! underpasses, ...) into uniform, minified JSON documents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV File   │────▶│   Parser    │────▶│  Projector  │────▶│  .min.json  │
//! │ (UTF8/CP949)│     │ (enc. list) │     │ (schema+id) │     │  (array)    │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                            ▲                   ▲
//!                            │             ┌─────────────┐
//!                            │             │ Schema YAML │
//!                            │             └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use infraload::{RunConfig, Runner};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let report = Runner::new(RunConfig::with_root("."))?.run();
//!     println!("{} jobs converted", report.converted_count());
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types
//! - [`logs`] - Console log entries
//! - [`config`] - Run configuration and job manifest
//! - [`parser`] - Table reader with encoding fallback
//! - [`schema`] - Schema loading and validation
//! - [`transform`] - Projection, identifiers and the job runner

// Core modules
pub mod config;
pub mod error;
pub mod logs;

// Inputs
pub mod parser;
pub mod schema;

// Transformation
pub mod transform;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{JobSpec, Manifest, ReaderOptions, RunConfig};

pub use error::{ConfigError, CsvError, JobError, SchemaError};

pub use parser::{detect_encoding, EncodingCandidate, Row, Table, TableReader};

pub use schema::{load_schema, ColumnMapping, Schema, SUPPORTED_VERSION};

pub use transform::{
    convert,
    write_records,
    Conversion,
    IdAllocator,
    JobOutcome,
    JobStatus,
    Projection,
    RunReport,
    Runner,
};
