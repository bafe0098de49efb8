//! Conversion schema definition and loading.
//!
//! A schema describes one conversion job: which source columns map to which
//! output fields, the identifier prefix, and the output file name.
//!
//! ```yaml
//! version: 2
//! output_basename: bridges
//! id_prefix: BR
//! columns:
//!   - { source: Name, as: name }
//!   - { source: Length_m, as: length_m }
//! ```
//!
//! `version` must be 2; `2.0` is the same number and is accepted. When two
//! mappings share an `as` name, the field stays where it was first declared
//! and the later mapping's value wins.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{SchemaError, SchemaResult};

/// Schema version this engine understands
pub const SUPPORTED_VERSION: i64 = 2;

/// Output field reserved for the generated identifier
pub const ID_FIELD: &str = "id";

/// One source column to output field mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Column name in the source table header
    pub source: String,
    /// Field name in the output record
    #[serde(rename = "as")]
    pub target: String,
}

impl ColumnMapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self { source: source.into(), target: target.into() }
    }
}

/// A validated conversion schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Schema {
    pub version: i64,
    /// Output is written to `<output_basename>.min.json`
    pub output_basename: String,
    /// Identifiers are `<id_prefix>-000001`, `<id_prefix>-000002`, ...
    pub id_prefix: String,
    /// Declared mappings, in output field order
    pub columns: Vec<ColumnMapping>,
}

/// Schema body as written on disk. `version` is checked separately, before
/// any other field is trusted.
#[derive(Debug, Deserialize)]
struct RawSchema {
    output_basename: String,
    id_prefix: String,
    columns: Vec<ColumnMapping>,
}

impl Schema {
    /// Parse and validate a schema from YAML text
    pub fn from_yaml(content: &str) -> SchemaResult<Self> {
        // Version first: an old schema may not even have today's fields
        let document: serde_yaml::Value = serde_yaml::from_str(content)?;
        check_version(document.get("version"))?;

        let raw: RawSchema = serde_yaml::from_str(content)?;
        let schema = Schema {
            version: SUPPORTED_VERSION,
            output_basename: raw.output_basename,
            id_prefix: raw.id_prefix,
            columns: raw.columns,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Output file name, e.g. `bridges.min.json`
    pub fn output_file_name(&self) -> String {
        format!("{}.min.json", self.output_basename)
    }

    fn validate(&self) -> SchemaResult<()> {
        match self.columns.iter().find(|c| c.target == ID_FIELD) {
            Some(column) => Err(SchemaError::ReservedField(column.target.clone())),
            None => Ok(()),
        }
    }
}

fn check_version(version: Option<&serde_yaml::Value>) -> SchemaResult<()> {
    let supported = version.is_some_and(|v| {
        v.as_i64() == Some(SUPPORTED_VERSION) || v.as_f64() == Some(SUPPORTED_VERSION as f64)
    });
    if supported {
        return Ok(());
    }
    Err(SchemaError::UnsupportedVersion {
        found: match version {
            Some(v) => serde_yaml::to_string(v)
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|_| "?".to_string()),
            None => "(none)".to_string(),
        },
        expected: SUPPORTED_VERSION,
    })
}

/// Load and validate a schema file
pub fn load_schema(path: impl AsRef<Path>) -> SchemaResult<Schema> {
    let content = fs::read_to_string(path.as_ref())?;
    Schema::from_yaml(&content)
}
