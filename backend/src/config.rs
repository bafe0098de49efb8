//! Run configuration: directories, the job list and table reader options.
//!
//! The defaults reproduce the conventional project layout:
//!
//! ```text
//! <root>/tools/schema_v2.<category>.yaml   schema files
//! <root>/data/raw/<Category>.csv           source tables
//! <root>/docs/data/<basename>.min.json     output
//! ```
//!
//! A YAML manifest can override any of it:
//!
//! ```yaml
//! output_dir: public/data
//! encodings: [utf-8-sig, cp949, utf-8]
//! jobs:
//!   - schema: schema_v2.bridges.yaml
//!     source: Bridges.csv
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, ConfigResult};

/// Candidate encodings, tried in order: BOM-aware UTF-8, Korean legacy code
/// pages, then plain UTF-8.
pub const DEFAULT_ENCODINGS: &[&str] = &["utf-8-sig", "cp949", "euc-kr", "utf-8"];

/// Cell spellings treated as a missing value.
pub const DEFAULT_NULL_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

const DEFAULT_SCHEMA_DIR: &str = "tools";
const DEFAULT_SOURCE_DIR: &str = "data/raw";
const DEFAULT_OUTPUT_DIR: &str = "docs/data";

/// Options for the table reader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Encoding labels, tried in order
    pub encodings: Vec<String>,
    /// Field delimiter
    pub delimiter: u8,
    /// Raw cell values stored as absent
    pub null_markers: Vec<String>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            encodings: DEFAULT_ENCODINGS.iter().map(|s| s.to_string()).collect(),
            delimiter: b',',
            null_markers: DEFAULT_NULL_MARKERS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// One schema/table pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSpec {
    /// Schema file, relative to the schema directory unless absolute
    pub schema: PathBuf,
    /// Source table, relative to the source directory unless absolute
    pub source: PathBuf,
}

impl JobSpec {
    pub fn new(schema: impl Into<PathBuf>, source: impl Into<PathBuf>) -> Self {
        Self { schema: schema.into(), source: source.into() }
    }
}

/// Everything a run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub schema_dir: PathBuf,
    pub source_dir: PathBuf,
    pub output_dir: PathBuf,
    pub jobs: Vec<JobSpec>,
    pub reader: ReaderOptions,
}

impl RunConfig {
    /// Conventional layout under `root` with the built-in job list
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            schema_dir: root.join(DEFAULT_SCHEMA_DIR),
            source_dir: root.join(DEFAULT_SOURCE_DIR),
            output_dir: root.join(DEFAULT_OUTPUT_DIR),
            jobs: default_jobs(),
            reader: ReaderOptions::default(),
        }
    }

    /// Load a manifest and layer it over the conventional layout.
    ///
    /// Relative paths in the manifest resolve against its own directory.
    pub fn from_manifest(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::ManifestIo {
            path: path.to_path_buf(),
            source,
        })?;
        let manifest: Manifest =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::ManifestParse {
                path: path.to_path_buf(),
                source,
            })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        manifest.apply(Self::with_root(base), base)
    }

    pub fn schema_path(&self, job: &JobSpec) -> PathBuf {
        self.schema_dir.join(&job.schema)
    }

    pub fn source_path(&self, job: &JobSpec) -> PathBuf {
        self.source_dir.join(&job.source)
    }
}

/// The bridges, tunnels and underpasses inventories
pub fn default_jobs() -> Vec<JobSpec> {
    vec![
        JobSpec::new("schema_v2.bridges.yaml", "Bridges.csv"),
        JobSpec::new("schema_v2.tunnels.yaml", "Tunnels.csv"),
        JobSpec::new("schema_v2.underpasses.yaml", "Underpasses.csv"),
    ]
}

/// YAML manifest; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub schema_dir: Option<PathBuf>,
    #[serde(default)]
    pub source_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub jobs: Option<Vec<JobSpec>>,
    #[serde(default)]
    pub encodings: Option<Vec<String>>,
    #[serde(default)]
    pub delimiter: Option<String>,
    #[serde(default)]
    pub null_markers: Option<Vec<String>>,
}

impl Manifest {
    fn apply(self, mut config: RunConfig, base: &Path) -> ConfigResult<RunConfig> {
        if let Some(dir) = self.schema_dir {
            config.schema_dir = base.join(dir);
        }
        if let Some(dir) = self.source_dir {
            config.source_dir = base.join(dir);
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = base.join(dir);
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
        if let Some(encodings) = self.encodings {
            config.reader.encodings = encodings;
        }
        if let Some(delimiter) = self.delimiter {
            config.reader.delimiter = parse_delimiter(&delimiter)?;
        }
        if let Some(markers) = self.null_markers {
            config.reader.null_markers = markers;
        }
        Ok(config)
    }
}

/// Parse a delimiter given as a single character, or `\t` / `tab`
pub fn parse_delimiter(s: &str) -> ConfigResult<u8> {
    match s {
        "\\t" | "tab" | "TAB" => Ok(b'\t'),
        _ => {
            let bytes = s.as_bytes();
            if bytes.len() == 1 && bytes[0].is_ascii() {
                Ok(bytes[0])
            } else {
                Err(ConfigError::InvalidDelimiter(s.to_string()))
            }
        }
    }
}
