//! Job runner: schema + table in, minified JSON out.
//!
//! Jobs run one after another in declaration order. Each job returns an
//! explicit [`JobOutcome`]; a skipped job never stops the ones after it.
//!
//! # Example
//!
//! ```rust,ignore
//! use infraload::{RunConfig, Runner};
//!
//! let runner = Runner::new(RunConfig::with_root("."))?;
//! let report = runner.run();
//! println!("{} converted, {} skipped", report.converted_count(), report.skipped_count());
//! ```

use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::projector::{convert, Conversion};
use crate::config::{JobSpec, RunConfig};
use crate::error::{ConfigResult, JobError, JobResult};
use crate::logs::{log_success, log_warning};
use crate::parser::TableReader;
use crate::schema::load_schema;

/// How a job ended
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum JobStatus {
    Converted {
        output: PathBuf,
        records: usize,
        /// Declared mappings, dropped ones included, not counting `id`
        fields: usize,
        encoding: String,
        /// Declared source columns not found in the table
        dropped: Vec<String>,
    },
    Skipped {
        kind: String,
        reason: String,
    },
}

/// Result of one job
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobOutcome {
    pub schema: PathBuf,
    pub source: PathBuf,
    #[serde(flatten)]
    pub status: JobStatus,
    /// Every warning emitted for this job
    pub warnings: Vec<String>,
}

impl JobOutcome {
    pub fn is_converted(&self) -> bool {
        matches!(self.status, JobStatus::Converted { .. })
    }
}

/// Outcomes of a whole run, in job order
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    pub jobs: Vec<JobOutcome>,
}

impl RunReport {
    pub fn converted_count(&self) -> usize {
        self.jobs.iter().filter(|j| j.is_converted()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.jobs.len() - self.converted_count()
    }

    /// Write the report as pretty JSON
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
    }
}

/// Runs the configured jobs
#[derive(Debug)]
pub struct Runner {
    config: RunConfig,
    reader: TableReader,
}

impl Runner {
    /// Fails only when the reader cannot be built (e.g. an encoding label has
    /// no decoder). Nothing has run at that point.
    pub fn new(config: RunConfig) -> ConfigResult<Self> {
        let reader = TableReader::new(&config.reader)?;
        Ok(Self { config, reader })
    }

    /// Run every job in order
    pub fn run(&self) -> RunReport {
        RunReport {
            jobs: self.config.jobs.iter().map(|job| self.run_job(job)).collect(),
        }
    }

    /// Run one job and report it on the console
    pub fn run_job(&self, job: &JobSpec) -> JobOutcome {
        let schema_path = self.config.schema_path(job);
        let source_path = self.config.source_path(job);
        let mut warnings = Vec::new();

        let status = match self.execute(&schema_path, &source_path, &mut warnings) {
            Ok(status) => status,
            Err(e) => {
                let message = e.to_string();
                log_warning(&message);
                warnings.push(message.clone());
                JobStatus::Skipped { kind: e.kind().to_string(), reason: message }
            }
        };

        JobOutcome { schema: schema_path, source: source_path, status, warnings }
    }

    fn execute(
        &self,
        schema_path: &Path,
        source_path: &Path,
        warnings: &mut Vec<String>,
    ) -> JobResult<JobStatus> {
        let schema = load_schema(schema_path).map_err(|source| JobError::SchemaInvalid {
            path: schema_path.to_path_buf(),
            source,
        })?;

        let table = self.reader.read_path(source_path)?;
        let Conversion { records, dropped, fields } = convert(&schema, &table);

        if !dropped.is_empty() {
            let message = format!(
                "{}: columns not found in CSV and will be skipped: [{}]",
                source_path.display(),
                dropped.join(", ")
            );
            log_warning(&message);
            warnings.push(message);
        }

        let output = write_records(&self.config.output_dir, &schema.output_file_name(), &records)?;
        log_success(format!(
            "{}  records={}  fields={}(+id)",
            output.display(),
            records.len(),
            fields
        ));

        Ok(JobStatus::Converted {
            output,
            records: records.len(),
            fields,
            encoding: table.encoding().to_string(),
            dropped,
        })
    }
}

/// Write records as compact JSON, creating `dir` if needed.
///
/// Non-ASCII text is written as-is; there is no trailing newline.
pub fn write_records(dir: &Path, file_name: &str, records: &[Value]) -> JobResult<PathBuf> {
    let path = dir.join(file_name);
    let failed = |message: String| JobError::OutputFailed { path: path.clone(), message };

    fs::create_dir_all(dir).map_err(|e| failed(e.to_string()))?;
    let file = File::create(&path).map_err(|e| failed(e.to_string()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, records).map_err(|e| failed(e.to_string()))?;
    writer.flush().map_err(|e| failed(e.to_string()))?;

    Ok(path)
}
