//! Infraload CLI - convert inventory CSV files to minified JSON
//!
//! # Main Command
//!
//! ```bash
//! infraload convert                        # Run the built-in jobs under ./
//! infraload convert --root site            # ... under ./site
//! infraload convert --manifest jobs.yaml   # Jobs and directories from a manifest
//! ```
//!
//! # Debug Commands
//!
//! ```bash
//! infraload parse Bridges.csv              # Read a CSV with encoding fallback, print JSON
//! infraload check schema_v2.bridges.yaml   # Validate a schema file
//! ```

use clap::{Parser, Subcommand};
use infraload::config::parse_delimiter;
use infraload::logs::{log_error, log_info};
use infraload::{load_schema, ReaderOptions, RunConfig, Runner, TableReader};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "infraload")]
#[command(about = "Convert inventory CSV files to minified JSON using schema files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every configured conversion job
    Convert {
        /// Project root holding tools/, data/raw/ and docs/data/
        #[arg(short, long, env = "INFRALOAD_ROOT", default_value = ".")]
        root: PathBuf,

        /// YAML manifest with jobs and directories (overrides --root)
        #[arg(short, long, env = "INFRALOAD_MANIFEST")]
        manifest: Option<PathBuf>,

        /// Output directory (default: <root>/docs/data)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Parse a CSV file and output JSON
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (default: ',')
        #[arg(short, long)]
        delimiter: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a schema file
    Check {
        /// Schema YAML file
        schema: PathBuf,
    },
}

fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            root,
            manifest,
            output_dir,
            report,
        } => cmd_convert(&root, manifest.as_deref(), output_dir, report.as_deref()),

        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter.as_deref(), output.as_deref()),

        Commands::Check { schema } => cmd_check(&schema),
    };

    if let Err(e) = result {
        log_error(format!("Error: {}", e));
        std::process::exit(1);
    }
}

fn cmd_convert(
    root: &Path,
    manifest: Option<&Path>,
    output_dir: Option<PathBuf>,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match manifest {
        Some(path) => RunConfig::from_manifest(path)?,
        None => RunConfig::with_root(root),
    };
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    // Encoding support is checked here, before any job runs
    let runner = Runner::new(config)?;
    let report = runner.run();

    log_info(format!(
        "{} of {} jobs converted, {} skipped",
        report.converted_count(),
        report.jobs.len(),
        report.skipped_count()
    ));

    if let Some(path) = report_path {
        report.write_json(path)?;
        eprintln!("Report written to: {}", path.display());
    }

    Ok(())
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Parsing CSV: {}", input.display());

    let mut options = ReaderOptions::default();
    if let Some(d) = delimiter {
        options.delimiter = parse_delimiter(d)?;
    }
    let table = TableReader::new(&options)?.read_path(input)?;

    eprintln!("   Encoding: {}", table.encoding());
    eprintln!("   Columns: {}", table.headers().join(", "));
    eprintln!("Parsed {} records", table.len());

    let json = serde_json::to_string_pretty(&table.to_json())?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_check(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let schema = load_schema(path)?;

    println!("Schema: {}", path.display());
    println!("   Output: {}", schema.output_file_name());
    println!("   Id prefix: {}", schema.id_prefix);
    println!("   Columns ({}):", schema.columns.len());
    for column in &schema.columns {
        println!("     {} -> {}", column.source, column.target);
    }

    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
