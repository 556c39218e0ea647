//! Rhythm CLI - Command-line interface for Synheart Rhythm
//!
//! Commands:
//! - analyze: Run the full pipeline on a CSV or JSON recording
//! - validate: Check timestamp parsing without running the pipeline
//! - config: Print the effective configuration

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use synheart_rhythm::timestamp::TimestampNormalizer;
use synheart_rhythm::{
    ColumnMap, ComputeError, PipelineConfig, RawRecording, RecordingLoader, ReportEncoder,
    RhythmProcessor, PRODUCER_NAME, RHYTHM_VERSION,
};

/// Rhythm - Actigraphy regularization and circadian rhythm metrics
#[derive(Parser)]
#[command(name = "rhythm")]
#[command(author = "Synheart AI Inc")]
#[command(version = RHYTHM_VERSION)]
#[command(about = "Compute L5/M10, IS and IV from wrist actigraphy", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and print the JSON report
    Analyze {
        #[command(flatten)]
        input: InputArgs,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Light threshold in lux (overrides the configuration)
        #[arg(long)]
        light_threshold: Option<f64>,

        /// Include daily and 48-hour matrices in the report
        #[arg(long)]
        matrices: bool,
    },

    /// Parse timestamps only and report dropped rows
    Validate {
        #[command(flatten)]
        input: InputArgs,

        /// Pipeline configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the configuration as JSON
    Config {
        /// Configuration file to load and validate (defaults otherwise)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(clap::Args)]
struct InputArgs {
    /// Input file path (use - for stdin)
    input: PathBuf,

    /// Input format
    #[arg(long, default_value = "auto")]
    format: InputFormat,

    /// Timestamp column name (CSV)
    #[arg(long, default_value = "timestamp")]
    timestamp_column: String,

    /// Activity column name (CSV)
    #[arg(long, default_value = "activity")]
    activity_column: String,

    /// Light column name (CSV)
    #[arg(long, default_value = "light")]
    light_column: String,

    /// Temperature column name (CSV); ignored when absent from the header
    #[arg(long, default_value = "temperature")]
    temperature_column: String,
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// Guess from the file extension or the first character
    Auto,
    /// Comma-separated values with a header row
    Csv,
    /// Serialized recording object
    Json,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), RhythmCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            light_threshold,
            matrices,
        } => cmd_analyze(
            &input,
            &output,
            config.as_deref(),
            light_threshold,
            matrices,
        ),

        Commands::Validate {
            input,
            config,
            json,
        } => cmd_validate(&input, config.as_deref(), json),

        Commands::Config { config } => cmd_config(config.as_deref()),
    }
}

fn cmd_analyze(
    input: &InputArgs,
    output: &Path,
    config_path: Option<&Path>,
    light_threshold: Option<f64>,
    matrices: bool,
) -> Result<(), RhythmCliError> {
    let mut config = load_config(config_path)?;
    if let Some(lux) = light_threshold {
        config = config.with_light_threshold(lux);
    }

    let mut recording = read_recording(input)?;
    // The command-line threshold wins over one embedded in the recording
    if light_threshold.is_some() {
        recording.light_threshold_lux = None;
    }

    let processor = RhythmProcessor::with_config(config)?
        .with_encoder(ReportEncoder::new().with_matrices(matrices));
    let report = processor.process_to_json(&recording)?;

    if output.to_string_lossy() == "-" {
        println!("{}", report);
    } else {
        fs::write(output, report)?;
    }

    Ok(())
}

fn cmd_validate(
    input: &InputArgs,
    config_path: Option<&Path>,
    json: bool,
) -> Result<(), RhythmCliError> {
    let config = load_config(config_path)?;
    let recording = read_recording(input)?;
    let normalized = TimestampNormalizer::normalize(&recording, &config)?;
    let series = &normalized.series;

    let report = ValidationReport {
        total_rows: normalized.total_rows,
        valid_rows: series.len(),
        dropped_rows: normalized.dropped_rows.clone(),
        first_timestamp: series.timestamps.first().map(|t| t.to_string()),
        last_timestamp: series.timestamps.last().map(|t| t.to_string()),
        has_temperature: series.temperature.is_some(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total rows:   {}", report.total_rows);
        println!("Valid rows:   {}", report.valid_rows);
        println!("Dropped rows: {}", report.dropped_rows.len());
        if let (Some(first), Some(last)) = (&report.first_timestamp, &report.last_timestamp) {
            println!("Span:         {} .. {}", first, last);
        }
        println!(
            "Temperature:  {}",
            if report.has_temperature { "present" } else { "absent" }
        );

        if !report.dropped_rows.is_empty() {
            println!("\nUnparseable rows (0-based):");
            for row in report.dropped_rows.iter().take(20) {
                println!("  - {}", row);
            }
            if report.dropped_rows.len() > 20 {
                println!("  ... and {} more", report.dropped_rows.len() - 20);
            }
        }
    }

    if report.dropped_rows.is_empty() {
        Ok(())
    } else {
        Err(RhythmCliError::ValidationFailed(report.dropped_rows.len()))
    }
}

fn cmd_config(config_path: Option<&Path>) -> Result<(), RhythmCliError> {
    let config = load_config(config_path)?;
    println!("{}", config.to_json()?);
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, RhythmCliError> {
    match path {
        Some(path) => Ok(PipelineConfig::from_json(&fs::read_to_string(path)?)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn read_recording(input: &InputArgs) -> Result<RawRecording, RhythmCliError> {
    let from_stdin = input.input.to_string_lossy() == "-";
    let data = if from_stdin {
        if atty::is(atty::Stream::Stdin) {
            return Err(RhythmCliError::InteractiveStdin);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        buffer
    } else {
        fs::read_to_string(&input.input)?
    };

    let is_json = match input.format {
        InputFormat::Json => true,
        InputFormat::Csv => false,
        InputFormat::Auto => {
            let by_extension = input
                .input
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case("json"));
            by_extension.unwrap_or_else(|| data.trim_start().starts_with('{'))
        }
    };

    let mut recording = if is_json {
        RecordingLoader::from_json(&data)?
    } else {
        let columns = ColumnMap {
            timestamp: input.timestamp_column.clone(),
            activity: input.activity_column.clone(),
            light: input.light_column.clone(),
            temperature: Some(input.temperature_column.clone()),
        };
        RecordingLoader::from_csv_reader(data.as_bytes(), &columns)?
    };

    if recording.source.is_none() && !from_stdin {
        recording.source = Some(input.input.display().to_string());
    }
    Ok(recording)
}

// Error types

#[derive(Debug)]
enum RhythmCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    InteractiveStdin,
    ValidationFailed(usize),
}

impl From<io::Error> for RhythmCliError {
    fn from(e: io::Error) -> Self {
        RhythmCliError::Io(e)
    }
}

impl From<ComputeError> for RhythmCliError {
    fn from(e: ComputeError) -> Self {
        RhythmCliError::Compute(e)
    }
}

impl From<serde_json::Error> for RhythmCliError {
    fn from(e: serde_json::Error) -> Self {
        RhythmCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RhythmCliError> for CliError {
    fn from(e: RhythmCliError) -> Self {
        match e {
            RhythmCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RhythmCliError::Compute(e) => CliError {
                code: e.code().to_string(),
                hint: compute_hint(&e).map(str::to_string),
                message: e.to_string(),
            },
            RhythmCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RhythmCliError::InteractiveStdin => CliError {
                code: "NO_INPUT".to_string(),
                message: "Refusing to read a recording from an interactive terminal".to_string(),
                hint: Some(format!(
                    "Pipe a file into {} or pass a path instead of -",
                    PRODUCER_NAME
                )),
            },
            RhythmCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} rows have unparseable timestamps", count),
                hint: Some("Those rows are dropped by 'rhythm analyze'".to_string()),
            },
        }
    }
}

fn compute_hint(e: &ComputeError) -> Option<&'static str> {
    match e {
        ComputeError::ParseError { .. } => {
            Some("Run 'rhythm validate' to see which timestamps fail to parse")
        }
        ComputeError::SamplingError(_) => Some("Timestamps must not all be identical"),
        ComputeError::InsufficientData(_) => Some("The recording must span a whole day"),
        ComputeError::ConfigurationError(_) => {
            Some("Check column names and configuration values")
        }
        ComputeError::CsvError(_) => Some("Check CSV syntax and header row"),
        ComputeError::JsonError(_) | ComputeError::EncodingError(_) => None,
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_rows: usize,
    valid_rows: usize,
    dropped_rows: Vec<usize>,
    first_timestamp: Option<String>,
    last_timestamp: Option<String>,
    has_temperature: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rhythm-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    fn input_args(path: PathBuf) -> InputArgs {
        InputArgs {
            input: path,
            format: InputFormat::Csv,
            timestamp_column: "timestamp".to_string(),
            activity_column: "activity".to_string(),
            light_column: "light".to_string(),
            temperature_column: "temperature".to_string(),
        }
    }

    #[test]
    fn test_validate_honors_config_file() {
        let mut csv = String::from("timestamp,activity,light\n");
        for minute in 0..5 {
            csv.push_str(&format!("2024-01-15 10:{:02},1,0\n", minute));
        }
        let input = input_args(write_temp("validate.csv", &csv));
        let config = write_temp("validate-config.json", r#"{"min_valid_rows": 3}"#);

        // Five rows fall short of the default floor of ten
        let default_result = cmd_validate(&input, None, true);
        assert!(matches!(
            default_result,
            Err(RhythmCliError::Compute(ComputeError::ParseError {
                valid: 5,
                required: 10
            }))
        ));

        assert!(cmd_validate(&input, Some(&config), true).is_ok());
    }
}
