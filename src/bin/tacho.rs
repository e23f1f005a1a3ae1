//! Tacho CLI - Command-line interface for Tacho Flux
//!
//! Commands:
//! - analyze: Detect infractions and score a driver's period
//! - validate: Classify input rows without running the rules
//! - rules: Print the rule definition table
//! - doctor: Diagnose configuration and environment

use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use tacho_flux::adapters::{ActivityLogAdapter, RecordSource, SourceKind, SpreadsheetAdapter};
use tacho_flux::rules::RuleTable;
use tacho_flux::types::RawRecord;
use tacho_flux::{
    AnalysisConfig, ComplianceAnalyzer, ComputeError, ValidationReport, FLUX_VERSION,
    PRODUCER_NAME,
};

/// Tacho - Driving and rest time compliance for tachograph records
#[derive(Parser)]
#[command(name = "tacho")]
#[command(version = FLUX_VERSION)]
#[command(about = "Check tachograph records against EU 561/2006 limits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect infractions and compute the compliance score
    Analyze {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format (guessed from the file extension when omitted)
        #[arg(long)]
        format: Option<InputFormat>,

        /// Timezone used to bucket activities into days (IANA format)
        #[arg(long)]
        timezone: Option<String>,

        /// Year assumed for day labels without one
        #[arg(long)]
        fallback_year: Option<i32>,

        /// Skip the year-rollover correction of infraction dates
        #[arg(long)]
        no_date_correction: bool,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Pretty-print the report
        #[arg(long)]
        pretty: bool,
    },

    /// Classify input rows and report unparsable time cells
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Input format (guessed from the file extension when omitted)
        #[arg(long)]
        format: Option<InputFormat>,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the rule definition table
    Rules {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Diagnose configuration and environment
    Doctor {
        /// JSON configuration file to check
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum InputFormat {
    /// JSON array of spreadsheet rows
    Spreadsheet,
    /// Decoded driver card or vehicle unit activity log
    ActivityLog,
}

impl From<SourceKind> for InputFormat {
    fn from(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Spreadsheet => InputFormat::Spreadsheet,
            SourceKind::ActivityLog => InputFormat::ActivityLog,
        }
    }
}

fn main() -> ExitCode {
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

fn run(cli: Cli) -> Result<(), TachoCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            format,
            timezone,
            fallback_year,
            no_date_correction,
            config,
            pretty,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(tz) = timezone {
                config.timezone = tz;
            }
            if fallback_year.is_some() {
                config.fallback_year = fallback_year;
            }
            if no_date_correction {
                config.correct_dates = false;
            }
            config.validate()?;
            init_tracing(&config.log_level);

            cmd_analyze(&input, format, config, pretty)
        }

        Commands::Validate {
            input,
            format,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            init_tracing(&config.log_level);
            cmd_validate(&input, format, &config, json)
        }

        Commands::Rules { json } => cmd_rules(json),

        Commands::Doctor { config, json } => cmd_doctor(config.as_deref(), json),
    }
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig, TachoCliError> {
    let config = match path {
        Some(path) => AnalysisConfig::load_from_file(path)?,
        None => AnalysisConfig::load()?,
    };
    Ok(config)
}

/// Install the stderr log subscriber; `RUST_LOG` wins over the configured level
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .compact()
        .with_ansi(false)
        .try_init();
}

fn read_input(input: &Path) -> Result<String, TachoCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn resolve_format(input: &Path, format: Option<InputFormat>) -> InputFormat {
    format
        .or_else(|| SourceKind::from_path(input).map(InputFormat::from))
        .unwrap_or(InputFormat::Spreadsheet)
}

fn cmd_analyze(
    input: &Path,
    format: Option<InputFormat>,
    config: AnalysisConfig,
    pretty: bool,
) -> Result<(), TachoCliError> {
    let input_data = read_input(input)?;
    let analyzer = ComplianceAnalyzer::new(config);

    let report = match resolve_format(input, format) {
        InputFormat::Spreadsheet => analyzer.analyze_spreadsheet(&input_data)?,
        InputFormat::ActivityLog => analyzer.analyze_activity_log(&input_data)?,
    };

    println!("{}", report.to_json(pretty)?);
    Ok(())
}

fn cmd_validate(
    input: &Path,
    format: Option<InputFormat>,
    config: &AnalysisConfig,
    json: bool,
) -> Result<(), TachoCliError> {
    let input_data = read_input(input)?;

    let records: Vec<RawRecord> = match resolve_format(input, format) {
        InputFormat::Spreadsheet => SpreadsheetAdapter.records(&input_data)?,
        InputFormat::ActivityLog => ActivityLogAdapter::new(config.tz()?).records(&input_data)?,
    };
    let report = ValidationReport::from_records(&records);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total records:   {}", report.total_records);
        println!("Day rows:        {}", report.days);
        println!("Week rows:       {}", report.weeks);
        println!("Period rows:     {}", report.periods);
        println!("Month rows:      {}", report.months);
        println!("Quarter rows:    {}", report.quarters);
        println!("Ignored rows:    {}", report.ignored);
        println!("Bad time cells:  {}", report.unparsable_time_cells);
        if report.numeric_time_cells > 0 {
            println!(
                "  {} of them are numbers; export times as HH:MM text, they count as 0",
                report.numeric_time_cells
            );
        }
    }

    if report.days == 0 && report.weeks == 0 {
        Err(TachoCliError::NothingToAnalyze)
    } else {
        Ok(())
    }
}

fn cmd_rules(json: bool) -> Result<(), TachoCliError> {
    let definitions = RuleTable::standard().definitions();

    if json {
        println!("{}", serde_json::to_string_pretty(&definitions)?);
    } else {
        println!("Rule Table");
        println!("==========");
        for rule in definitions {
            println!(
                "  {:<24} {:<14} {:<16} {}",
                rule.code.as_str(),
                rule.threshold.to_string(),
                rule.article,
                rule.label
            );
        }
    }
    Ok(())
}

fn cmd_doctor(config_path: Option<&Path>, json: bool) -> Result<(), TachoCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "flux_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Flux version {}", FLUX_VERSION),
    });

    match load_config(config_path) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Ok,
                message: format!(
                    "Configuration loaded (date correction {}, fallback year {})",
                    if config.correct_dates { "on" } else { "off" },
                    config.effective_fallback_year()
                ),
            });
            checks.push(DoctorCheck {
                name: "timezone".to_string(),
                status: CheckStatus::Ok,
                message: format!("Days bucketed in {}", config.timezone),
            });
        }
        Err(e) => {
            checks.push(DoctorCheck {
                name: "config".to_string(),
                status: CheckStatus::Error,
                message: CliError::from(e).message,
            });
        }
    }

    let rules = RuleTable::standard();
    checks.push(if rules.len() == tacho_flux::RuleCode::ALL.len() {
        DoctorCheck {
            name: "rules".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} rules loaded", rules.len()),
        }
    } else {
        DoctorCheck {
            name: "rules".to_string(),
            status: CheckStatus::Warning,
            message: format!(
                "{} of {} rules loaded, missing checks are skipped",
                rules.len(),
                tacho_flux::RuleCode::ALL.len()
            ),
        }
    });

    let stdin_check = if atty::is(atty::Stream::Stdin) {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a TTY (pass --input <file>)".to_string(),
        }
    } else {
        DoctorCheck {
            name: "stdin".to_string(),
            status: CheckStatus::Ok,
            message: "stdin is a pipe (--input - ready)".to_string(),
        }
    };
    checks.push(stdin_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: FLUX_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Tacho Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");
        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(TachoCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum TachoCliError {
    Io(io::Error),
    Compute(ComputeError),
    Json(serde_json::Error),
    NothingToAnalyze,
    DoctorFailed,
}

impl From<io::Error> for TachoCliError {
    fn from(e: io::Error) -> Self {
        TachoCliError::Io(e)
    }
}

impl From<ComputeError> for TachoCliError {
    fn from(e: ComputeError) -> Self {
        match e {
            ComputeError::Io(e) => TachoCliError::Io(e),
            other => TachoCliError::Compute(other),
        }
    }
}

impl From<serde_json::Error> for TachoCliError {
    fn from(e: serde_json::Error) -> Self {
        TachoCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TachoCliError> for CliError {
    fn from(e: TachoCliError) -> Self {
        match e {
            TachoCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some(
                    "Check file paths and permissions; binary card files must be decoded to JSON first"
                        .to_string(),
                ),
            },
            TachoCliError::Compute(e) => compute_error(e),
            TachoCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TachoCliError::NothingToAnalyze => CliError {
                code: "NOTHING_TO_ANALYZE".to_string(),
                message: "Input contains no day or week rows".to_string(),
                hint: Some("Check the Date column labels".to_string()),
            },
            TachoCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

fn compute_error(e: ComputeError) -> CliError {
    let (code, hint) = match &e {
        ComputeError::MissingField(_) => (
            "MISSING_COLUMN",
            "Spreadsheet rows need at least the Date and Conduite columns",
        ),
        ComputeError::InvalidTimezone(_) => (
            "INVALID_TIMEZONE",
            "Use an IANA timezone name such as Europe/Paris",
        ),
        ComputeError::ConfigError(_) => ("CONFIG_ERROR", "Check TACHO_* environment variables"),
        ComputeError::JsonError(_) => ("JSON_ERROR", "Check JSON syntax and the --format flag"),
        _ => ("PARSE_ERROR", "Check input format"),
    };
    CliError {
        code: code.to_string(),
        message: e.to_string(),
        hint: Some(hint.to_string()),
    }
}
