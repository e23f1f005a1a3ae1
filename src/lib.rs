//! Tacho Flux - Driving-time and rest-time compliance engine for tachograph records
//!
//! Flux turns tachograph exports into classified infractions of the EU 561/2006
//! driving and rest limits through a deterministic pipeline: source adaptation →
//! activity normalization → extraction → rule evaluation → date correction →
//! scoring.
//!
//! ## Inputs
//!
//! - **Spreadsheet exports**: one row per day, week or summary period
//! - **Decoded activity logs**: discrete DRIVING/WORK/REST/AVAILABILITY intervals
//!   from a driver card or vehicle unit download

pub mod adapters;
pub mod classifier;
pub mod config;
pub mod dates;
pub mod engine;
pub mod error;
pub mod extractor;
pub mod normalizer;
pub mod pipeline;
pub mod rules;
pub mod scoring;
pub mod types;
pub mod units;

pub use config::AnalysisConfig;
pub use error::ComputeError;
pub use pipeline::{
    analyze_activity_log, analyze_spreadsheet_rows, AnalysisReport, ComplianceAnalyzer,
    ValidationReport,
};
pub use rules::{RuleCode, RuleTable};
pub use types::{Day, Infraction, Severity, Week};

/// Flux version reported by the CLI
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name shown in diagnostics
pub const PRODUCER_NAME: &str = "tacho-flux";
