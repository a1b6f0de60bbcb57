//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Settlementd - settlement case lifecycle daemon
#[derive(Parser)]
#[command(
    name = "sd",
    about = "Settlement case lifecycle daemon: plans, documents, response monitoring",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the daemon: monitoring loops plus the HTTP control surface
    Serve,

    /// Calculate (or recalculate) the settlement plan for a case
    Plan {
        /// Case reference
        case_ref: String,
    },

    /// Generate a document batch for a case and write it to a directory
    Generate {
        /// Case reference
        case_ref: String,

        /// Batch kind (settlement_proposal, zero_payment_plan,
        /// insolvency_petition)
        #[arg(value_name = "BATCH")]
        batch: String,

        /// Output directory for the generated files
        #[arg(short, long, default_value = "out")]
        output: PathBuf,
    },

    /// Show a case: status, creditors, response statistics
    Status {
        /// Case reference
        case_ref: String,
    },

    /// List all cases with their lifecycle status
    Cases,
}
