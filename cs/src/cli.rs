//! CLI argument parsing for casestore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "casestore")]
#[command(author, version, about = "Inspect persisted settlement cases and monitoring sessions", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List record keys in a collection
    List {
        /// Collection name (e.g. cases, sessions)
        #[arg(required = true)]
        collection: String,
    },

    /// Print a record's JSON
    Show {
        /// Collection name
        #[arg(required = true)]
        collection: String,

        /// Record key (case reference)
        #[arg(required = true)]
        key: String,
    },

    /// Show statistics for a collection
    Stats {
        /// Collection name
        #[arg(required = true)]
        collection: String,
    },

    /// List all collections
    Collections,

    /// Delete a record
    Delete {
        /// Collection name
        #[arg(required = true)]
        collection: String,

        /// Record key
        #[arg(required = true)]
        key: String,
    },
}
