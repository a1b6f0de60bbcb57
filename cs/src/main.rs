use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use casestore::RecordStore;
use casestore::cli::Cli;
use casestore::config::Config;

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    info!("casestore starting");

    match cli.command {
        casestore::cli::Command::List { collection } => {
            let store = RecordStore::open(&config.store_path)?;
            let keys = store.keys(&collection)?;
            if keys.is_empty() {
                println!("No records in collection '{}'", collection);
            } else {
                for key in keys {
                    println!("{}", key);
                }
            }
        }
        casestore::cli::Command::Show { collection, key } => {
            let store = RecordStore::open(&config.store_path)?;
            match store.get_raw(&collection, &key)? {
                Some(content) => println!("{}", content),
                None => println!("{} Record not found: {}/{}", "✗".red(), collection, key),
            }
        }
        casestore::cli::Command::Stats { collection } => {
            let store = RecordStore::open(&config.store_path)?;
            let stats = store.stats(&collection)?;
            println!("Collection: {}", collection.cyan());
            println!("  Records: {}", stats.record_count);
            println!("  Total bytes: {}", stats.total_bytes);
        }
        casestore::cli::Command::Collections => {
            let store = RecordStore::open(&config.store_path)?;
            let collections = store.collections()?;
            if collections.is_empty() {
                println!("No collections found");
            } else {
                for name in collections {
                    println!("{}", name);
                }
            }
        }
        casestore::cli::Command::Delete { collection, key } => {
            let store = RecordStore::open(&config.store_path)?;
            store.delete(&collection, &key)?;
            println!("{} Deleted record: {}/{}", "✓".green(), collection, key);
        }
    }

    Ok(())
}
