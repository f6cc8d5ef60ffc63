//! # Column Preview CLI
//!
//! Registers computed columns from a JSON file, shows them over sample
//! records in an in-memory view, and prints the settled values.

mod input;
mod preview;
mod render;

use clap::Parser;
use column_template::config::{ConfigError, RuntimeConfig};
use column_template::logging::{self, codes, FacadeLogger, LogLevel, LoggingService};
use column_template::{log_error, log_info};
use preview::SortOrder;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "column-preview")]
#[command(version, about = "Preview computed message-list columns against sample records")]
struct Cli {
    /// JSON array of column registrations
    #[arg(long)]
    columns: PathBuf,

    /// JSON array of sample records
    #[arg(long)]
    records: PathBuf,

    /// TOML runtime preferences
    #[arg(long)]
    config: Option<PathBuf>,

    /// Column id to sort rows by
    #[arg(long)]
    sort: Option<String>,

    /// Sort in descending order
    #[arg(long, requires = "sort")]
    descending: bool,

    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_module("columns", log::LevelFilter::Debug)
        .init();

    let cli = Cli::parse();
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            // Report through the facade; the rejected config cannot pick a logger
            let service = LoggingService::new(Arc::new(FacadeLogger), LogLevel::Error);
            logging::init_global_logging_with_service(Arc::new(service))?;
            log_error!(
                codes::system::CONFIGURATION_INVALID,
                "Runtime configuration rejected",
                "error" => &err
            );
            return Err(err.into());
        }
    };

    logging::init_global_logging(&config)?;
    log_info!("Column preview starting", "columns" => cli.columns.display());

    let columns = input::load_columns(&cli.columns)?;
    let records = input::load_records(&cli.records)?;
    let order = cli.sort.clone().map(|column_id| SortOrder {
        column_id,
        descending: cli.descending,
    });

    let result = match preview::run(config, &columns, &records, order.as_ref()) {
        Ok(result) => result,
        Err(err) => {
            log_error!(err.code(), "Preview failed", "error" => &err);
            return Err(err.into());
        }
    };

    if cli.json {
        println!("{}", render::json(&result)?);
    } else {
        print!("{}", render::table(&result));
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<RuntimeConfig, ConfigError> {
    match path {
        Some(path) => RuntimeConfig::load(path),
        None => {
            let config = RuntimeConfig::default();
            config.validate()?;
            Ok(config)
        }
    }
}
