//! Run configuration, resolved once from the command line.

use crate::repl::Cli;
use log::LevelFilter;
use std::path::PathBuf;

pub const DEFAULT_PRODUCTS_PATH: &str = "db/products.csv";
pub const DEFAULT_DEFAULTS_PATH: &str = "db/products_default.csv";
pub const DEFAULT_USERNAME: &str = "Human Person";

#[derive(Debug, Clone)]
pub struct Config {
    /// Table loaded at start and written on Finish
    pub products_path: PathBuf,
    /// Pristine table used by Reset and to seed a missing products file
    pub defaults_path: PathBuf,
    /// Operator name shown in the menu banner
    pub username: String,
    pub log_level: LevelFilter,
    /// Restore the products file from the defaults before loading
    pub reset: bool,
}

impl Config {
    pub fn from_cli(cli: &Cli) -> Self {
        Config {
            products_path: cli.file.clone(),
            defaults_path: cli.defaults.clone(),
            username: cli.user.clone(),
            log_level: log_level(cli.verbose, cli.quiet),
            reset: cli.reset,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            products_path: PathBuf::from(DEFAULT_PRODUCTS_PATH),
            defaults_path: PathBuf::from(DEFAULT_DEFAULTS_PATH),
            username: DEFAULT_USERNAME.to_string(),
            log_level: LevelFilter::Warn,
            reset: false,
        }
    }
}

fn log_level(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Off;
    }
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    }
}
