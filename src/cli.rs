//! Command-line interface parsing for brdash
//!
//! Subcommands mirror the four dashboards (postal code, country, weather,
//! names); `--timeout` and `--json` apply to all of them.

use std::time::Duration;

use clap::{Parser, Subcommand};
use thiserror::Error;

/// Errors for CLI argument handling that clap cannot express
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CliError {
    /// The timeout must be a positive number of milliseconds
    #[error("Invalid timeout: must be greater than zero")]
    InvalidTimeout,
}

/// brdash - Brazilian public-data dashboards in your terminal
#[derive(Parser, Debug)]
#[command(name = "brdash")]
#[command(about = "Brazilian public-data dashboards: postal codes, countries, weather and names")]
#[command(version)]
pub struct Cli {
    /// Hard timeout for each upstream call, in milliseconds
    #[arg(long, global = true, default_value_t = 5000)]
    pub timeout: u64,

    /// Print the raw JSON result instead of the text dashboard
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Look up a Brazilian postal code (CEP)
    Cep {
        /// 8-digit postal code; punctuation is stripped before validation
        code: String,
    },
    /// Look up country facts by name
    Pais {
        /// Country name, free text (any translation)
        name: String,
    },
    /// Current weather and 5-day forecast for a city
    Clima {
        /// City name; forecasts are shown in the city's own local time
        city: String,
    },
    /// Brazilian name-census statistics
    Nomes {
        /// First name to query
        name: String,
        /// Sex filter (M or F)
        #[arg(long)]
        sexo: Option<String>,
        /// Region/state numeric code
        #[arg(long)]
        regiao: Option<String>,
    },
}

/// Converts the `--timeout` value into a duration, rejecting zero
pub fn timeout_from_millis(millis: u64) -> Result<Duration, CliError> {
    if millis == 0 {
        return Err(CliError::InvalidTimeout);
    }
    Ok(Duration::from_millis(millis))
}
