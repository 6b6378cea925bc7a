//! Command-line interface argument parsing.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use crate::data::filter::{Constraint, FilterSpec, Selection};
use crate::state::Scope;

/// catalog-dash - filter a media catalog and print its dashboard panels
///
/// Examples:
///   catalog-dash netflix_titles.csv
///   catalog-dash netflix_titles.csv --type Movie --years 2000..2020
///   catalog-dash netflix_titles.csv --country "<missing>" --format json
///   catalog-dash netflix_titles.csv --filter '{"type": "TV Show", "release_year": [2015, 2021]}'
///   catalog-dash netflix_titles.csv --options country
///   catalog-dash --init-config > catalog-dash.toml
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Catalog file (.csv, .json or .parquet)
    #[arg(value_name = "SOURCE", required_unless_present = "init_config")]
    pub source: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for catalog-dash.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Keep only this type (e.g. Movie). "All" disables the constraint
    #[arg(short = 't', long = "type", value_name = "TYPE")]
    pub kind: Option<String>,

    /// Keep only this country. "All" disables, "<missing>" selects blanks
    #[arg(long, value_name = "COUNTRY")]
    pub country: Option<String>,

    /// Inclusive release-year range, written LO..HI
    #[arg(short, long, value_name = "LO..HI", value_parser = parse_year_range)]
    pub years: Option<(i64, i64)>,

    /// Full filter spec as JSON; the flags above override its fields
    #[arg(long, value_name = "JSON")]
    pub filter: Option<String>,

    /// Number of countries in the top-countries panel
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub top: Option<i64>,

    /// Aggregate over the filtered records or the whole catalog
    #[arg(long, value_enum)]
    pub scope: Option<ScopeArg>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Print the distinct values of FIELD instead of the panels
    #[arg(long, value_name = "FIELD")]
    pub options: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Print a default configuration file and exit
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Aligned text tables (default)
    #[default]
    Text,
    /// JSON document
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ScopeArg {
    Filtered,
    Full,
}

impl From<ScopeArg> for Scope {
    fn from(arg: ScopeArg) -> Self {
        match arg {
            ScopeArg::Filtered => Scope::Filtered,
            ScopeArg::Full => Scope::Full,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Constraints given on the command line, `--filter` first, then flags.
    pub fn filter_spec(&self) -> Result<FilterSpec> {
        let mut spec = match &self.filter {
            Some(json) => serde_json::from_str::<FilterSpec>(json)
                .context("--filter is not a valid filter spec")?
                .normalized()?,
            None => FilterSpec::new(),
        };
        if let Some(kind) = &self.kind {
            spec.set("kind", Constraint::ExactOrWildcard(Selection::from_text(kind)));
        }
        if let Some(country) = &self.country {
            spec.set(
                "country",
                Constraint::ExactOrWildcard(Selection::from_text(country)),
            );
        }
        if let Some((lo, hi)) = self.years {
            spec.set("release_year", Constraint::range(lo, hi));
        }
        Ok(spec)
    }

    /// Default level when `RUST_LOG` is not set.
    pub fn log_level(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        }
    }
}

/// `2000..2020` → `(2000, 2020)`. Order is checked by the filter, not here.
fn parse_year_range(s: &str) -> Result<(i64, i64), String> {
    let (lo, hi) = s
        .split_once("..")
        .ok_or_else(|| format!("expected LO..HI, got '{s}'"))?;
    let hi = hi.strip_prefix('=').unwrap_or(hi);
    let lo = lo
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("'{lo}' is not a year"))?;
    let hi = hi
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("'{hi}' is not a year"))?;
    Ok((lo, hi))
}
