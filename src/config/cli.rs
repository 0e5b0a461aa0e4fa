use std::{collections::BTreeMap, path::PathBuf};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

use crate::domain::filter::{FilterState, parse_finite};

/// Command-line arguments for the hazard-atlas binary.
#[derive(Debug, Parser)]
#[command(
    name = "hazard-atlas",
    version,
    about = "Caching proxy and feature pipeline for aviation hazard advisories"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "HAZARD_ATLAS_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP proxy.
    Serve(Box<ServeArgs>),
    /// Fetch both feeds once and print the filtered feature collection as JSON.
    Snapshot(Box<SnapshotArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    /// Override how long fetched advisories are served from cache.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override how often stale cache entries are swept.
    #[arg(long = "cache-sweep-interval-seconds", value_name = "SECONDS")]
    pub cache_sweep_interval_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct LoggingOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct UpstreamOverrides {
    /// Override the upstream data API base URL.
    #[arg(long = "upstream-base-url", value_name = "URL")]
    pub upstream_base_url: Option<String>,

    /// Override the upstream request timeout.
    #[arg(long = "upstream-timeout-seconds", value_name = "SECONDS")]
    pub upstream_timeout_seconds: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub logging: LoggingOverrides,

    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    #[command(flatten)]
    pub filter: SnapshotFilter,

    /// Extra upstream query parameter, repeatable (e.g. `--param hazard=turb`).
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Pretty-print the JSON output.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub pretty: bool,
}

impl SnapshotArgs {
    pub fn query_params(&self) -> BTreeMap<String, String> {
        self.params.iter().cloned().collect()
    }
}

#[derive(Debug, Args, Default, Clone)]
pub struct SnapshotFilter {
    /// Hide SIGMETs.
    #[arg(long = "hide-sigmet", action = clap::ArgAction::SetTrue)]
    pub hide_sigmet: bool,

    /// Hide AIRMETs.
    #[arg(long = "hide-airmet", action = clap::ArgAction::SetTrue)]
    pub hide_airmet: bool,

    /// Hide G-AIRMETs.
    #[arg(long = "hide-g-airmet", action = clap::ArgAction::SetTrue)]
    pub hide_g_airmet: bool,

    /// Lowest flight level of interest.
    #[arg(
        long = "min-fl",
        value_name = "FL",
        value_parser = parse_flag_number,
        allow_negative_numbers = true
    )]
    pub min_fl: Option<f64>,

    /// Highest flight level of interest.
    #[arg(
        long = "max-fl",
        value_name = "FL",
        value_parser = parse_flag_number,
        allow_negative_numbers = true
    )]
    pub max_fl: Option<f64>,

    /// Window start relative to now, in hours (-24..=0).
    #[arg(
        long = "from-offset-hours",
        value_name = "HOURS",
        value_parser = parse_flag_number,
        allow_negative_numbers = true
    )]
    pub from_offset_hours: Option<f64>,

    /// Window end relative to now, in hours (0..=6).
    #[arg(
        long = "to-offset-hours",
        value_name = "HOURS",
        value_parser = parse_flag_number,
        allow_negative_numbers = true
    )]
    pub to_offset_hours: Option<f64>,
}

impl SnapshotFilter {
    /// Filter state described by the flags, sanitized the same way as HTTP input.
    pub fn state(&self) -> FilterState {
        let mut state = FilterState::default();
        state.categories.sigmet = !self.hide_sigmet;
        state.categories.airmet = !self.hide_airmet;
        state.categories.g_airmet = !self.hide_g_airmet;
        if let Some(min) = self.min_fl {
            state.altitude.min = min;
        }
        if let Some(max) = self.max_fl {
            state.altitude.max = max;
        }
        if let Some(from) = self.from_offset_hours {
            state.time.from_offset_hours = from;
        }
        if let Some(to) = self.to_offset_hours {
            state.time.to_offset_hours = to;
        }
        state.sanitized()
    }
}

fn parse_flag_number(raw: &str) -> Result<f64, String> {
    parse_finite(raw).ok_or_else(|| format!("expected a finite number, got `{raw}`"))
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}
