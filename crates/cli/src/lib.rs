//! sift-devtools: test report summaries and filter inspection.
//!
//! [`run`] takes the argument vector and output sinks and returns the exit code,
//! so the binary stays a thin wrapper.

#![forbid(unsafe_code)]

pub mod report;

use std::io::Write;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sift_codec::{decode_filters, decode_search, CodecOptions};
use sift_core::prelude::*;
use sift_registry::{configuration, View};
use tracing::{error, info};

use report::{export_test_report_summary, GithubContext, ReportOptions};

#[derive(Parser, Debug)]
#[command(
    name = "sift-devtools",
    version,
    about = "Sift developer tools",
    disable_version_flag = true,
    args_conflicts_with_subcommands = true,
    after_help = "Examples:\n  sift-devtools generateTestReportSummary /path/to/repo --only-errors\n  sift-devtools decode executions 'filters[namespace][IN]=company'"
)]
struct Cli {
    /// Show version
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Who to greet
    name: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output {
    Human,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Summarize JUnit XML reports (TEST-*.xml) under a directory as Markdown
    #[command(name = "generateTestReportSummary")]
    GenerateTestReportSummary {
        /// Directory to scan
        dir: Option<PathBuf>,
        /// Prefix the summary with GitHub Actions context
        #[arg(long = "ci", action = ArgAction::SetTrue)]
        ci: bool,
        /// List failing tests only
        #[arg(long = "only-errors", action = ArgAction::SetTrue)]
        only_errors: bool,
    },
    /// Decode a URL query string into the filters of a view
    Decode {
        /// View name, e.g. "executions" or "audit-logs"
        view: String,
        /// Query string, with or without the leading '?'
        query: String,
        /// Read the legacy bare-key format
        #[arg(long = "legacy", action = ArgAction::SetTrue)]
        legacy: bool,
    },
    /// List the filter keys of a view with their comparators
    Keys {
        view: String,
        #[arg(short = 'o', long = "output", value_enum, default_value_t = Output::Human)]
        output: Output,
    },
}

pub fn init_tracing() {
    let env = std::env::var("SIFT_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

pub fn init_metrics() {
    if let Ok(addr) = std::env::var("SIFT_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid SIFT_METRICS_ADDR; expected host:port");
        }
    }
}

/// Parse `args` (program name first) and run. Returns the process exit code:
/// 0 on success and for help/version, 1 on usage or runtime errors.
pub fn run<I, T>(args: I, out: &mut dyn Write, err: &mut dyn Write) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = write!(out, "{}", e);
                    0
                }
                _ => {
                    let _ = write!(err, "{}", e);
                    1
                }
            };
        }
    };
    match execute(cli, out, err) {
        Ok(code) => code,
        Err(e) => {
            error!(error = ?e, "command failed");
            let _ = writeln!(err, "Error: {:#}", e);
            1
        }
    }
}

fn execute(cli: Cli, out: &mut dyn Write, err: &mut dyn Write) -> Result<i32> {
    match cli.command {
        Some(Commands::GenerateTestReportSummary { dir, ci, only_errors }) => {
            let Some(dir) = dir else {
                writeln!(
                    err,
                    "Error: missing working directory argument.\nUsage: sift-devtools generateTestReportSummary <absolute-path>"
                )?;
                return Ok(1);
            };
            let dir = if dir.is_absolute() { dir } else { std::env::current_dir()?.join(dir) };
            info!(dir = %dir.display(), ci, only_errors, "generating test report summary");
            let opts = ReportOptions { only_errors, github: if ci { GithubContext::from_env() } else { None } };
            let summary = export_test_report_summary(&dir, &opts)?;
            writeln!(out, "{}", summary)?;
        }
        Some(Commands::Decode { view, query, legacy }) => {
            let view = View::from_str(&view)?;
            let opts = if legacy { CodecOptions::legacy() } else { CodecOptions::encoded() };
            let query = Query::parse(&query);
            let decoded = DecodeOutput {
                view,
                filters: decode_filters(&query, configuration(view), opts),
                search_query: decode_search(&query),
            };
            writeln!(out, "{}", serde_json::to_string_pretty(&decoded).context("rendering decoded filters")?)?;
        }
        Some(Commands::Keys { view, output }) => {
            let view = View::from_str(&view)?;
            let cfg = configuration(view);
            match output {
                Output::Human => {
                    if cfg.keys.is_empty() {
                        writeln!(out, "{}: no filter keys (search only)", view)?;
                    }
                    for k in cfg.keys.iter() {
                        let ops: Vec<&str> = k.comparators.iter().map(|c| c.as_key()).collect();
                        writeln!(out, "{} • {} • {}", k.key, k.label, ops.join(", "))?;
                    }
                }
                Output::Json => {
                    let keys: Vec<KeyOutput> = cfg
                        .keys
                        .iter()
                        .map(|k| KeyOutput { key: &k.key, label: &k.label, comparators: k.comparators.to_vec() })
                        .collect();
                    writeln!(out, "{}", serde_json::to_string_pretty(&keys)?)?;
                }
            }
        }
        None => {
            let name = cli.name.as_deref().unwrap_or("world");
            writeln!(out, "Hello, {}!", name)?;
        }
    }
    Ok(0)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DecodeOutput {
    view: View,
    filters: Vec<AppliedFilter>,
    search_query: String,
}

#[derive(Serialize)]
struct KeyOutput<'a> {
    key: &'a str,
    label: &'a str,
    comparators: Vec<Comparator>,
}
