//! `modbench` command line.
use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::fs::{File, OpenOptions};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tracing::Subscriber;
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod check;
mod run;

const DEFAULT_CONFIG: &str = "config.yaml";
const DEFAULT_LOG_FILTER: &str = "modbench=info,mock_device=info";

#[derive(Parser, Debug)]
#[command(version, about = "Latency and dropout benchmark for Modbus TCP register polling")]
struct ModbenchCli {
    #[command(subcommand)]
    command: Command,

    /// Also append log output to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full test matrix and export the results
    Run(RunArgs),
    /// Connect once and read a few block sizes
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Override the duration of every run, e.g. `30s` or `2m`
    #[arg(short, long, value_parser = humantime::parse_duration)]
    duration: Option<Duration>,

    /// Poll an in-process simulated device instead of the configured host
    #[arg(long)]
    mock: bool,

    /// Serve Prometheus metrics on this address while the matrix runs
    #[arg(long)]
    prometheus: Option<SocketAddr>,
}

#[derive(Args, Debug)]
pub(crate) struct CheckArgs {
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Check an in-process simulated device instead of the configured host
    #[arg(long)]
    mock: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = ModbenchCli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let file_layer = cli.log_file.as_deref().map(log_file_layer).transpose()?;
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    match cli.command {
        Command::Run(args) => run::run(args).await,
        Command::Check(args) => check::check(args).await,
    }
}

type LogFileLayer<S> = fmt::Layer<S, DefaultFields, Format, Mutex<File>>;

/// Plain-text log layer appending to `path`.
fn log_file_layer<S>(path: &Path) -> anyhow::Result<LogFileLayer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Unable to open log file {}", path.display()))?;
    Ok(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
}
