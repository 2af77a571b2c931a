use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod api;
mod config;
mod error;
mod export;
mod extract;
mod fetch;
mod matcher;
mod normalize;
mod processor;
mod records;
mod window;

use crate::config::{Config, ConfigArgs};
use crate::processor::{ComparisonReport, OrderWindow, run_comparison};
use crate::window::{DateRange, range_from_args};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch calls and orders from the platforms and match them
    Compare {
        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Match previously exported call and order JSON files
    Match {
        /// Calls JSON: a bare array or an object with a `calls` array
        #[arg(long)]
        calls: PathBuf,

        /// Orders JSON: an object with an `orders` array
        #[arg(long)]
        orders: PathBuf,

        #[command(flatten)]
        window: WindowArgs,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// Start the API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,
    },
}

#[derive(Args)]
struct WindowArgs {
    /// First day of the window (YYYY-MM-DD)
    #[arg(long)]
    from: Option<String>,

    /// Last day of the window (YYYY-MM-DD), defaults to today
    #[arg(long)]
    to: Option<String>,

    /// Window length in days when --from is not given
    #[arg(long)]
    days: Option<u64>,
}

#[derive(Args)]
struct OutputArgs {
    /// Path to the output CSV file
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Path to the output JSON report
    #[arg(long)]
    json: Option<PathBuf>,

    /// Print the JSON report to stdout instead of writing files
    #[arg(long)]
    stdout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so --stdout output stays machine-readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = config::build_config(&cli.config)?;

    match cli.command {
        Commands::Compare { window, output } => {
            let report = compare_live(&config, &window).await?;
            emit(&config, &output, &report)?;
        }
        Commands::Match {
            calls,
            orders,
            window,
            output,
        } => {
            info!("Matching calls from {} against orders from {}", calls.display(), orders.display());
            let report = match_files(&config, &calls, &orders, &window)?;
            emit(&config, &output, &report)?;
        }
        Commands::Serve { port } => {
            api::start_api_server(port, config).await;
        }
    }

    Ok(())
}

fn order_window(config: &Config) -> OrderWindow {
    OrderWindow::from_legacy_flag(config.legacy_order_window)
}

fn resolve_window(config: &Config, args: &WindowArgs) -> Result<DateRange> {
    let range = range_from_args(
        args.from.as_deref(),
        args.to.as_deref(),
        args.days.unwrap_or(config.days_back),
    )?;
    info!("Using date range {} ..= {}", range.start(), range.end());
    Ok(range)
}

async fn compare_live(config: &Config, args: &WindowArgs) -> Result<ComparisonReport> {
    let range = resolve_window(config, args)?;
    let client = fetch::PlatformClient::from_config(config)?;

    let spinner = indicatif::ProgressBar::new_spinner();
    spinner.set_message("Fetching data from APIs...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let fetched = client.fetch_snapshot().await;
    spinner.finish_and_clear();

    let snapshot = fetched.context("Failed to fetch data")?;
    Ok(run_comparison(
        &snapshot.calls,
        &snapshot.orders,
        &range,
        order_window(config),
    )?)
}

fn read_json_file(path: &Path) -> Result<serde_json::Value> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("Failed to parse JSON in {}", path.display()))
}

fn match_files(
    config: &Config,
    calls_path: &Path,
    orders_path: &Path,
    args: &WindowArgs,
) -> Result<ComparisonReport> {
    let range = resolve_window(config, args)?;
    let calls = fetch::calls_from_payload(read_json_file(calls_path)?)
        .with_context(|| format!("Unexpected calls payload in {}", calls_path.display()))?;
    let orders = fetch::orders_from_payload(read_json_file(orders_path)?)
        .with_context(|| format!("Unexpected orders payload in {}", orders_path.display()))?;

    info!("Loaded {} calls and {} orders", calls.len(), orders.len());
    Ok(run_comparison(&calls, &orders, &range, order_window(config))?)
}

fn emit(config: &Config, output: &OutputArgs, report: &ComparisonReport) -> Result<()> {
    if output.stdout {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    let csv_path = output.csv.as_ref().unwrap_or(&config.csv_file);
    export::write_csv(csv_path, &report.matches)?;

    if let Some(json_path) = output.json.as_ref().or(config.json_file.as_ref()) {
        export::write_json(json_path, report)?;
    }

    info!(
        "{} matches across {} calls in range and {} orders",
        report.matches.len(),
        report.calls_in_range,
        report.orders_matched_against
    );
    Ok(())
}
