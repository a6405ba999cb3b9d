//! scenetrack - Find the Landsat scene under your cursor.
//!
//! Tracks a cursor over a map and, for a selected day, asks a STAC imagery
//! catalog for the first scene covering that spot.

use std::io::{self, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::error;

mod cli;
mod client;
mod config;
mod errors;
mod fetcher;
mod models;
mod output;
mod query;
mod server;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod widget;

use cli::{Cli, Command, WidgetArgs};
use client::StacClient;
use config::WidgetConfig;
use state::{ErrorPolicy, ViewState};
use widget::Widget;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let base = WidgetConfig::load(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        Command::Lookup(args) => cmd_lookup(base, args),
        Command::Watch(args) => cmd_watch(base, args),
        Command::Ui(args) => cmd_ui(base, args),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Apply command-line overrides and re-validate.
fn resolve_config(base: WidgetConfig, overrides: WidgetArgs) -> Result<WidgetConfig> {
    let config = overrides.apply(base);
    config.validate().context("invalid command-line override")?;
    Ok(config)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to create tokio runtime")
}

/// Execute the `lookup` command - one-shot search.
fn cmd_lookup(base: WidgetConfig, args: cli::LookupArgs) -> Result<()> {
    let config = resolve_config(base, args.widget)?;
    let client = StacClient::from_config(&config).context("failed to create catalog client")?;

    let cursor = args.at.unwrap_or(config.initial_cursor);
    let date = args.date.unwrap_or_else(today);

    let imagery = runtime()?
        .block_on(fetcher::fetch_imagery(
            &client,
            date,
            cursor,
            config.bbox_padding,
        ))
        .context("failed to search imagery catalog")?;

    if imagery.is_none() {
        tracing::info!("no scene found near {} on {}", cursor, date);
    }

    let state = ViewState {
        imagery,
        ..ViewState::new(cursor, date)
    };

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    output::write_state(&mut handle, &state, args.format, true)?;

    Ok(())
}

/// Execute the `watch` command - headless widget driven by stdin.
fn cmd_watch(base: WidgetConfig, args: cli::WatchArgs) -> Result<()> {
    let config = resolve_config(base, args.widget)?;
    let client = StacClient::from_config(&config).context("failed to create catalog client")?;
    let widget = Widget::with_state(
        ViewState::new(config.initial_cursor, args.date.unwrap_or_else(today)),
        ErrorPolicy::from_clear_flag(config.clear_imagery_on_error),
        Arc::new(client),
        config.bbox_padding,
    );
    let format = args.format;
    let details = args.details;

    runtime()?.block_on(async move {
        let mut updates = widget.store().subscribe();
        let printer = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let state = updates.borrow_and_update().clone();
                let stdout = io::stdout();
                let mut handle = stdout.lock();
                if let Err(e) = output::write_state(&mut handle, &state, format, details) {
                    tracing::warn!("failed to write state: {}", e);
                }
                // Flush after each update for real-time output
                let _ = handle.flush();
            }
        });

        let (tx, rx) = mpsc::channel(64);
        tokio::spawn(widget::forward_lines(
            tokio::io::BufReader::new(tokio::io::stdin()),
            tx,
        ));

        tracing::info!("reading cursor positions from stdin (lat,lng or 'date YYYY-MM-DD')");

        widget.attach(ReceiverStream::new(rx)).finished().await;

        // Last store handle; the printer drains remaining updates and stops.
        drop(widget);
        printer.await.context("state printer failed")
    })
}

/// Execute the `ui` command - start web server.
fn cmd_ui(base: WidgetConfig, args: cli::UiArgs) -> Result<()> {
    let widget = resolve_config(base, args.widget)?;

    // Build server config
    let config = server::ServerConfig {
        port: args.port,
        host: args.host.clone(),
        widget,
    };

    // Print startup message
    let url = format!("http://{}:{}", args.host, args.port);
    println!("\x1b[1m🛰 scenetrack Web UI\x1b[0m");
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("  Local:    \x1b[96m{}\x1b[0m", url);
    println!("  Catalog:  {}", config.widget.endpoint);
    println!("  Start:    {}", config.widget.initial_cursor);
    println!("\x1b[2m───────────────────────────────────────\x1b[0m");
    println!("\x1b[2mPress Ctrl+C to stop\x1b[0m\n");

    // Open browser if requested (using xdg-open/open command)
    if args.open {
        #[cfg(target_os = "linux")]
        let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
        #[cfg(target_os = "macos")]
        let _ = std::process::Command::new("open").arg(&url).spawn();
        #[cfg(target_os = "windows")]
        let _ = std::process::Command::new("cmd").args(["/c", "start", &url]).spawn();
    }

    // Run the async server on tokio runtime
    runtime()?.block_on(server::run_server(config))
}
