#![forbid(unsafe_code)]

mod config;
mod constants;
mod daemon;
mod fingerprint;
mod randr_events;
mod reconcile;
mod store;
mod xrandr;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, Receiver};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use config::{parse_level, Config};
use constants::config::LOG_LEVEL_ENV;
use daemon::{spawn_all, supervise, Cancellation, SupervisorError, Worker};
use fingerprint::Fingerprint;
use randr_events::RandrEvents;
use reconcile::{ReconcileOptions, Reconciler, Trigger};
use store::{FileBackend, LayoutStore};
use xrandr::{parse_report, DisplayServer, XrandrCli};

/// Remembers xrandr output layouts per set of connected monitors and
/// restores them when that set is plugged in again
#[derive(Debug, Parser)]
#[command(name = "randr-layoutd", version, about)]
struct Cli {
    /// Config file (default: $XDG_CONFIG_HOME/randr-layoutd/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the daemon (default)
    Run,
    /// Parse an xrandr report and print it as JSON with its fingerprint
    Query {
        /// Read a saved `xrandr --props` report instead of running xrandr
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Show the latest layout and whether the current hardware has one saved
    Status,
    /// Delete a saved layout
    Forget {
        fingerprint: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(&config_path)?;

    init_logging(cli.log_level.as_deref(), &config)?;
    config.validate_and_clamp();

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(&config),
        Command::Query { file } => query(&config, file.as_deref()),
        Command::Status => status(&config),
        Command::Forget { fingerprint } => forget(&config, &fingerprint),
    }
}

/// Level precedence: `--log-level`, then `LOG_LEVEL`, then the config file
fn init_logging(cli_level: Option<&str>, config: &Config) -> Result<()> {
    let env_level = std::env::var(LOG_LEVEL_ENV).ok();
    let level = cli_level
        .and_then(parse_level)
        .or_else(|| env_level.as_deref().and_then(parse_level))
        .or_else(|| parse_level(&config.log_level))
        .unwrap_or(Level::INFO);

    // stderr keeps `query` output on stdout machine-readable
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn open_store(config: &Config) -> Result<LayoutStore<FileBackend>> {
    let dir = config.state_dir();
    let backend = FileBackend::open(&dir).context(format!("Failed to open state directory {}", dir.display()))?;
    Ok(LayoutStore::new(backend))
}

fn run(config: &Config) -> Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting randr-layoutd");
    config.log_summary();

    let store = open_store(config)?;
    let display = XrandrCli::new(&config.xrandr_command);

    // One pending trigger is enough: every pass re-queries from scratch.
    let (trigger_tx, trigger_rx) = bounded(1);
    trigger_tx
        .try_send(Trigger::startup())
        .context("Failed to queue startup trigger")?;

    let events = RandrEvents::connect(trigger_tx, config.event_poll_interval())?;
    let reconciler = Reconciler::new(
        display,
        store,
        trigger_rx,
        ReconcileOptions {
            reapply_on_startup: config.reapply_on_startup,
        },
    );

    let signals = forward_signals()?;
    let cancellation = Cancellation::new();

    let workers: Vec<Arc<dyn Worker>> = vec![Arc::new(events), Arc::new(reconciler)];
    let running = spawn_all(&cancellation, &workers)?;

    match supervise(&signals, &running, cancellation, config.shutdown_timeout()) {
        Ok(()) => {
            info!("Shutdown complete");
            Ok(())
        }
        Err(e @ SupervisorError::TimedOut { .. }) => {
            error!(error = %e, "Shutdown timed out, forcing exit");
            std::process::exit(1);
        }
        Err(e) => Err(e).context("randr-layoutd stopped after a worker failure"),
    }
}

#[cfg(unix)]
fn forward_signals() -> Result<Receiver<i32>> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to register signal handlers")?;
    let (tx, rx) = bounded(1);
    std::thread::Builder::new()
        .name("signals".to_string())
        .spawn(move || {
            for signal in signals.forever() {
                // Shutdown is already underway once the slot is full.
                let _ = tx.try_send(signal);
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(rx)
}

#[cfg(not(unix))]
fn forward_signals() -> Result<Receiver<i32>> {
    Ok(crossbeam_channel::never())
}

fn query(config: &Config, file: Option<&Path>) -> Result<()> {
    let raw = match file {
        Some(path) => fs::read(path).context(format!("Failed to read report {}", path.display()))?,
        None => XrandrCli::new(&config.xrandr_command).query()?,
    };

    let report = parse_report(&raw).context("Failed to parse xrandr report")?;
    let fingerprint = Fingerprint::of(&report.snapshot);
    info!(
        screen = report.screen.index,
        current = %report.screen.current,
        outputs = report.snapshot.outputs.len(),
        connected = report.snapshot.connected().count(),
        "Parsed report"
    );

    let document = serde_json::json!({
        "fingerprint": fingerprint,
        "outputs": report.snapshot,
    });
    let pretty = serde_json::to_string_pretty(&document).context("Failed to serialize report")?;
    println!("{pretty}");
    Ok(())
}

fn status(config: &Config) -> Result<()> {
    let store = open_store(config)?;

    let latest = store.latest_fingerprint()?;
    println!("latest:  {}", latest.as_ref().map_or("none", Fingerprint::as_str));

    let current = XrandrCli::new(&config.xrandr_command)
        .query()
        .and_then(|raw| parse_report(&raw).context("Failed to parse xrandr report"));
    match current {
        Ok(report) => {
            let fingerprint = Fingerprint::of(&report.snapshot);
            let saved = store.saved_snapshot(&fingerprint)?.is_some();
            println!(
                "current: {fingerprint} ({})",
                if saved { "saved" } else { "not saved" }
            );
        }
        Err(e) => warn!(error = %format!("{e:#}"), "Could not query current outputs"),
    }
    Ok(())
}

fn forget(config: &Config, fingerprint: &str) -> Result<()> {
    let Some(fingerprint) = Fingerprint::parse(fingerprint) else {
        bail!("{fingerprint:?} is not a layout fingerprint");
    };

    let store = open_store(config)?;
    if store.saved_snapshot(&fingerprint)?.is_none() {
        warn!(fingerprint = %fingerprint, "No saved layout with this fingerprint");
    }
    store.forget(&fingerprint)?;
    info!(fingerprint = %fingerprint, "Forgot layout");
    Ok(())
}
