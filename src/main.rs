// src/main.rs

//! pubwatch CLI
//!
//! Watches a publications page for the newest entry and notifies on change.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;

use pubwatch::{
    detect::RelevanceFilter,
    error::Result,
    extract::PageExtractor,
    fetch::{self, FetchOrchestrator},
    models::{Config, EnvSettings},
    notify::HttpMailer,
    poll::PollLoop,
    state::StateStore,
};

/// pubwatch - Publication Change Watcher
#[derive(Parser, Debug)]
#[command(
    name = "pubwatch",
    version,
    about = "Watches a publications page and notifies on new entries"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the poll loop until a signal or the max-runtime deadline
    Watch,

    /// Run a single cycle and exit (cron-friendly)
    Once,

    /// Validate configuration, selectors and environment
    Validate,

    /// Show the last-seen item from the state file
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Build the poll loop from validated configuration and environment.
fn build_poll_loop(config: &Config, env: &EnvSettings) -> Result<PollLoop> {
    let fetcher = FetchOrchestrator::from_config(config)?;
    // The mailer shares the fetch path's timeout so a hung mail API cannot
    // stall a cycle indefinitely.
    let mailer = HttpMailer::new(fetch::create_client(config)?, &config.notify, env);

    Ok(PollLoop::new(
        Duration::from_secs(config.poll.interval_secs),
        Box::new(fetcher),
        StateStore::new(&config.state.path),
        Box::new(mailer),
        RelevanceFilter::new(&config.notify.keywords),
        config.notify.subject_prefix.clone(),
    ))
}

/// Signal shutdown on SIGINT, SIGTERM, or the max-runtime deadline.
fn spawn_shutdown_watcher(tx: watch::Sender<bool>, max_runtime: Option<Duration>) {
    tokio::spawn(async move {
        let deadline = async {
            match max_runtime {
                Some(duration) => tokio::time::sleep(duration).await,
                None => std::future::pending().await,
            }
        };

        #[cfg(unix)]
        let terminate = async {
            use tokio::signal::unix::{SignalKind, signal};
            match signal(SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    log::error!("Failed to install SIGTERM handler: {e}");
                    std::future::pending::<()>().await;
                }
            }
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => log::info!("Received interrupt signal"),
            _ = terminate => log::info!("Received termination signal"),
            _ = deadline => log::info!("Maximum runtime reached"),
        }

        let _ = tx.send(true);
    });
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load_or_default(&cli.config);
    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {e}");
        return Err(e);
    }

    match cli.command {
        Command::Watch => {
            let env = EnvSettings::from_env()?;
            let poll_loop = build_poll_loop(&config, &env)?;

            let (tx, rx) = watch::channel(false);
            let max_runtime = env
                .max_runtime_minutes
                .map(|minutes| Duration::from_secs(minutes * 60));
            spawn_shutdown_watcher(tx, max_runtime);

            poll_loop.run(rx).await;
            log::info!("Shut down cleanly");
        }

        Command::Once => {
            let env = EnvSettings::from_env()?;
            let poll_loop = build_poll_loop(&config, &env)?;

            let outcome = poll_loop.run_cycle().await?;
            log::info!(
                "Cycle complete: change={:?} notified={} persisted={}",
                outcome.change,
                outcome.notified,
                outcome.persisted
            );
        }

        Command::Validate => {
            // Selector syntax is only exercised at extraction time, so
            // parse it here explicitly.
            PageExtractor::new(&config.source.selectors, &config.source.base_url)?;
            log::info!("Config OK");

            EnvSettings::from_env()?;
            log::info!("Environment OK");

            log::info!("All validations passed");
        }

        Command::Info => {
            let store = StateStore::new(&config.state.path);
            match store.load().await {
                Some(item) => {
                    log::info!("Last seen: {}", item.title);
                    log::info!("Date: {}", item.date);
                    log::info!("Link: {}", item.link);
                }
                None => log::info!("No state recorded yet at {}", config.state.path),
            }
        }
    }

    Ok(())
}
