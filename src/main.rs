//! ccscan - closed caption extraction hooks for media library scans
//!
//! Command line entry point. Acts as a minimal host: it loads the settings,
//! runs the file test and worker hooks and, on request, executes the
//! ccextractor command they return.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use ccscan::cli::{Args, Commands};
use ccscan::config::Config;
use ccscan::hooks::{HookContext, WorkerOutcome};
use ccscan::runner::Runner;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Setup logging to both console and file
    setup_logging(args.verbose)?;

    info!("Starting ccscan");

    // Load configuration
    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            // Try to load config.toml from current directory first
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    match args.command {
        Commands::Test { path, library_id } => {
            let runner = Runner::new(HookContext::new(config), library_id, false);
            let data = runner.test_file(&path).await;

            if data.add_file_to_pending_tasks {
                println!("{}: queue for caption extraction", path.display());
            } else {
                println!("{}: skip", path.display());
            }
        }
        Commands::Worker { input, output, original, library_id, execute } => {
            let runner = Runner::new(HookContext::new(config), library_id, execute);
            runner.check_dependencies().await?;

            match runner.process_file(input, output, original).await? {
                WorkerOutcome::Dispatched { data, discovery, lock_file } => {
                    println!("Found {} stream ({})", discovery.codec_type, discovery.codec_name);
                    println!("Command: {}", data.exec_command.join(" "));
                    println!("Lock file: {}", lock_file.display());
                }
                WorkerOutcome::Skipped { reason, .. } => {
                    println!("No command required ({:?})", reason);
                }
                WorkerOutcome::NoStreamList(data) => {
                    println!("Probe of {} returned no stream list", data.file_in);
                }
            }
        }
        Commands::Scan { dir, library_id, execute } => {
            let runner = Runner::new(HookContext::new(config), library_id, execute);
            runner.check_dependencies().await?;

            let summary = runner.scan_directory(&dir).await?;
            println!("\nScan Summary:");
            println!("{:<12} {:>8}", "Scanned", summary.scanned);
            println!("{:<12} {:>8}", "Queued", summary.queued);
            println!("{:<12} {:>8}", "Dispatched", summary.dispatched);
            println!("{:<12} {:>8}", "Skipped", summary.skipped);
            println!("{:<12} {:>8}", "Failed", summary.failed);
        }
        Commands::Config { output } => {
            config.save_to_file(&output)?;
            println!("Wrote configuration to {}", output.display());
        }
    }

    info!("ccscan completed successfully");
    Ok(())
}

/// Setup logging to both console and file
fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(".ccscan").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Set up file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "ccscan.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false); // No ANSI colors in file

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("ccscan.log").display());

    Ok(())
}
