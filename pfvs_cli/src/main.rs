//! `pfvs` command line: replay G-code through the interceptor, scan, stream
//! and health-check the sensor head.

mod cli;
mod error_fmt;
mod replay;
mod sensor;
mod setup;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use eyre::Result;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn init_tracing(json: bool, level: &str, logging: Option<&pfvs_config::Logging>) -> Result<()> {
    // RUST_LOG wins over --log-level / logging.level
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    // Console logs go to stderr so stdout stays machine-readable.
    let (json_layer, pretty_layer) = if json {
        let layer = fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr);
        (Some(layer), None)
    } else {
        let layer = fmt::layer()
            .with_target(false)
            .with_level(true)
            .with_writer(std::io::stderr);
        (None, Some(layer))
    };

    let file_layer = match logging.and_then(|l| l.file.as_deref()) {
        Some(path) => {
            let path = std::path::Path::new(path);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {path:?} has no file name"))?;
            let appender = match logging.and_then(|l| l.rotation.as_deref()) {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_ansi(false).with_writer(writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(pretty_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| eyre::eyre!("init logging: {e}"))
}

fn install_shutdown_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    if let Err(e) = ctrlc::set_handler(move || handler_flag.store(true, Ordering::Relaxed)) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler");
    }
    flag
}

fn print_health(json: bool) {
    let version = env!("CARGO_PKG_VERSION");
    if json {
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "version": version })
        );
    } else {
        println!("OK pfvs {version}");
    }
}

fn run(cli: Cli) -> Result<()> {
    if matches!(cli.cmd, Commands::Health) {
        init_tracing(cli.json, cli.log_level.as_deref().unwrap_or("info"), None)?;
        print_health(cli.json);
        return Ok(());
    }

    let loaded = setup::load_config(&cli.config)?;
    let level = cli
        .log_level
        .as_deref()
        .or(loaded.cfg.logging.level.as_deref())
        .unwrap_or("info");
    init_tracing(cli.json, level, Some(&loaded.cfg.logging))?;
    tracing::debug!(config = %cli.config.display(), "config loaded");

    let shutdown = install_shutdown_flag();
    match cli.cmd {
        Commands::Replay { gcode, material } => {
            replay::run_replay(&loaded, &gcode, material.as_deref(), cli.json, &shutdown)
        }
        Commands::Scan { material } => sensor::run_scan(&loaded, material.as_deref(), cli.json),
        Commands::Stream {
            duration_ms,
            material,
        } => sensor::run_stream(
            &loaded,
            Duration::from_millis(duration_ms),
            material.as_deref(),
            cli.json,
            &shutdown,
        ),
        Commands::SelfCheck => sensor::run_self_check(&loaded, cli.json),
        Commands::Health => Ok(()),
    }
}

fn main() {
    if let Err(e) = color_eyre::install() {
        eprintln!("failed to install error reporter: {e}");
    }
    let cli = Cli::parse();
    let json = cli.json;
    let _ = JSON_MODE.set(json);

    if let Err(e) = run(cli) {
        tracing::debug!(error = ?e, "command failed");
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}
