mod backend;
mod cli;
mod dispense;
mod error_fmt;

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Parser;
use dispenser_config::{Config, Logging};
use eyre::{Result, WrapErr};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::cli::{Cli, Commands, FILE_GUARD};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();

    if let Err(err) = real_main(&cli) {
        tracing::error!(error = ?err, "command failed");
        if cli.json {
            println!("{}", error_fmt::format_error_json(&err));
        } else {
            eprintln!("{}", error_fmt::humanize(&err));
        }
        std::process::exit(error_fmt::exit_code_for_error(&err));
    }
}

fn real_main(cli: &Cli) -> Result<()> {
    let cfg: Config = dispenser_config::load_file(&cli.config)?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let flag = shutdown.clone();
        ctrlc::set_handler(move || flag.store(true, Ordering::Relaxed))
            .wrap_err("install Ctrl-C handler")?;
    }

    match &cli.cmd {
        Commands::Run => {
            let summary = dispense::run_interactive(&cfg, &shutdown)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "cycles": summary.cycles,
                        "tare_failures": summary.tare_failures,
                        "rejected_inputs": summary.rejected_inputs,
                    })
                );
            } else {
                println!(
                    "stopped after {} cycle(s), {} tare failure(s)",
                    summary.cycles, summary.tare_failures
                );
            }
        }
        Commands::Dispense { grams, keys } => {
            let keys = dispense::keys_for(*grams, keys.as_deref())?;
            let target_g = dispense::scripted_target(&keys);
            let summary = dispense::run_dispense(&cfg, &keys, &shutdown)?;
            let final_g = summary.last_final_g.unwrap_or_default();
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "target_g": target_g,
                        "final_g": final_g,
                        "cycles": summary.cycles,
                    })
                );
            } else {
                println!("dispense complete: {final_g:.2} g");
            }
        }
        Commands::SelfCheck => {
            let backend = dispense::self_check(&cfg)?;
            if cli.json {
                println!("{}", serde_json::json!({ "self_check": "ok", "backend": backend }));
            } else {
                println!("self-check ok ({backend})");
            }
        }
        Commands::Health => {
            println!(
                "{}",
                serde_json::json!({
                    "status": "ok",
                    "backend": backend::name(),
                    "version": env!("CARGO_PKG_VERSION"),
                    "config": cli.config.display().to_string(),
                })
            );
        }
    }
    Ok(())
}

/// Console logs go to stderr so stdout stays clean for results. `RUST_LOG`
/// wins over `--log-level`, which wins over `[logging].level`.
fn init_tracing(json: bool, cli_level: Option<&str>, logging: &Logging) -> Result<()> {
    let level = cli_level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .wrap_err_with(|| format!("invalid log level {level:?}"))?;

    let console = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = match &logging.file {
        Some(path) => {
            let path = Path::new(path);
            let dir = path
                .parent()
                .filter(|d| !d.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file {path:?} has no file name"))?;
            let appender = match logging.rotation.as_deref().unwrap_or("never") {
                "daily" => tracing_appender::rolling::daily(dir, name),
                "hourly" => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(writer),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init()
        .wrap_err("install tracing subscriber")?;
    Ok(())
}
