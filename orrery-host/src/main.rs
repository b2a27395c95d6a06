mod extensions;

use anyhow::{Context, Result};
use clap::Parser;
use orrery_core::logging::init_logging;
use orrery_core::{Host, HostSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

use crate::extensions::{BUILTIN_MODULE, Heartbeat, Motd};

#[derive(Parser, Debug)]
#[command(name = "orrery-host", about = "Run orrery extensions until interrupted")]
struct Args {
    /// Path to a YAML settings file
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Root directory for module data (overrides the settings file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (overrides the settings file; RUST_LOG wins over both)
    #[arg(long)]
    log_level: Option<String>,

    /// Tear down right after starting instead of waiting for Ctrl-C
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() {
    match run(Args::parse()).await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

fn load_settings(args: &Args) -> Result<HostSettings> {
    let mut settings = match &args.settings {
        Some(path) => HostSettings::load(path)?,
        None => HostSettings::default(),
    };
    if let Some(dir) = &args.data_dir {
        settings.data_dir = dir.clone();
    }
    if let Some(level) = &args.log_level {
        settings.set_log_level(level)?;
    }
    Ok(settings)
}

async fn run(args: Args) -> Result<i32> {
    let settings = load_settings(&args)?;
    init_logging(&settings.log_level);

    info!(
        data_dir = %settings.data_dir.display(),
        format = ?settings.format,
        "Starting orrery host"
    );

    let host = Host::new(settings);
    host.add_module(BUILTIN_MODULE);
    host.register(Arc::new(Motd), BUILTIN_MODULE)?;
    host.register(Arc::new(Heartbeat::new()), BUILTIN_MODULE)?;

    let report = host.start().await.context("Failed to start extensions")?;
    info!(
        loaded = report.loaded.len(),
        failed = report.failed.len(),
        "Host ready"
    );

    if !args.once {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
        }
        info!("Received shutdown signal");
    }

    let teardown = host.teardown().await;
    for failure in &teardown.unload_failures {
        error!("{}", failure);
    }
    Ok(teardown.exit_code())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_settings_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("orrery.yml");
        std::fs::write(&path, "data_dir: /srv/orrery\nlog_level: warn\n").unwrap();

        let args = Args::parse_from([
            "orrery-host",
            "--settings",
            path.to_str().unwrap(),
            "--log-level",
            "DEBUG",
        ]);
        let settings = load_settings(&args).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/srv/orrery"));
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_bad_log_level_flag_is_an_error() {
        let args = Args::parse_from(["orrery-host", "--log-level", "chatty"]);
        assert!(load_settings(&args).is_err());
    }

    #[tokio::test]
    async fn test_once_runs_to_clean_exit() {
        let dir = TempDir::new().unwrap();
        let args = Args::parse_from([
            "orrery-host",
            "--once",
            "--data-dir",
            dir.path().to_str().unwrap(),
        ]);
        assert_eq!(run(args).await.unwrap(), 0);
        assert!(dir.path().join("orrery/motd.yml").exists());
    }
}
