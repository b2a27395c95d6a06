//! Tracing bootstrap and log level handling shared by the host and config fragments.
//!
//! The global filter is a base directive (`RUST_LOG` or the host level)
//! followed by one `<module>=<level>` directive per module that set its own
//! level. Module code logs under its module id as the target, e.g.
//! `info!(target: "chat", ...)`.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::{LazyLock, OnceLock};
use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt, reload};

/// Level used when nothing else is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Per-module level overrides, keyed by module id.
static MODULE_LEVELS: LazyLock<RwLock<BTreeMap<String, &'static str>>> =
    LazyLock::new(|| RwLock::new(BTreeMap::new()));

/// Live filter of the installed subscriber, with its base directive.
static INSTALLED: OnceLock<(reload::Handle<EnvFilter, Registry>, String)> = OnceLock::new();

/// Normalize a user-supplied level name.
///
/// Accepts any casing and the `warning` alias. Returns `None` for unknown names.
pub fn parse_level(level: &str) -> Option<&'static str> {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" => Some("error"),
        "off" => Some("off"),
        _ => None,
    }
}

/// Map a level name to a tracing filter, falling back to `info`.
pub fn level_filter(level: &str) -> LevelFilter {
    match parse_level(level) {
        Some("trace") => LevelFilter::TRACE,
        Some("debug") => LevelFilter::DEBUG,
        Some("warn") => LevelFilter::WARN,
        Some("error") => LevelFilter::ERROR,
        Some("off") => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

/// `base` plus every module override, in module id order.
pub fn filter_directives(base: &str) -> String {
    let mut directives = base.to_string();
    for (module, level) in MODULE_LEVELS.read().iter() {
        directives.push_str(&format!(",{module}={level}"));
    }
    directives
}

/// Build the filter the global subscriber would use for `base`.
pub fn env_filter(base: &str) -> EnvFilter {
    EnvFilter::new(filter_directives(base))
}

/// Override the level of one module's target.
///
/// Takes effect immediately when [`init_logging`] installed the subscriber,
/// otherwise at installation. Returns false for an unknown level name.
pub fn set_module_level(module: &str, level: &str) -> bool {
    let Some(level) = parse_level(level) else {
        return false;
    };
    MODULE_LEVELS.write().insert(module.to_string(), level);
    refresh();
    true
}

/// The override set for `module`, if any.
pub fn module_level(module: &str) -> Option<&'static str> {
    MODULE_LEVELS.read().get(module).copied()
}

fn refresh() {
    let Some((handle, base)) = INSTALLED.get() else {
        return;
    };
    if let Err(e) = handle.reload(env_filter(base)) {
        warn!("Failed to apply module log levels: {}", e);
    }
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `level` when set. Returns false when a global
/// subscriber was already installed (the call is then a no-op).
pub fn init_logging(level: &str) -> bool {
    let base = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| parse_level(level).unwrap_or(DEFAULT_LOG_LEVEL).to_string());

    let (filter, handle) = reload::Layer::new(env_filter(&base));
    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok();
    if installed {
        let _ = INSTALLED.set((handle, base));
    }
    installed
}
