//! Built-in demo extensions.
//!
//! `motd` prints a greeting on start. `heartbeat` depends on it and logs a
//! beat at a configurable interval, persisting the beat count on stop.
//! Both log under the `orrery` target, so their `logging.level` applies.

use async_trait::async_trait;
use orrery_core::config::serializers::DURATION;
use orrery_core::config::tree::ConfigTree;
use orrery_core::{
    ConfigFragment, ConfigSchema, Extension, ExtensionContext, ExtensionId, LoggingSection,
    ModuleConfig,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Module that owns the built-in extensions.
pub const BUILTIN_MODULE: &str = "orrery";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MotdConfig {
    pub message: String,
    pub logging: LoggingSection,
}

impl Default for MotdConfig {
    fn default() -> Self {
        Self {
            message: "Welcome to orrery".to_string(),
            logging: LoggingSection::default(),
        }
    }
}

impl ModuleConfig for MotdConfig {
    fn schema() -> ConfigSchema {
        ConfigSchema::new("motd", BUILTIN_MODULE, "motd.yml")
            // v1 stored the greeting under `text`
            .with_migration(2, |tree| {
                tree.rename("text", "message");
                Ok(())
            })
    }

    fn fragments_mut(&mut self) -> Vec<&mut dyn ConfigFragment> {
        vec![&mut self.logging]
    }
}

pub struct Motd;

#[async_trait]
impl Extension for Motd {
    fn id(&self) -> ExtensionId {
        ExtensionId::from("motd")
    }

    async fn on_enable(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
        let config = ctx.config::<MotdConfig>().await?;
        let message = config.read(|c: &MotdConfig| c.message.clone())?;
        info!(target: BUILTIN_MODULE, "{}", message);
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Milliseconds between beats; written as a duration string
    pub interval: u64,
    /// Beats logged across all runs
    pub beats: u64,
    pub logging: LoggingSection,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: 30_000,
            beats: 0,
            logging: LoggingSection::default(),
        }
    }
}

/// v1 stored `period_secs` as a bare integer.
fn period_to_interval(tree: &mut ConfigTree) -> anyhow::Result<()> {
    let Some(period) = tree.remove("period_secs") else {
        return Ok(());
    };
    let secs = period
        .as_u64()
        .ok_or_else(|| anyhow::anyhow!("period_secs must be a whole number, found {period:?}"))?;
    tree.set("interval", Value::from(format!("{secs}s")));
    Ok(())
}

impl ModuleConfig for HeartbeatConfig {
    fn schema() -> ConfigSchema {
        ConfigSchema::new("heartbeat", BUILTIN_MODULE, "heartbeat.yml")
            .with_typed_field("interval", DURATION)
            .with_migration(2, period_to_interval)
    }

    fn fragments_mut(&mut self) -> Vec<&mut dyn ConfigFragment> {
        vec![&mut self.logging]
    }
}

#[derive(Default)]
pub struct Heartbeat {
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Extension for Heartbeat {
    fn id(&self) -> ExtensionId {
        ExtensionId::from("heartbeat")
    }

    fn dependencies(&self) -> Vec<ExtensionId> {
        vec![ExtensionId::from("motd")]
    }

    async fn on_enable(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
        let config = ctx.config::<HeartbeatConfig>().await?;
        let interval = config.read(|c: &HeartbeatConfig| c.interval)?;
        if interval == 0 {
            anyhow::bail!("heartbeat interval must be positive");
        }

        let ticker = tokio::spawn(async move {
            let mut tick = tokio::time::interval(Duration::from_millis(interval));
            tick.tick().await;
            loop {
                tick.tick().await;
                match config.update(|c: &mut HeartbeatConfig| {
                    c.beats += 1;
                    c.beats
                }) {
                    Ok(beats) => info!(target: BUILTIN_MODULE, beats, "Heartbeat"),
                    Err(e) => {
                        debug!(target: BUILTIN_MODULE, "Heartbeat config unavailable: {}", e);
                        break;
                    }
                }
            }
        });
        if let Some(previous) = self.ticker.lock().replace(ticker) {
            previous.abort();
        }
        Ok(())
    }

    async fn on_disable(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
        if let Some(ticker) = self.ticker.lock().take() {
            ticker.abort();
        }
        ctx.cache().save(&HeartbeatConfig::schema_id()).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_core::{ExtensionState, Host, HostSettings};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn host(dir: &TempDir) -> Host {
        let host = Host::new(HostSettings {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        });
        host.add_module(BUILTIN_MODULE);
        host.register(Arc::new(Heartbeat::new()), BUILTIN_MODULE)
            .unwrap();
        host.register(Arc::new(Motd), BUILTIN_MODULE).unwrap();
        host
    }

    #[tokio::test]
    async fn test_builtins_start_in_dependency_order() {
        let dir = TempDir::new().unwrap();
        let host = host(&dir);

        let report = host.start().await.unwrap();
        assert_eq!(
            report.loaded,
            vec![ExtensionId::from("motd"), ExtensionId::from("heartbeat")]
        );

        let teardown = host.teardown().await;
        assert_eq!(teardown.exit_code(), 0);

        let written = std::fs::read_to_string(dir.path().join("orrery/heartbeat.yml")).unwrap();
        assert!(written.contains("interval: 30s"), "unexpected file: {written}");
        assert!(written.contains("version: 2"), "unexpected file: {written}");
    }

    #[tokio::test]
    async fn test_legacy_heartbeat_period_is_migrated() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("orrery")).unwrap();
        std::fs::write(
            dir.path().join("orrery/heartbeat.yml"),
            "version: 1\nperiod_secs: 90\nbeats: 7\n",
        )
        .unwrap();
        let host = host(&dir);

        host.start().await.unwrap();
        let record = host.cache().get::<HeartbeatConfig>().await.unwrap();
        let config: HeartbeatConfig = record.snapshot().unwrap();
        assert_eq!(config.interval, 90_000);
        assert_eq!(config.beats, 7);
        assert_eq!(record.stored_version(), Some(2));

        host.teardown().await;
        let written = std::fs::read_to_string(dir.path().join("orrery/heartbeat.yml")).unwrap();
        assert!(!written.contains("period_secs"));
        assert!(written.contains("interval: 1m 30s"), "unexpected file: {written}");
    }

    #[tokio::test]
    async fn test_zero_interval_fails_heartbeat_only() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("orrery")).unwrap();
        std::fs::write(
            dir.path().join("orrery/heartbeat.yml"),
            "version: 2\ninterval: 0\n",
        )
        .unwrap();
        let host = host(&dir);

        let report = host.start().await.unwrap();
        assert_eq!(report.loaded, vec![ExtensionId::from("motd")]);
        assert_eq!(
            host.orchestrator().state(&ExtensionId::from("heartbeat")),
            Some(ExtensionState::FailedLoading)
        );
        assert_eq!(host.teardown().await.exit_code(), 0);
    }
}
