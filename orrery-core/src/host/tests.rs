use super::*;
use crate::config::schema::ConfigSchema;
use crate::config::ModuleConfig;
use crate::extension::{ExtensionContext, ExtensionId, ExtensionState};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::TempDir;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct Visits {
    count: u32,
}

impl ModuleConfig for Visits {
    fn schema() -> ConfigSchema {
        ConfigSchema::new("visits", "site", "visits.yml")
    }
}

struct Counter {
    fail_disable: bool,
}

#[async_trait]
impl Extension for Counter {
    fn id(&self) -> ExtensionId {
        ExtensionId::from("counter")
    }

    async fn on_enable(&self, ctx: &ExtensionContext) -> anyhow::Result<()> {
        let record = ctx.config::<Visits>().await?;
        record.update(|v: &mut Visits| v.count += 1)?;
        Ok(())
    }

    async fn on_disable(&self, _ctx: &ExtensionContext) -> anyhow::Result<()> {
        if self.fail_disable {
            anyhow::bail!("counter is stuck");
        }
        Ok(())
    }
}

fn host(dir: &TempDir) -> Host {
    let settings = HostSettings {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let host = Host::new(settings);
    host.add_module("site");
    host
}

#[tokio::test]
async fn test_clean_teardown_persists_configs() {
    let dir = TempDir::new().unwrap();
    let host = host(&dir);
    host.register(Arc::new(Counter { fail_disable: false }), "site")
        .unwrap();

    let report = host.start().await.unwrap();
    assert!(report.is_clean());

    let teardown = host.teardown().await;
    assert!(teardown.is_clean());
    assert_eq!(teardown.exit_code(), 0);

    let text = std::fs::read_to_string(dir.path().join("site/visits.yml")).unwrap();
    assert!(text.contains("count: 1"), "unexpected file: {text}");
}

#[tokio::test]
async fn test_failed_unload_sets_exit_code() {
    let dir = TempDir::new().unwrap();
    let host = host(&dir);
    host.register(Arc::new(Counter { fail_disable: true }), "site")
        .unwrap();
    host.start().await.unwrap();

    let teardown = host.teardown().await;
    assert_eq!(teardown.unload_failures.len(), 1);
    assert_eq!(teardown.exit_code(), 1);
    assert_eq!(
        host.orchestrator().state(&ExtensionId::from("counter")),
        Some(ExtensionState::FailedUnloading)
    );
}

#[tokio::test]
async fn test_disabled_extension_is_not_registered() {
    let dir = TempDir::new().unwrap();
    let mut settings = HostSettings {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    settings.extensions.insert("counter".to_string(), false);
    let host = Host::new(settings);

    let registered = host
        .register(Arc::new(Counter { fail_disable: false }), "site")
        .unwrap();
    assert!(!registered);
    assert!(host.orchestrator().ids().is_empty());
}
