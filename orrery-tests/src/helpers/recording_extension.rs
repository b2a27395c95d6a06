//! Extension that journals its hooks and can be told to misbehave

use async_trait::async_trait;
use orrery_core::{Extension, ExtensionContext, ExtensionId};
use parking_lot::Mutex;
use std::sync::Arc;

/// Shared, ordered log of `enable:<id>` / `disable:<id>` entries.
#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: String) {
        self.0.lock().push(entry);
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Fault {
    #[default]
    None,
    Error,
    Panic,
}

pub struct RecordingExtension {
    id: String,
    dependencies: Vec<String>,
    on_enable: Fault,
    on_disable: Fault,
    journal: Journal,
}

impl RecordingExtension {
    pub fn new(id: &str, journal: &Journal) -> Self {
        Self {
            id: id.to_string(),
            dependencies: Vec::new(),
            on_enable: Fault::None,
            on_disable: Fault::None,
            journal: journal.clone(),
        }
    }

    pub fn depends_on(mut self, dependencies: &[&str]) -> Self {
        self.dependencies = dependencies.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn failing_enable(mut self) -> Self {
        self.on_enable = Fault::Error;
        self
    }

    pub fn panicking_enable(mut self) -> Self {
        self.on_enable = Fault::Panic;
        self
    }

    pub fn failing_disable(mut self) -> Self {
        self.on_disable = Fault::Error;
        self
    }

    pub fn into_arc(self) -> Arc<dyn Extension> {
        Arc::new(self)
    }

    fn record(&self, phase: &str, fault: Fault) -> anyhow::Result<()> {
        self.journal.push(format!("{phase}:{}", self.id));
        match fault {
            Fault::None => Ok(()),
            Fault::Error => anyhow::bail!("{} refused to {phase}", self.id),
            Fault::Panic => panic!("{} blew up during {phase}", self.id),
        }
    }
}

#[async_trait]
impl Extension for RecordingExtension {
    fn id(&self) -> ExtensionId {
        ExtensionId::new(self.id.clone())
    }

    fn dependencies(&self) -> Vec<ExtensionId> {
        self.dependencies.iter().cloned().map(ExtensionId::from).collect()
    }

    async fn on_enable(&self, _ctx: &ExtensionContext) -> anyhow::Result<()> {
        self.record("enable", self.on_enable)
    }

    async fn on_disable(&self, _ctx: &ExtensionContext) -> anyhow::Result<()> {
        self.record("disable", self.on_disable)
    }
}
