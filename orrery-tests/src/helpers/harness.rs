//! Test harness that wires a host over a temporary data directory

use orrery_core::config::serializers::SerializerRegistry;
use orrery_core::{ConfigCache, Host, HostSettings, ModuleHandle, Orchestrator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use super::counting_format::CountingFormat;

/// Module every fixture config and extension belongs to.
pub const TEST_MODULE: &str = "core";

pub struct TestHarness {
    pub host: Host,
    pub format: Arc<CountingFormat>,
    pub module: ModuleHandle,
    dir: TempDir,
}

impl TestHarness {
    /// Create a harness with a fresh data directory. Must run inside a
    /// tokio runtime.
    pub fn new() -> std::io::Result<Self> {
        let dir = TempDir::new()?;
        let settings = HostSettings {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let format = Arc::new(CountingFormat::new());
        let host = Host::with_collaborators(settings, SerializerRegistry::defaults(), format.clone());
        let module = host.add_module(TEST_MODULE);
        Ok(Self {
            host,
            format,
            module,
            dir,
        })
    }

    pub fn cache(&self) -> &ConfigCache {
        self.host.cache()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        self.host.orchestrator()
    }

    pub fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Path of `file_name` inside the test module's data directory.
    pub fn config_path(&self, file_name: &str) -> PathBuf {
        self.module.data_dir().join(file_name)
    }

    /// Seed a config file before the cache first touches it.
    pub fn write_config(&self, file_name: &str, contents: &str) -> std::io::Result<PathBuf> {
        let path = self.config_path(file_name);
        std::fs::create_dir_all(self.module.data_dir())?;
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    pub fn read_config(&self, file_name: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.config_path(file_name))
    }
}
