//! Wiring of modules, config cache and orchestrator, plus orderly teardown.

use std::sync::Arc;
use tracing::{error, info};

use crate::cache::ConfigCache;
use crate::config::format::TreeFormat;
use crate::config::serializers::SerializerRegistry;
use crate::errors::{ConfigError, ExtensionError};
use crate::extension::Extension;
use crate::modules::{ModuleHandle, ModuleId, StaticModuleRegistry};
use crate::orchestrator::{LoadReport, Orchestrator, OrchestratorError};
use crate::settings::HostSettings;

/// What went wrong while shutting down.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Extensions whose disable hook failed
    pub unload_failures: Vec<ExtensionError>,
    /// Failures evicting or saving cached configs
    pub config_errors: Vec<ConfigError>,
    /// The unload order could not be computed
    pub ordering_error: Option<OrchestratorError>,
}

impl TeardownReport {
    pub fn is_clean(&self) -> bool {
        self.unload_failures.is_empty()
            && self.config_errors.is_empty()
            && self.ordering_error.is_none()
    }

    /// Process exit code: 0 when clean, 1 otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_clean() { 0 } else { 1 }
    }
}

pub struct Host {
    settings: HostSettings,
    modules: Arc<StaticModuleRegistry>,
    cache: ConfigCache,
    orchestrator: Orchestrator,
}

impl Host {
    /// Host with the default converters and the format named in `settings`.
    /// Must be called inside a tokio runtime.
    pub fn new(settings: HostSettings) -> Self {
        let format = settings.format.tree_format();
        Self::with_collaborators(settings, SerializerRegistry::defaults(), format)
    }

    pub fn with_collaborators(
        settings: HostSettings,
        serializers: SerializerRegistry,
        format: Arc<dyn TreeFormat>,
    ) -> Self {
        let modules = Arc::new(StaticModuleRegistry::new());
        let cache = ConfigCache::spawn(modules.clone(), Arc::new(serializers), format);
        let orchestrator = Orchestrator::new(modules.clone(), cache.clone());
        Self {
            settings,
            modules,
            cache,
            orchestrator,
        }
    }

    /// Register a module whose data lives in `<data_dir>/<id>`.
    pub fn add_module(&self, id: impl Into<ModuleId>) -> ModuleHandle {
        let id = id.into();
        let handle = ModuleHandle::new(id.clone(), self.settings.module_dir(&id));
        self.modules.register(handle.clone());
        handle
    }

    /// Register an extension unless the settings disable it.
    /// Returns whether it was registered.
    pub fn register(
        &self,
        extension: Arc<dyn Extension>,
        owner: impl Into<ModuleId>,
    ) -> Result<bool, OrchestratorError> {
        let id = extension.id();
        if !self.settings.is_enabled(&id) {
            info!(extension = %id, "Extension disabled by settings");
            return Ok(false);
        }
        self.orchestrator.register(extension, owner)?;
        Ok(true)
    }

    /// Start every registered extension. Each failure has already been
    /// logged by the time the report is returned.
    pub async fn start(&self) -> Result<LoadReport, OrchestratorError> {
        self.orchestrator.start_all().await
    }

    /// Stop every extension in reverse order, then flush and close the config cache.
    pub async fn teardown(&self) -> TeardownReport {
        let mut report = TeardownReport::default();

        match self.orchestrator.stop_all().await {
            Ok(()) => {}
            Err(OrchestratorError::Shutdown(failures)) => report.unload_failures = failures,
            Err(e) => {
                error!("Cannot stop extensions: {}", e);
                report.ordering_error = Some(e);
            }
        }

        if let Err(e) = self.cache.invalidate_all().await {
            error!("Failed to flush configs: {}", e);
            report.config_errors.push(e);
        }
        match self.cache.shutdown().await {
            Ok(_) | Err(ConfigError::CacheClosed) => {}
            Err(e) => report.config_errors.push(e),
        }

        if report.is_clean() {
            info!("Teardown complete");
        } else {
            error!(
                unload_failures = report.unload_failures.len(),
                config_errors = report.config_errors.len(),
                "Teardown finished with errors"
            );
        }
        report
    }

    pub fn settings(&self) -> &HostSettings {
        &self.settings
    }

    pub fn modules(&self) -> &Arc<StaticModuleRegistry> {
        &self.modules
    }

    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }
}

#[cfg(test)]
mod tests;
