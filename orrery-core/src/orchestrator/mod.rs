//! Dependency-ordered extension orchestration.
//!
//! The [`Orchestrator`] is the only writer of extension state. It drives
//! every registered extension through its lifecycle one at a time, in the
//! order computed by [`crate::deps`]:
//!
//! - a dependency cycle is reported before any hook runs
//! - an extension whose dependency is missing or not `Loaded` is marked
//!   `FailedLoading` without running its hook, and the batch continues
//! - `FailedLoading` is terminal for `start_all`; only `start(id)` on that
//!   extension retries its hook
//! - a registration that would close a cycle is rejected
//! - unload runs in exact reverse order and collects every failure

mod error;

pub use error::OrchestratorError;

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::cache::ConfigCache;
use crate::deps::{self, DependencyDecl};
use crate::errors::ExtensionError;
use crate::events::{LifecycleNotifier, LifecycleReceiver};
use crate::extension::{Extension, ExtensionContext, ExtensionId, ExtensionSlot, ExtensionState};
use crate::modules::{ModuleId, ModuleRegistry};

/// Outcome of a start batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Extensions that are `Loaded` after the batch, in load order
    pub loaded: Vec<ExtensionId>,
    /// Extensions that ended `FailedLoading`, with the reason
    pub failed: Vec<(ExtensionId, ExtensionError)>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn failed_ids(&self) -> Vec<&ExtensionId> {
        self.failed.iter().map(|(id, _)| id).collect()
    }
}

pub struct Orchestrator {
    /// Registration order; also the tie-break order for loading.
    slots: RwLock<Vec<Arc<ExtensionSlot>>>,
    modules: Arc<dyn ModuleRegistry>,
    cache: ConfigCache,
    notifier: LifecycleNotifier,
    /// Serializes start/stop batches.
    run_lock: tokio::sync::Mutex<()>,
}

impl Orchestrator {
    pub fn new(modules: Arc<dyn ModuleRegistry>, cache: ConfigCache) -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
            modules,
            cache,
            notifier: LifecycleNotifier::new(),
            run_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Register an extension owned by `owner`. Ids must be unique and the
    /// dependency graph must stay acyclic.
    pub fn register(
        &self,
        extension: Arc<dyn Extension>,
        owner: impl Into<ModuleId>,
    ) -> Result<(), OrchestratorError> {
        let slot = ExtensionSlot::new(extension, owner.into(), self.notifier.clone());
        let mut slots = self.slots.write();
        if slots.iter().any(|s| s.id() == slot.id()) {
            return Err(OrchestratorError::DuplicateExtension(slot.id().clone()));
        }
        let mut decls: Vec<DependencyDecl> = slots.iter().map(|s| decl_of(s)).collect();
        decls.push(decl_of(&slot));
        deps::load_order(&decls)?;

        debug!(
            extension = %slot.id(),
            owner = %slot.owner(),
            dependencies = ?slot.dependencies(),
            "Registered extension"
        );
        slots.push(Arc::new(slot));
        Ok(())
    }

    /// Receive every lifecycle transition from now on.
    pub fn subscribe(&self) -> LifecycleReceiver {
        self.notifier.subscribe()
    }

    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    /// Registered ids in registration order.
    pub fn ids(&self) -> Vec<ExtensionId> {
        self.slots.read().iter().map(|s| s.id().clone()).collect()
    }

    pub fn state(&self, id: &ExtensionId) -> Option<ExtensionState> {
        self.slot(id).map(|s| s.state())
    }

    /// Every extension's state, in registration order.
    pub fn states(&self) -> Vec<(ExtensionId, ExtensionState)> {
        self.slots
            .read()
            .iter()
            .map(|s| (s.id().clone(), s.state()))
            .collect()
    }

    pub fn load_order(&self) -> Result<Vec<ExtensionId>, OrchestratorError> {
        deps::load_order(&self.decls())
    }

    pub fn unload_order(&self) -> Result<Vec<ExtensionId>, OrchestratorError> {
        deps::unload_order(&self.decls())
    }

    /// Start every registered extension in dependency order.
    ///
    /// Only a dependency cycle fails the whole call; per-extension failures
    /// are logged and listed in the report.
    pub async fn start_all(&self) -> Result<LoadReport, OrchestratorError> {
        let _guard = self.run_lock.lock().await;
        let order = self.load_order()?;
        let report = self.start_sequence(order, None).await;
        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Started extensions"
        );
        Ok(report)
    }

    /// Start one extension after its transitive dependencies. This is the
    /// only way to retry an extension that is `FailedLoading`; failed
    /// dependencies are not retried along with it.
    pub async fn start(&self, id: &ExtensionId) -> Result<LoadReport, OrchestratorError> {
        let _guard = self.run_lock.lock().await;
        let decls = self.decls();
        deps::load_order(&decls)?;
        let order = deps::with_dependencies(id, &decls)?;
        Ok(self.start_sequence(order, Some(id)).await)
    }

    /// Stop every `Loaded` extension in reverse dependency order.
    ///
    /// Keeps going past failures and returns all of them together.
    pub async fn stop_all(&self) -> Result<(), OrchestratorError> {
        let _guard = self.run_lock.lock().await;
        let order = self.unload_order()?;
        let mut failures = Vec::new();

        for id in order {
            let Some(slot) = self.slot(&id) else {
                continue;
            };
            if slot.state() != ExtensionState::Loaded {
                continue;
            }
            let ctx = match slot.context() {
                Some(ctx) => ctx,
                None => match self.context_for(&slot) {
                    Ok(ctx) => ctx,
                    Err(e) => {
                        warn!(extension = %id, "Cannot stop extension: {}", e);
                        failures.push(e);
                        continue;
                    }
                },
            };
            if let Err(e) = slot.stop(&ctx).await {
                failures.push(e);
            }
        }

        if failures.is_empty() {
            info!("Stopped all extensions");
            Ok(())
        } else {
            Err(OrchestratorError::Shutdown(failures))
        }
    }

    async fn start_sequence(
        &self,
        order: Vec<ExtensionId>,
        retry: Option<&ExtensionId>,
    ) -> LoadReport {
        let mut report = LoadReport::default();
        for id in order {
            let Some(slot) = self.slot(&id) else {
                continue;
            };
            match slot.state() {
                ExtensionState::Loaded => {
                    report.loaded.push(id);
                    continue;
                }
                ExtensionState::FailedLoading if retry != Some(&id) => {
                    let reason = slot.last_failure().unwrap_or_else(|| {
                        ExtensionError::InvalidTransition {
                            extension: id.clone(),
                            action: "start",
                            state: ExtensionState::FailedLoading,
                        }
                    });
                    debug!(extension = %id, "Leaving failed extension alone");
                    report.failed.push((id, reason));
                    continue;
                }
                _ => {}
            }
            match self.start_slot(&slot).await {
                Ok(()) => report.loaded.push(id),
                Err(e) => report.failed.push((id, e)),
            }
        }
        report
    }

    async fn start_slot(&self, slot: &ExtensionSlot) -> Result<(), ExtensionError> {
        for dep in slot.dependencies() {
            let reason = match self.slot(dep) {
                None => Some("not registered".to_string()),
                Some(d) if d.state() != ExtensionState::Loaded => Some(d.state().to_string()),
                Some(_) => None,
            };
            if let Some(reason) = reason {
                let err = ExtensionError::DependencyUnavailable {
                    extension: slot.id().clone(),
                    dependency: dep.clone(),
                    reason,
                };
                slot.skip(&err);
                return Err(err);
            }
        }

        let ctx = match self.context_for(slot) {
            Ok(ctx) => ctx,
            Err(err) => {
                slot.skip(&err);
                return Err(err);
            }
        };
        slot.start(&ctx).await
    }

    fn context_for(&self, slot: &ExtensionSlot) -> Result<ExtensionContext, ExtensionError> {
        let module = self
            .modules
            .resolve(slot.owner())
            .ok_or_else(|| ExtensionError::MissingModule {
                extension: slot.id().clone(),
                module: slot.owner().clone(),
            })?;
        Ok(ExtensionContext::new(
            slot.id().clone(),
            module,
            self.cache.clone(),
        ))
    }

    fn slot(&self, id: &ExtensionId) -> Option<Arc<ExtensionSlot>> {
        self.slots.read().iter().find(|s| s.id() == id).cloned()
    }

    fn decls(&self) -> Vec<DependencyDecl> {
        self.slots.read().iter().map(|s| decl_of(s)).collect()
    }
}

fn decl_of(slot: &ExtensionSlot) -> DependencyDecl {
    DependencyDecl {
        id: slot.id().clone(),
        dependencies: slot.dependencies().to_vec(),
    }
}
