//! Extensions and their lifecycle state machine.
//!
//! ```text
//! Unloaded ─start─► Loading ─ok─► Loaded ─stop─► Unloading ─ok─► Unloaded
//!                      │                            │
//!                      └─err─► FailedLoading        └─err─► FailedUnloading
//! ```
//!
//! Failed states are terminal for their cycle; only a new `start()` (or a
//! retried `stop()` from `FailedUnloading`) leaves them.

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info};

use crate::cache::ConfigCache;
use crate::config::record::ConfigRecord;
use crate::config::ModuleConfig;
use crate::errors::{ConfigResult, ExtensionError, panic_message};
use crate::events::{LifecycleEvent, LifecycleNotifier};
use crate::modules::{ModuleHandle, ModuleId};

/// Unique name of an extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(String);

impl ExtensionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ExtensionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ExtensionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtensionState {
    Unloaded,
    Loading,
    Loaded,
    FailedLoading,
    Unloading,
    FailedUnloading,
}

impl ExtensionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtensionState::Unloaded => "unloaded",
            ExtensionState::Loading => "loading",
            ExtensionState::Loaded => "loaded",
            ExtensionState::FailedLoading => "failed_loading",
            ExtensionState::Unloading => "unloading",
            ExtensionState::FailedUnloading => "failed_unloading",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            ExtensionState::FailedLoading | ExtensionState::FailedUnloading
        )
    }

    pub fn can_start(&self) -> bool {
        matches!(
            self,
            ExtensionState::Unloaded
                | ExtensionState::FailedLoading
                | ExtensionState::FailedUnloading
        )
    }

    pub fn can_stop(&self) -> bool {
        matches!(
            self,
            ExtensionState::Loaded | ExtensionState::FailedUnloading
        )
    }
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which user hook an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    Enable,
    Disable,
}

impl HookPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookPhase::Enable => "enable",
            HookPhase::Disable => "disable",
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit with an enable/disable lifecycle, driven by the orchestrator.
#[async_trait]
pub trait Extension: Send + Sync {
    fn id(&self) -> ExtensionId;

    /// Extensions that must be loaded before this one.
    fn dependencies(&self) -> Vec<ExtensionId> {
        Vec::new()
    }

    async fn on_enable(&self, ctx: &ExtensionContext) -> anyhow::Result<()>;

    async fn on_disable(&self, _ctx: &ExtensionContext) -> anyhow::Result<()> {
        Ok(())
    }
}

/// What a hook can reach: its owning module and the config cache.
#[derive(Clone)]
pub struct ExtensionContext {
    extension: ExtensionId,
    module: ModuleHandle,
    cache: ConfigCache,
}

impl ExtensionContext {
    pub fn new(extension: ExtensionId, module: ModuleHandle, cache: ConfigCache) -> Self {
        Self {
            extension,
            module,
            cache,
        }
    }

    pub fn extension(&self) -> &ExtensionId {
        &self.extension
    }

    pub fn module(&self) -> &ModuleHandle {
        &self.module
    }

    pub fn cache(&self) -> &ConfigCache {
        &self.cache
    }

    /// Shorthand for `ctx.cache().get::<T>()`.
    pub async fn config<T: ModuleConfig>(&self) -> ConfigResult<Arc<ConfigRecord>> {
        self.cache.get::<T>().await
    }
}

/// A registered extension plus its state cell. Only the orchestrator holds these.
pub(crate) struct ExtensionSlot {
    id: ExtensionId,
    dependencies: Vec<ExtensionId>,
    owner: ModuleId,
    extension: Arc<dyn Extension>,
    state: RwLock<ExtensionState>,
    /// Context of the last successful start, reused by stop.
    context: Mutex<Option<ExtensionContext>>,
    /// Why the last start attempt failed.
    failure: Mutex<Option<ExtensionError>>,
    notifier: LifecycleNotifier,
}

impl ExtensionSlot {
    pub(crate) fn new(
        extension: Arc<dyn Extension>,
        owner: ModuleId,
        notifier: LifecycleNotifier,
    ) -> Self {
        Self {
            id: extension.id(),
            dependencies: extension.dependencies(),
            owner,
            extension,
            state: RwLock::new(ExtensionState::Unloaded),
            context: Mutex::new(None),
            failure: Mutex::new(None),
            notifier,
        }
    }

    pub(crate) fn id(&self) -> &ExtensionId {
        &self.id
    }

    pub(crate) fn dependencies(&self) -> &[ExtensionId] {
        &self.dependencies
    }

    pub(crate) fn owner(&self) -> &ModuleId {
        &self.owner
    }

    pub(crate) fn state(&self) -> ExtensionState {
        *self.state.read()
    }

    pub(crate) fn context(&self) -> Option<ExtensionContext> {
        self.context.lock().clone()
    }

    pub(crate) fn last_failure(&self) -> Option<ExtensionError> {
        self.failure.lock().clone()
    }

    pub(crate) fn set_state(&self, state: ExtensionState) {
        *self.state.write() = state;
        if state.is_failed() {
            error!(extension = %self.id, state = %state, "Extension {} is {}", self.id, state);
        } else {
            info!(extension = %self.id, state = %state, "Extension {} is {}", self.id, state);
        }
        self.notifier
            .notify(LifecycleEvent::new(self.id.clone(), state));
    }

    /// Mark this extension failed without running its enable hook.
    pub(crate) fn skip(&self, reason: &ExtensionError) {
        error!(extension = %self.id, "Not loading extension: {}", reason);
        *self.failure.lock() = Some(reason.clone());
        self.set_state(ExtensionState::FailedLoading);
    }

    /// `Unloaded`/`Failed*` → `Loading` → `Loaded` or `FailedLoading`.
    pub(crate) async fn start(&self, ctx: &ExtensionContext) -> Result<(), ExtensionError> {
        let current = self.state();
        if !current.can_start() {
            return Err(ExtensionError::InvalidTransition {
                extension: self.id.clone(),
                action: "start",
                state: current,
            });
        }

        self.set_state(ExtensionState::Loading);
        match self.run_hook(HookPhase::Enable, ctx).await {
            Ok(()) => {
                *self.context.lock() = Some(ctx.clone());
                *self.failure.lock() = None;
                self.set_state(ExtensionState::Loaded);
                Ok(())
            }
            Err(e) => {
                error!(extension = %self.id, "{}", e);
                *self.failure.lock() = Some(e.clone());
                self.set_state(ExtensionState::FailedLoading);
                Err(e)
            }
        }
    }

    /// `Loaded`/`FailedUnloading` → `Unloading` → `Unloaded` or `FailedUnloading`.
    pub(crate) async fn stop(&self, ctx: &ExtensionContext) -> Result<(), ExtensionError> {
        let current = self.state();
        if !current.can_stop() {
            return Err(ExtensionError::InvalidTransition {
                extension: self.id.clone(),
                action: "stop",
                state: current,
            });
        }

        self.set_state(ExtensionState::Unloading);
        match self.run_hook(HookPhase::Disable, ctx).await {
            Ok(()) => {
                self.set_state(ExtensionState::Unloaded);
                Ok(())
            }
            Err(e) => {
                error!(extension = %self.id, "{}", e);
                self.set_state(ExtensionState::FailedUnloading);
                Err(e)
            }
        }
    }

    /// Run a user hook, turning errors and panics into [`ExtensionError::HookFailure`].
    async fn run_hook(&self, phase: HookPhase, ctx: &ExtensionContext) -> Result<(), ExtensionError> {
        let hook = match phase {
            HookPhase::Enable => self.extension.on_enable(ctx),
            HookPhase::Disable => self.extension.on_disable(ctx),
        };

        let message = match AssertUnwindSafe(hook).catch_unwind().await {
            Ok(Ok(())) => return Ok(()),
            Ok(Err(e)) => format!("{e:#}"),
            Err(payload) => format!("panicked: {}", panic_message(&*payload)),
        };
        Err(ExtensionError::HookFailure {
            extension: self.id.clone(),
            phase,
            message,
        })
    }
}
