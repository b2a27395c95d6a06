//! Orrery core: extension lifecycle orchestration and versioned module configuration.
//!
//! The two halves are coupled only through [`ExtensionContext`]:
//! - [`orchestrator::Orchestrator`] drives every registered [`Extension`] through
//!   its lifecycle in dependency order.
//! - [`cache::ConfigCache`] materializes, migrates and persists one
//!   [`config::record::ConfigRecord`] per configuration schema on a single
//!   dedicated I/O worker.

pub mod cache;
pub mod config;
pub mod deps;
pub mod errors;
pub mod events;
pub mod extension;
pub mod host;
pub mod logging;
pub mod modules;
pub mod orchestrator;
pub mod settings;

pub use cache::{ConfigCache, EvictionCause};
pub use config::record::ConfigRecord;
pub use config::schema::{ConfigSchema, SchemaId};
pub use config::{ConfigFragment, LoggingSection, ModuleConfig};
pub use errors::{ConfigError, ConfigResult, ExtensionError};
pub use events::{LifecycleEvent, LifecycleNotifier, LifecycleReceiver};
pub use extension::{Extension, ExtensionContext, ExtensionId, ExtensionState, HookPhase};
pub use host::{Host, TeardownReport};
pub use modules::{ModuleHandle, ModuleId, ModuleRegistry, StaticModuleRegistry};
pub use orchestrator::{LoadReport, Orchestrator, OrchestratorError};
pub use settings::{FormatKind, HostSettings, SettingsError};
