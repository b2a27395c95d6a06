//! Versioned, disk-backed module configuration.
//!
//! ## Module Structure
//!
//! - `schema` - SchemaId and ConfigSchema (identity, file name, migration map)
//! - `tree` - ConfigTree, the parsed file contents
//! - `format` - TreeFormat implementations (YAML, JSON)
//! - `serializers` - Converter trait and SerializerRegistry
//! - `loader` - ConfigLoader, bound to one file on disk
//! - `record` - ConfigRecord, the live instance plus its tree

pub mod format;
pub mod loader;
pub mod record;
pub mod schema;
pub mod serializers;
pub mod tree;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;
use tracing::warn;

use crate::logging::{self, DEFAULT_LOG_LEVEL};
use crate::modules::{ModuleHandle, ModuleId};
use schema::{ConfigSchema, SchemaId};

/// A configuration type that the cache can materialize.
///
/// Instances are deserialized from the tree with serde and written back by
/// re-serializing the live value, so unknown keys in the file survive saves.
pub trait ModuleConfig: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn schema() -> ConfigSchema;

    fn schema_id() -> SchemaId {
        Self::schema().id().clone()
    }

    /// Called once the instance is fully loaded and migrated.
    fn on_load(&mut self, _module: &ModuleHandle) {}

    /// Called on the I/O worker before the record is evicted.
    fn on_unload(&mut self) {}

    /// Embedded sections that must be bound to the owning module after load.
    fn fragments_mut(&mut self) -> Vec<&mut dyn ConfigFragment> {
        Vec::new()
    }
}

/// A reusable config section embedded inside a [`ModuleConfig`].
pub trait ConfigFragment: Send + Sync {
    fn attach(&mut self, module: &ModuleHandle);

    fn is_attached(&self) -> bool;
}

fn default_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Per-module log level section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(skip)]
    module: Option<ModuleId>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_level(),
            module: None,
        }
    }
}

impl LoggingSection {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            module: None,
        }
    }

    /// Lowercase the level, replacing unknown names with `info`.
    /// Returns false when the level had to be replaced.
    pub fn normalize(&mut self) -> bool {
        match logging::parse_level(&self.level) {
            Some(level) => {
                self.level = level.to_string();
                true
            }
            None => {
                warn!(
                    module = ?self.module.as_ref().map(ModuleId::as_str),
                    level = %self.level,
                    "Invalid log level, falling back to {}",
                    DEFAULT_LOG_LEVEL
                );
                self.level = default_level();
                false
            }
        }
    }

    pub fn level_filter(&self) -> LevelFilter {
        logging::level_filter(&self.level)
    }

    /// Module this section was attached to, if any.
    pub fn module(&self) -> Option<&ModuleId> {
        self.module.as_ref()
    }

    /// Make this level the effective filter for the owning module's target.
    /// Returns false while unattached.
    pub fn apply(&self) -> bool {
        match &self.module {
            Some(module) => logging::set_module_level(module.as_str(), &self.level),
            None => false,
        }
    }
}

impl ConfigFragment for LoggingSection {
    fn attach(&mut self, module: &ModuleHandle) {
        self.module = Some(module.id().clone());
        self.normalize();
        self.apply();
    }

    fn is_attached(&self) -> bool {
        self.module.is_some()
    }
}
