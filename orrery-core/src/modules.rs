//! Host modules: the units that own a data directory.
//!
//! Config records resolve their owning module through a [`ModuleRegistry`]
//! passed in at construction, never through ambient lookup.

use dashmap::DashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Stable identity of a host module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ModuleId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A resolved module: its identity and the directory its config files live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    id: ModuleId,
    data_dir: PathBuf,
}

impl ModuleHandle {
    pub fn new(id: impl Into<ModuleId>, data_dir: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            data_dir: data_dir.into(),
        }
    }

    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

/// Resolves module identities to live module handles.
pub trait ModuleRegistry: Send + Sync {
    fn resolve(&self, id: &ModuleId) -> Option<ModuleHandle>;
}

/// In-memory module registry.
#[derive(Default)]
pub struct StaticModuleRegistry {
    modules: DashMap<ModuleId, ModuleHandle>,
}

impl StaticModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module, replacing any previous handle with the same id.
    pub fn register(&self, handle: ModuleHandle) -> Option<ModuleHandle> {
        self.modules.insert(handle.id().clone(), handle)
    }

    pub fn unregister(&self, id: &ModuleId) -> Option<ModuleHandle> {
        self.modules.remove(id).map(|(_, handle)| handle)
    }

    pub fn ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<_> = self.modules.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl ModuleRegistry for StaticModuleRegistry {
    fn resolve(&self, id: &ModuleId) -> Option<ModuleHandle> {
        self.modules.get(id).map(|h| h.clone())
    }
}

#[cfg(test)]
mod tests;
