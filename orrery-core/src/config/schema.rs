//! Identity and migration map of one configuration type.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::serializers::{Converter, SerializerRegistry};
use super::tree::{ConfigTree, DEFAULT_VERSION_KEY, TreePath};
use crate::modules::ModuleId;

/// Stable key of one configuration shape; the config cache is keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SchemaId(String);

impl SchemaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Transformation that upgrades a tree to one schema version.
pub type Migration = Arc<dyn Fn(&mut ConfigTree) -> anyhow::Result<()> + Send + Sync>;

/// Everything the cache needs to materialize a config type.
#[derive(Clone)]
pub struct ConfigSchema {
    id: SchemaId,
    module: ModuleId,
    file_name: String,
    version_key: String,
    migrations: BTreeMap<u32, Migration>,
    serializers: SerializerRegistry,
    typed_fields: Vec<(TreePath, String)>,
    read_only: bool,
}

impl ConfigSchema {
    pub fn new(
        id: impl Into<SchemaId>,
        module: impl Into<ModuleId>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            module: module.into(),
            file_name: file_name.into(),
            version_key: DEFAULT_VERSION_KEY.to_string(),
            migrations: BTreeMap::new(),
            serializers: SerializerRegistry::new(),
            typed_fields: Vec::new(),
            read_only: false,
        }
    }

    /// Register the transformation that brings a tree up to `version`.
    pub fn with_migration<F>(mut self, version: u32, migration: F) -> Self
    where
        F: Fn(&mut ConfigTree) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.migrations.insert(version, Arc::new(migration));
        self
    }

    /// Add a schema-specific converter; it shadows base converters of the same name.
    pub fn with_converter(
        mut self,
        type_name: impl Into<String>,
        converter: impl Converter + 'static,
    ) -> Self {
        self.serializers.register(type_name, converter);
        self
    }

    /// Route the value at `path` through the converter named `type_name`.
    pub fn with_typed_field(mut self, path: &str, type_name: impl Into<String>) -> Self {
        self.typed_fields.push((TreePath::parse(path), type_name.into()));
        self
    }

    pub fn with_version_key(mut self, key: impl Into<String>) -> Self {
        self.version_key = key.into();
        self
    }

    /// Never write this config back to disk.
    pub fn read_only(mut self) -> Self {
        self.read_only = true;
        self
    }

    pub fn id(&self) -> &SchemaId {
        &self.id
    }

    pub fn module(&self) -> &ModuleId {
        &self.module
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn version_key(&self) -> &str {
        &self.version_key
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    pub fn typed_fields(&self) -> &[(TreePath, String)] {
        &self.typed_fields
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Highest registered migration version, 0 without migrations.
    pub fn current_version(&self) -> u32 {
        self.migrations.keys().next_back().copied().unwrap_or(0)
    }

    /// Migrations newer than `stored`, in ascending order. An unversioned tree
    /// gets all of them.
    pub fn pending_migrations(&self, stored: Option<u32>) -> impl Iterator<Item = (u32, &Migration)> {
        self.migrations
            .iter()
            .filter(move |(version, _)| stored.is_none_or(|s| **version > s))
            .map(|(version, migration)| (*version, migration))
    }
}

impl fmt::Debug for ConfigSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSchema")
            .field("id", &self.id)
            .field("module", &self.module)
            .field("file_name", &self.file_name)
            .field("version_key", &self.version_key)
            .field("migrations", &self.migrations.keys().collect::<Vec<_>>())
            .field("serializers", &self.serializers)
            .field("read_only", &self.read_only)
            .finish()
    }
}
