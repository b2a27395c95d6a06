//! The live, disk-backed instance of one configuration schema.

use parking_lot::{Mutex, RwLock};
use serde_yaml::Value;
use std::any::Any;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::format::TreeFormat;
use super::loader::ConfigLoader;
use super::schema::{ConfigSchema, SchemaId};
use super::serializers::SerializerRegistry;
use super::tree::ConfigTree;
use super::ModuleConfig;
use crate::errors::{ConfigError, ConfigResult};
use crate::modules::{ModuleHandle, ModuleRegistry};

/// Type-erased view of a [`ModuleConfig`] instance.
pub(crate) trait ConfigObject: Any + Send + Sync {
    fn to_value(&self) -> Result<Value, serde_yaml::Error>;
    fn attach_fragments(&mut self, module: &ModuleHandle);
    fn run_load_hook(&mut self, module: &ModuleHandle);
    fn run_unload_hook(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: ModuleConfig> ConfigObject for T {
    fn to_value(&self) -> Result<Value, serde_yaml::Error> {
        serde_yaml::to_value(self)
    }

    fn attach_fragments(&mut self, module: &ModuleHandle) {
        for fragment in self.fragments_mut() {
            fragment.attach(module);
        }
    }

    fn run_load_hook(&mut self, module: &ModuleHandle) {
        self.on_load(module);
    }

    fn run_unload_hook(&mut self) {
        self.on_unload();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Collaborators a record needs while it is being built.
#[derive(Clone)]
pub struct RecordContext {
    modules: Arc<dyn ModuleRegistry>,
    serializers: Arc<SerializerRegistry>,
    format: Arc<dyn TreeFormat>,
}

impl RecordContext {
    pub fn new(
        modules: Arc<dyn ModuleRegistry>,
        serializers: Arc<SerializerRegistry>,
        format: Arc<dyn TreeFormat>,
    ) -> Self {
        Self {
            modules,
            serializers,
            format,
        }
    }

    pub fn modules(&self) -> &dyn ModuleRegistry {
        self.modules.as_ref()
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    pub fn format(&self) -> &Arc<dyn TreeFormat> {
        &self.format
    }
}

struct DiskState {
    tree: ConfigTree,
    stored_version: Option<u32>,
}

/// One cached configuration: the live instance, the tree it was read from
/// and the loader bound to its file.
///
/// Every save re-serializes the instance into the tree before writing, so
/// the two never drift apart on disk.
pub struct ConfigRecord {
    schema: ConfigSchema,
    module: ModuleHandle,
    loader: ConfigLoader,
    instance: RwLock<Box<dyn ConfigObject>>,
    disk: Mutex<DiskState>,
}

impl ConfigRecord {
    /// Resolve, read, migrate and hook up a record for `T`.
    ///
    /// Performs blocking file I/O and runs user code; callers outside the
    /// cache's I/O worker should go through [`crate::cache::ConfigCache`].
    pub(crate) fn load<T: ModuleConfig>(ctx: &RecordContext) -> ConfigResult<Self> {
        let schema = T::schema();
        let module = ctx.modules().resolve(schema.module()).ok_or_else(|| {
            ConfigError::MissingCollaborator(format!(
                "module '{}' owning config {} is not registered",
                schema.module(),
                schema.id()
            ))
        })?;

        let path = module.data_dir().join(schema.file_name());
        let loader = ConfigLoader::new(&schema, path, ctx.format().clone(), ctx.serializers());
        if let Err(e) = loader.ensure_directory() {
            warn!(
                kind = "directory_unavailable",
                schema = %schema.id(),
                path = %loader.path().display(),
                "Config directory unavailable: {}",
                e
            );
        }

        let tree = loader.load()?;
        let existed = !tree.is_virtual();
        let instance: T = loader.materialize(&tree)?;
        let stored_version = tree.version(schema.version_key());
        debug!(
            schema = %schema.id(),
            path = %loader.path().display(),
            existed,
            "Read config"
        );

        let record = Self {
            schema,
            module,
            loader,
            instance: RwLock::new(Box::new(instance)),
            disk: Mutex::new(DiskState {
                tree,
                stored_version,
            }),
        };

        if existed {
            record.migrate::<T>()?;
        } else {
            record.save()?;
        }

        {
            let mut instance = record.instance.write();
            instance.attach_fragments(&record.module);
            instance.run_load_hook(&record.module);
        }

        Ok(record)
    }

    /// Apply pending migrations to the tree, then rebuild the instance from
    /// it and persist once if the version moved.
    ///
    /// `stored_version` only advances when the save actually writes.
    fn migrate<T: ModuleConfig>(&self) -> ConfigResult<()> {
        let key = self.schema.version_key();
        let mut disk = self.disk.lock();
        let start = disk.tree.version(key);

        let mut reached = start;
        for (version, migration) in self.schema.pending_migrations(start) {
            migration(&mut disk.tree).map_err(|e| ConfigError::MigrationFailure {
                schema: self.schema.id().clone(),
                version,
                message: format!("{e:#}"),
            })?;
            disk.tree.set_version(key, version);
            reached = Some(version);
        }

        if reached == start {
            return Ok(());
        }

        info!(
            schema = %self.schema.id(),
            from = ?start,
            to = ?reached,
            "Migrated config {}",
            self.loader.path().display()
        );

        let migrated: T = self.loader.materialize(&disk.tree)?;
        *self.instance.write() = Box::new(migrated);
        drop(disk);

        self.save()?;
        Ok(())
    }

    /// Write the live instance back to its file.
    ///
    /// Returns `Ok(false)` when the record is not writable or its directory is
    /// unavailable; neither is an error.
    pub fn save(&self) -> ConfigResult<bool> {
        if !self.loader.can_save() {
            debug!(schema = %self.schema.id(), "Config is read-only, skipping save");
            return Ok(false);
        }
        if let Err(e) = self.loader.ensure_directory() {
            warn!(
                kind = "directory_unavailable",
                schema = %self.schema.id(),
                path = %self.loader.path().display(),
                "Skipping config save: {}",
                e
            );
            return Ok(false);
        }

        let serialized = self.serialized()?;
        let encoded = self.loader.encode_fields(serialized)?;

        let key = self.schema.version_key();
        let mut disk = self.disk.lock();
        if disk.tree.version(key).is_none() {
            disk.tree.set_version(key, self.schema.current_version());
        }
        disk.tree.merge_from(encoded);
        self.loader.save(&disk.tree)?;
        disk.tree.mark_materialized();
        disk.stored_version = disk.tree.version(key);

        debug!(schema = %self.schema.id(), path = %self.loader.path().display(), "Saved config");
        Ok(true)
    }

    /// Run the instance's unload hook.
    pub(crate) fn unload(&self) {
        self.instance.write().run_unload_hook();
    }

    /// Borrow the live instance as `T`.
    pub fn read<T: ModuleConfig, R>(&self, f: impl FnOnce(&T) -> R) -> ConfigResult<R> {
        let instance = self.instance.read();
        let value = instance
            .as_any()
            .downcast_ref::<T>()
            .ok_or_else(|| self.type_mismatch::<T>())?;
        Ok(f(value))
    }

    /// Mutate the live instance in memory. Persist with
    /// [`ConfigCache::save`](crate::cache::ConfigCache::save).
    pub fn update<T: ModuleConfig, R>(&self, f: impl FnOnce(&mut T) -> R) -> ConfigResult<R> {
        let mut instance = self.instance.write();
        let value = instance
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or_else(|| self.type_mismatch::<T>())?;
        Ok(f(value))
    }

    pub fn snapshot<T: ModuleConfig + Clone>(&self) -> ConfigResult<T> {
        self.read(|value: &T| value.clone())
    }

    /// The instance as a plain value tree, before typed-field encoding.
    pub fn serialized(&self) -> ConfigResult<Value> {
        let instance = self.instance.read();
        instance.to_value().map_err(|e| ConfigError::Encoding {
            schema: self.schema.id().clone(),
            message: e.to_string(),
        })
    }

    /// Copy of the tree as last read, migrated or saved.
    pub fn tree(&self) -> ConfigTree {
        self.disk.lock().tree.clone()
    }

    /// Version marker of the file on disk, `None` if it carries none.
    pub fn stored_version(&self) -> Option<u32> {
        self.disk.lock().stored_version
    }

    pub fn id(&self) -> &SchemaId {
        self.schema.id()
    }

    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    pub fn module(&self) -> &ModuleHandle {
        &self.module
    }

    pub fn path(&self) -> &Path {
        self.loader.path()
    }

    pub fn can_save(&self) -> bool {
        self.loader.can_save()
    }

    fn type_mismatch<T>(&self) -> ConfigError {
        ConfigError::TypeMismatch {
            schema: self.schema.id().clone(),
            expected: std::any::type_name::<T>(),
        }
    }
}

impl PartialEq for ConfigRecord {
    fn eq(&self, other: &Self) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        if self.schema.id() != other.schema.id() || self.module.id() != other.module.id() {
            return false;
        }
        match (self.serialized(), other.serialized()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Debug for ConfigRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigRecord")
            .field("schema", self.schema.id())
            .field("module", self.module.id())
            .field("path", &self.loader.path())
            .field("stored_version", &self.stored_version())
            .finish()
    }
}
