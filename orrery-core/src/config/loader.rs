//! File access for one config record.

use serde::de::DeserializeOwned;
use serde_yaml::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::format::TreeFormat;
use super::schema::{ConfigSchema, SchemaId};
use super::serializers::{Converter, SerializerRegistry};
use super::tree::{ConfigTree, TreePath};
use crate::errors::{ConfigError, ConfigResult};

/// Reads and writes one config file, applying the schema's typed-field
/// converters on the way in and out.
pub struct ConfigLoader {
    schema: SchemaId,
    path: PathBuf,
    format: Arc<dyn TreeFormat>,
    serializers: SerializerRegistry,
    typed_fields: Vec<(TreePath, String)>,
    read_only: bool,
}

impl ConfigLoader {
    /// Bind a loader to `path`, composing `base` converters with the schema's own.
    pub fn new(
        schema: &ConfigSchema,
        path: PathBuf,
        format: Arc<dyn TreeFormat>,
        base: &SerializerRegistry,
    ) -> Self {
        Self {
            schema: schema.id().clone(),
            path,
            format,
            serializers: SerializerRegistry::compose(base, schema.serializers()),
            typed_fields: schema.typed_fields().to_vec(),
            read_only: schema.is_read_only(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    pub fn format(&self) -> &dyn TreeFormat {
        self.format.as_ref()
    }

    /// Create the parent directory if needed.
    pub fn ensure_directory(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir),
            _ => Ok(()),
        }
    }

    /// False for read-only schemas and for files without write permission.
    pub fn can_save(&self) -> bool {
        if self.read_only {
            return false;
        }
        std::fs::metadata(&self.path)
            .map(|meta| !meta.permissions().readonly())
            .unwrap_or(true)
    }

    /// Parse the file. A missing file yields a virtual tree; a blank file
    /// yields an empty, non-virtual one.
    pub fn load(&self) -> ConfigResult<ConfigTree> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ConfigTree::virtual_empty());
            }
            Err(e) => return Err(ConfigError::io(&self.path, e)),
        };

        if text.trim().is_empty() {
            return Ok(ConfigTree::from_value(Value::Null));
        }

        let root = self
            .format
            .parse(&text)
            .map_err(|message| ConfigError::MalformedConfiguration {
                path: self.path.clone(),
                message,
            })?;
        Ok(ConfigTree::from_value(root))
    }

    /// Write the tree to a temp file next to the target, then rename it over.
    pub fn save(&self, tree: &ConfigTree) -> ConfigResult<()> {
        let text = self
            .format
            .render(tree.root())
            .map_err(|message| ConfigError::Encoding {
                schema: self.schema.clone(),
                message,
            })?;

        let parent = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp =
            tempfile::NamedTempFile::new_in(parent).map_err(|e| ConfigError::io(parent, e))?;
        tmp.write_all(text.as_bytes())
            .map_err(|e| ConfigError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| ConfigError::io(&self.path, e.error))?;
        Ok(())
    }

    /// Deserialize a live instance from the tree, decoding typed fields first.
    pub fn materialize<T: DeserializeOwned>(&self, tree: &ConfigTree) -> ConfigResult<T> {
        let decoded = self.decode_fields(tree)?;
        serde_yaml::from_value(decoded).map_err(|e| ConfigError::MalformedConfiguration {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Copy of the tree root with every typed field in deserializable form.
    pub fn decode_fields(&self, tree: &ConfigTree) -> ConfigResult<Value> {
        let mut scratch = tree.clone();
        for (field, type_name) in &self.typed_fields {
            let converter = self.converter(field, type_name)?;
            let Some(node) = tree.get(field.clone()) else {
                continue;
            };
            let decoded = converter
                .decode(node)
                .map_err(|message| ConfigError::MalformedConfiguration {
                    path: self.path.clone(),
                    message: format!("{field}: {message}"),
                })?;
            scratch.set(field.clone(), decoded);
        }
        Ok(scratch.into_root())
    }

    /// Turn a serialized instance back into file form.
    pub fn encode_fields(&self, value: Value) -> ConfigResult<Value> {
        let mut scratch = ConfigTree::from_value(value);
        for (field, type_name) in &self.typed_fields {
            let converter = self.converter(field, type_name)?;
            let Some(node) = scratch.get(field.clone()) else {
                continue;
            };
            let encoded = converter
                .encode(node)
                .map_err(|message| ConfigError::Encoding {
                    schema: self.schema.clone(),
                    message: format!("{field}: {message}"),
                })?;
            scratch.set(field.clone(), encoded);
        }
        Ok(scratch.into_root())
    }

    fn converter(&self, field: &TreePath, type_name: &str) -> ConfigResult<Arc<dyn Converter>> {
        self.serializers.get(type_name).ok_or_else(|| {
            ConfigError::MissingCollaborator(format!(
                "no converter for type '{type_name}' (field '{field}' of {})",
                self.schema
            ))
        })
    }
}
