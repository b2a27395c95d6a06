//! Ordered tree of named values backing every config file.

use serde_yaml::{Mapping, Value};
use std::fmt;

/// Key under which the schema version marker lives when a schema does not override it.
pub const DEFAULT_VERSION_KEY: &str = "version";

/// Dotted path into a [`ConfigTree`], e.g. `limits.timeout`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TreePath(Vec<String>);

impl TreePath {
    pub fn parse(path: &str) -> Self {
        Self(
            path.split('.')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

impl From<&str> for TreePath {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

/// Parsed config file contents.
///
/// A *virtual* tree stands in for a file that does not exist yet; it stays
/// virtual until it is first written.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: Value,
    is_virtual: bool,
}

impl ConfigTree {
    /// Empty tree with no file behind it.
    pub fn virtual_empty() -> Self {
        Self {
            root: Value::Mapping(Mapping::new()),
            is_virtual: true,
        }
    }

    /// Tree parsed from an existing file. A null document becomes an empty mapping.
    pub fn from_value(root: Value) -> Self {
        let root = match root {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other,
        };
        Self {
            root,
            is_virtual: false,
        }
    }

    pub fn is_virtual(&self) -> bool {
        self.is_virtual
    }

    pub(crate) fn mark_materialized(&mut self) {
        self.is_virtual = false;
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_root(self) -> Value {
        self.root
    }

    pub fn get(&self, path: impl Into<TreePath>) -> Option<&Value> {
        let path = path.into();
        let mut node = &self.root;
        for segment in path.segments() {
            node = node.as_mapping()?.get(segment.as_str())?;
        }
        Some(node)
    }

    pub fn get_mut(&mut self, path: impl Into<TreePath>) -> Option<&mut Value> {
        let path = path.into();
        let mut node = &mut self.root;
        for segment in path.segments() {
            node = node.as_mapping_mut()?.get_mut(segment.as_str())?;
        }
        Some(node)
    }

    /// Set a value, creating intermediate mappings. Non-mapping values on the
    /// way are replaced.
    pub fn set(&mut self, path: impl Into<TreePath>, value: Value) {
        let path = path.into();
        let Some((last, parents)) = path.segments().split_last() else {
            self.root = value;
            return;
        };

        let mut node = &mut self.root;
        for segment in parents {
            node = ensure_mapping(node)
                .entry(Value::String(segment.clone()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
        }
        ensure_mapping(node).insert(Value::String(last.clone()), value);
    }

    pub fn remove(&mut self, path: impl Into<TreePath>) -> Option<Value> {
        let path = path.into();
        let (last, parents) = path.segments().split_last()?;
        let mut node = &mut self.root;
        for segment in parents {
            node = node.as_mapping_mut()?.get_mut(segment.as_str())?;
        }
        node.as_mapping_mut()?.remove(last.as_str())
    }

    /// Move a value to a new path. Returns false when `from` is absent.
    pub fn rename(&mut self, from: impl Into<TreePath>, to: impl Into<TreePath>) -> bool {
        match self.remove(from) {
            Some(value) => {
                self.set(to, value);
                true
            }
            None => false,
        }
    }

    /// Read the schema version marker. Absent or non-numeric markers read as `None`.
    pub fn version(&self, key: &str) -> Option<u32> {
        match self.get(key)? {
            Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn set_version(&mut self, key: &str, version: u32) {
        self.set(key, Value::Number(version.into()));
    }

    /// Overwrite top-level keys with the entries of `value`.
    ///
    /// Keys not present in `value` (the version marker, unknown settings) are kept.
    pub fn merge_from(&mut self, value: Value) {
        match value {
            Value::Mapping(entries) => {
                let root = ensure_mapping(&mut self.root);
                for (key, value) in entries {
                    root.insert(key, value);
                }
            }
            Value::Null => {}
            other => self.root = other,
        }
    }
}

fn ensure_mapping(node: &mut Value) -> &mut Mapping {
    if !node.is_mapping() {
        *node = Value::Mapping(Mapping::new());
    }
    match node {
        Value::Mapping(mapping) => mapping,
        _ => unreachable!("node was just replaced with a mapping"),
    }
}

#[cfg(test)]
mod tests;
