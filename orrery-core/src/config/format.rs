//! On-disk encodings for [`ConfigTree`](super::tree::ConfigTree) roots.

use serde_yaml::Value;
use std::fmt;

/// Text encoding for config files.
pub trait TreeFormat: Send + Sync + fmt::Debug {
    /// Short name, also used by host settings (`yaml`, `json`).
    fn name(&self) -> &'static str;

    /// Conventional file extension, without the dot.
    fn extension(&self) -> &'static str;

    fn parse(&self, text: &str) -> Result<Value, String>;

    fn render(&self, root: &Value) -> Result<String, String>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlFormat;

impl TreeFormat for YamlFormat {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extension(&self) -> &'static str {
        "yml"
    }

    fn parse(&self, text: &str) -> Result<Value, String> {
        serde_yaml::from_str(text).map_err(|e| match e.location() {
            Some(loc) => format!("Line {}, Column {}: {}", loc.line(), loc.column(), e),
            None => e.to_string(),
        })
    }

    fn render(&self, root: &Value) -> Result<String, String> {
        serde_yaml::to_string(root).map_err(|e| e.to_string())
    }
}

/// Pretty-printed JSON. Mapping keys must be strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormat;

impl TreeFormat for JsonFormat {
    fn name(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn parse(&self, text: &str) -> Result<Value, String> {
        let json: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| format!("Line {}, Column {}: {}", e.line(), e.column(), e))?;
        serde_yaml::to_value(json).map_err(|e| e.to_string())
    }

    fn render(&self, root: &Value) -> Result<String, String> {
        let mut text = serde_json::to_string_pretty(root).map_err(|e| e.to_string())?;
        text.push('\n');
        Ok(text)
    }
}
