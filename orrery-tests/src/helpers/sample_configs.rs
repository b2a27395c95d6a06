//! Config types with known schemas

use orrery_core::config::serializers::DURATION;
use orrery_core::config::tree::ConfigTree;
use orrery_core::{ConfigFragment, ConfigSchema, LoggingSection, ModuleConfig};
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use super::harness::TEST_MODULE;

/// Unversioned config with a single counter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Plain {
    pub value: u32,
}

impl ModuleConfig for Plain {
    fn schema() -> ConfigSchema {
        ConfigSchema::new("plain", TEST_MODULE, "plain.yml")
    }
}

/// Schema at version 4. Each migration appends its number to `applied`;
/// version 4 also renames `timeout_ms` to the duration-typed `timeout`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Versioned {
    pub name: String,
    /// Milliseconds; a duration string in the file
    pub timeout: u64,
    pub applied: Vec<u32>,
    pub logging: LoggingSection,
}

fn applied(tree: &mut ConfigTree, version: u32) -> anyhow::Result<()> {
    let mut applied = tree
        .get("applied")
        .and_then(Value::as_sequence)
        .cloned()
        .unwrap_or_default();
    applied.push(Value::from(version));
    tree.set("applied", Value::Sequence(applied));
    Ok(())
}

impl ModuleConfig for Versioned {
    fn schema() -> ConfigSchema {
        ConfigSchema::new("versioned", TEST_MODULE, "versioned.yml")
            .with_typed_field("timeout", DURATION)
            .with_migration(3, |tree| applied(tree, 3))
            .with_migration(4, |tree| {
                if let Some(ms) = tree.remove("timeout_ms") {
                    tree.set("timeout", ms);
                }
                applied(tree, 4)
            })
    }

    fn fragments_mut(&mut self) -> Vec<&mut dyn ConfigFragment> {
        vec![&mut self.logging]
    }
}

/// Config whose schema forbids writing it back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Guarded {
    pub secret: String,
}

impl ModuleConfig for Guarded {
    fn schema() -> ConfigSchema {
        ConfigSchema::new("guarded", TEST_MODULE, "guarded.yml").read_only()
    }
}
