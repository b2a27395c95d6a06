//! YAML format that counts parses and renders

use orrery_core::config::format::{TreeFormat, YamlFormat};
use serde_yaml::Value;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Every parse is one file read and every render one file write, so the
/// counters tell how many times the cache touched the disk.
#[derive(Debug, Default)]
pub struct CountingFormat {
    parses: AtomicUsize,
    renders: AtomicUsize,
}

impl CountingFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parses(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

impl TreeFormat for CountingFormat {
    fn name(&self) -> &'static str {
        "yaml"
    }

    fn extension(&self) -> &'static str {
        "yml"
    }

    fn parse(&self, text: &str) -> Result<Value, String> {
        self.parses.fetch_add(1, Ordering::SeqCst);
        YamlFormat.parse(text)
    }

    fn render(&self, root: &Value) -> Result<String, String> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        YamlFormat.render(root)
    }
}
