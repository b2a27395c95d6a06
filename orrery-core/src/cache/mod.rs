//! Single-flight cache of config records.
//!
//! The cache is an actor: a tokio task owns the entry map, the in-flight
//! table and eviction, and every disk operation is handed to one serial I/O
//! worker so writes across all schemas happen in a total order.
//!
//! ## Module Structure
//!
//! - `actor` - CacheActor (owns entries, in-flight builds, eviction)
//! - `handle` - ConfigCache (cheap-to-clone interface for sending commands)
//! - `command` - CacheCommand enum
//! - `worker` - IoWorker, the dedicated blocking thread for file I/O and user hooks

mod actor;
mod command;
mod handle;
mod worker;

use std::fmt;

pub use actor::CacheActor;
pub use handle::ConfigCache;

/// Why a record left the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvictionCause {
    /// `invalidate` / `invalidate_all`: unload hook and save run first.
    Explicit,
    /// A fresh construction took the key; the old record is dropped as-is.
    Replaced,
    /// The cache is shutting down; same side effects as `Explicit`.
    Shutdown,
}

impl EvictionCause {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionCause::Explicit => "explicit",
            EvictionCause::Replaced => "replaced",
            EvictionCause::Shutdown => "shutdown",
        }
    }

    /// Whether the evicted record gets its unload hook and a final save.
    pub fn runs_unload(&self) -> bool {
        !matches!(self, EvictionCause::Replaced)
    }
}

impl fmt::Display for EvictionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
