//! Commands for the CacheActor

use std::sync::Arc;
use tokio::sync::oneshot;

use crate::config::record::{ConfigRecord, RecordContext};
use crate::config::schema::SchemaId;
use crate::errors::ConfigResult;

/// Monomorphized constructor for one config type, run on the I/O worker.
pub(crate) type Builder = Box<dyn FnOnce(&RecordContext) -> ConfigResult<ConfigRecord> + Send>;

pub(crate) type RecordReply = oneshot::Sender<ConfigResult<Arc<ConfigRecord>>>;

pub(crate) enum CacheCommand {
    Get {
        id: SchemaId,
        build: Builder,
        reply: RecordReply,
    },
    Reload {
        id: SchemaId,
        build: Builder,
        reply: RecordReply,
    },
    Save {
        id: SchemaId,
        reply: oneshot::Sender<ConfigResult<bool>>,
    },
    Invalidate {
        id: SchemaId,
        reply: oneshot::Sender<ConfigResult<bool>>,
    },
    InvalidateAll {
        reply: oneshot::Sender<ConfigResult<usize>>,
    },
    Contains {
        id: SchemaId,
        reply: oneshot::Sender<bool>,
    },
    Len {
        reply: oneshot::Sender<usize>,
    },
    Ids {
        reply: oneshot::Sender<Vec<SchemaId>>,
    },
    Shutdown {
        reply: oneshot::Sender<ConfigResult<usize>>,
    },
}
