//! ConfigCache - handle for communicating with the CacheActor
//!
//! Cheap to clone; every clone talks to the same actor.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::actor::CacheActor;
use super::command::{Builder, CacheCommand};
use crate::config::format::{TreeFormat, YamlFormat};
use crate::config::record::{ConfigRecord, RecordContext};
use crate::config::schema::SchemaId;
use crate::config::serializers::SerializerRegistry;
use crate::config::ModuleConfig;
use crate::errors::{ConfigError, ConfigResult};
use crate::modules::ModuleRegistry;

#[derive(Clone)]
pub struct ConfigCache {
    tx: mpsc::Sender<CacheCommand>,
}

impl ConfigCache {
    pub(super) fn new(tx: mpsc::Sender<CacheCommand>) -> Self {
        Self { tx }
    }

    /// Start a cache actor and its I/O worker on the current runtime.
    pub fn spawn(
        modules: Arc<dyn ModuleRegistry>,
        serializers: Arc<SerializerRegistry>,
        format: Arc<dyn TreeFormat>,
    ) -> Self {
        let (handle, actor) = CacheActor::create(RecordContext::new(modules, serializers, format));
        tokio::spawn(actor.run());
        handle
    }

    /// [`spawn`](Self::spawn) with the default converters and YAML files.
    pub fn with_defaults(modules: Arc<dyn ModuleRegistry>) -> Self {
        Self::spawn(
            modules,
            Arc::new(SerializerRegistry::defaults()),
            Arc::new(YamlFormat),
        )
    }

    /// The cached record for `T`, constructing it on a miss.
    ///
    /// Concurrent calls for the same schema share one construction and get
    /// the same `Arc`. A failed construction is reported to each of them and
    /// nothing is cached, so the next call retries.
    pub async fn get<T: ModuleConfig>(&self) -> ConfigResult<Arc<ConfigRecord>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CacheCommand::Get {
            id: T::schema_id(),
            build: builder::<T>(),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ConfigError::CacheClosed)?
    }

    /// Re-read `T` from disk and replace the cached record.
    ///
    /// The replaced record gets no unload hook and no save. On failure the
    /// previous record stays cached.
    pub async fn reload<T: ModuleConfig>(&self) -> ConfigResult<Arc<ConfigRecord>> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CacheCommand::Reload {
            id: T::schema_id(),
            build: builder::<T>(),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ConfigError::CacheClosed)?
    }

    /// Persist a cached record on the I/O worker. `Ok(false)` means the
    /// record is not writable.
    pub async fn save(&self, id: &SchemaId) -> ConfigResult<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CacheCommand::Save {
            id: id.clone(),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ConfigError::CacheClosed)?
    }

    /// Evict one record after running its unload hook and saving it.
    /// Returns false if it was not cached.
    pub async fn invalidate(&self, id: &SchemaId) -> ConfigResult<bool> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CacheCommand::Invalidate {
            id: id.clone(),
            reply: reply_tx,
        })
        .await?;
        reply_rx.await.map_err(|_| ConfigError::CacheClosed)?
    }

    /// Evict everything in insertion order. Returns how many records were evicted.
    pub async fn invalidate_all(&self) -> ConfigResult<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CacheCommand::InvalidateAll { reply: reply_tx })
            .await?;
        reply_rx.await.map_err(|_| ConfigError::CacheClosed)?
    }

    pub async fn contains(&self, id: &SchemaId) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self
            .send(CacheCommand::Contains {
                id: id.clone(),
                reply: reply_tx,
            })
            .await
            .is_err()
        {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    pub async fn len(&self) -> usize {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.send(CacheCommand::Len { reply: reply_tx }).await.is_err() {
            return 0;
        }
        reply_rx.await.unwrap_or(0)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Cached schema ids in insertion order.
    pub async fn ids(&self) -> Vec<SchemaId> {
        let (reply_tx, reply_rx) = oneshot::channel();
        if self.send(CacheCommand::Ids { reply: reply_tx }).await.is_err() {
            return Vec::new();
        }
        reply_rx.await.unwrap_or_default()
    }

    /// Evict everything, then stop the actor. Later calls on any clone fail
    /// with [`ConfigError::CacheClosed`].
    pub async fn shutdown(&self) -> ConfigResult<usize> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.send(CacheCommand::Shutdown { reply: reply_tx }).await?;
        reply_rx.await.map_err(|_| ConfigError::CacheClosed)?
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    async fn send(&self, cmd: CacheCommand) -> ConfigResult<()> {
        self.tx.send(cmd).await.map_err(|_| {
            warn!("Config cache closed, dropping command");
            ConfigError::CacheClosed
        })
    }
}

fn builder<T: ModuleConfig>() -> Builder {
    Box::new(|ctx: &RecordContext| ConfigRecord::load::<T>(ctx))
}
