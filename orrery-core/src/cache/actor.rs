//! CacheActor - owns the cached records and serializes every change to them.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::command::{Builder, CacheCommand, RecordReply};
use super::handle::ConfigCache;
use super::worker::IoWorker;
use super::EvictionCause;
use crate::config::record::{ConfigRecord, RecordContext};
use crate::config::schema::SchemaId;
use crate::errors::{ConfigError, ConfigResult};

/// A construction that finished on the I/O worker.
struct Completion {
    id: SchemaId,
    result: ConfigResult<Arc<ConfigRecord>>,
}

pub struct CacheActor {
    rx: mpsc::Receiver<CacheCommand>,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
    worker: IoWorker,
    entries: HashMap<SchemaId, Arc<ConfigRecord>>,
    /// Keys in insertion order; eviction of everything follows it.
    order: Vec<SchemaId>,
    in_flight: HashMap<SchemaId, Vec<RecordReply>>,
}

impl CacheActor {
    /// Create the actor and its handle. The actor does nothing until
    /// [`run`](Self::run) is spawned; the I/O worker starts immediately.
    pub fn create(ctx: RecordContext) -> (ConfigCache, Self) {
        let (tx, rx) = mpsc::channel(256);
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let actor = Self {
            rx,
            completions_tx,
            completions_rx,
            worker: IoWorker::spawn(ctx),
            entries: HashMap::new(),
            order: Vec::new(),
            in_flight: HashMap::new(),
        };
        (ConfigCache::new(tx), actor)
    }

    pub async fn run(mut self) {
        debug!("Config cache started");
        loop {
            tokio::select! {
                Some(done) = self.completions_rx.recv() => self.finish_build(done),
                cmd = self.rx.recv() => match cmd {
                    Some(cmd) => {
                        if self.process_command(cmd).await {
                            break;
                        }
                    }
                    None => {
                        // Every handle is gone.
                        let _ = self.evict_all(EvictionCause::Shutdown).await;
                        break;
                    }
                },
            }
        }
        debug!("Config cache stopped");
    }

    /// Process a single command. Returns true if shutdown was requested.
    async fn process_command(&mut self, cmd: CacheCommand) -> bool {
        match cmd {
            CacheCommand::Get { id, build, reply } => {
                if let Some(record) = self.entries.get(&id) {
                    let _ = reply.send(Ok(record.clone()));
                } else {
                    self.join_or_build(id, build, reply);
                }
            }
            CacheCommand::Reload { id, build, reply } => {
                self.join_or_build(id, build, reply);
            }
            CacheCommand::Save { id, reply } => {
                let result = self.save(id).await;
                let _ = reply.send(result);
            }
            CacheCommand::Invalidate { id, reply } => {
                let result = self.evict(&id, EvictionCause::Explicit).await;
                let _ = reply.send(result);
            }
            CacheCommand::InvalidateAll { reply } => {
                let result = self.evict_all(EvictionCause::Explicit).await;
                let _ = reply.send(result);
            }
            CacheCommand::Contains { id, reply } => {
                let _ = reply.send(self.entries.contains_key(&id));
            }
            CacheCommand::Len { reply } => {
                let _ = reply.send(self.entries.len());
            }
            CacheCommand::Ids { reply } => {
                let _ = reply.send(self.order.clone());
            }
            CacheCommand::Shutdown { reply } => {
                let result = self.evict_all(EvictionCause::Shutdown).await;
                // Pending waiters observe a closed cache.
                self.in_flight.clear();
                let _ = reply.send(result);
                return true;
            }
        }
        false
    }

    /// Wait on an in-flight construction of `id`, or start one.
    fn join_or_build(&mut self, id: SchemaId, build: Builder, reply: RecordReply) {
        if let Some(waiters) = self.in_flight.get_mut(&id) {
            debug!(schema = %id, waiters = waiters.len() + 1, "Joining in-flight config construction");
            waiters.push(reply);
            return;
        }

        debug!(schema = %id, "Constructing config");
        self.in_flight.insert(id.clone(), vec![reply]);

        let done = self
            .worker
            .run(id.clone(), "load", move |ctx| build(ctx).map(Arc::new));
        let completions = self.completions_tx.clone();
        tokio::spawn(async move {
            let result = done.await.unwrap_or(Err(ConfigError::CacheClosed));
            let _ = completions.send(Completion { id, result });
        });
    }

    fn finish_build(&mut self, done: Completion) {
        let Completion { id, result } = done;
        let waiters = self.in_flight.remove(&id).unwrap_or_default();

        match result {
            Ok(record) => {
                self.install(id, record.clone());
                for waiter in waiters {
                    let _ = waiter.send(Ok(record.clone()));
                }
            }
            Err(e) => {
                error!(schema = %id, waiters = waiters.len(), "Failed to load config: {}", e);
                for waiter in waiters {
                    let _ = waiter.send(Err(e.clone()));
                }
            }
        }
    }

    /// Cache a fresh record. An existing record for the key is discarded
    /// without its unload hook or a save.
    fn install(&mut self, id: SchemaId, record: Arc<ConfigRecord>) {
        if self.entries.insert(id.clone(), record).is_some() {
            info!(schema = %id, cause = %EvictionCause::Replaced, "Evicted config");
        } else {
            info!(schema = %id, "Cached config");
            self.order.push(id);
        }
    }

    async fn save(&mut self, id: SchemaId) -> ConfigResult<bool> {
        let record = self
            .entries
            .get(&id)
            .cloned()
            .ok_or_else(|| ConfigError::NotCached(id.clone()))?;

        self.worker
            .run(id, "save", move |_| record.save())
            .await
            .unwrap_or(Err(ConfigError::CacheClosed))
    }

    /// Run the record's unload hook and final save on the worker, then drop
    /// the entry. The entry is removed even when the save fails.
    async fn evict(&mut self, id: &SchemaId, cause: EvictionCause) -> ConfigResult<bool> {
        let Some(record) = self.entries.get(id).cloned() else {
            return Ok(false);
        };

        let result = if cause.runs_unload() {
            self.worker
                .run(id.clone(), "unload", move |_| {
                    record.unload();
                    if record.can_save() {
                        record.save()?;
                    }
                    Ok(())
                })
                .await
                .unwrap_or(Err(ConfigError::CacheClosed))
        } else {
            Ok(())
        };

        self.entries.remove(id);
        self.order.retain(|key| key != id);

        match &result {
            Ok(()) => info!(schema = %id, cause = %cause, "Evicted config"),
            Err(e) => error!(schema = %id, cause = %cause, "Evicted config after failed unload: {}", e),
        }
        result.map(|()| true)
    }

    /// Evict every entry in insertion order. Returns the number evicted, or
    /// the first failure once all have been attempted.
    async fn evict_all(&mut self, cause: EvictionCause) -> ConfigResult<usize> {
        let ids = self.order.clone();
        let mut evicted = 0;
        let mut first_error = None;

        for id in ids {
            match self.evict(&id, cause).await {
                Ok(true) => evicted += 1,
                Ok(false) => {}
                Err(e) => {
                    evicted += 1;
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(evicted),
        }
    }
}
