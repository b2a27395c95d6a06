//! The serial I/O worker.

use std::panic::{AssertUnwindSafe, catch_unwind};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::config::record::RecordContext;
use crate::config::schema::SchemaId;
use crate::errors::{ConfigError, ConfigResult, panic_message};

type Job = Box<dyn FnOnce(&RecordContext) + Send>;

/// Runs jobs one at a time on a dedicated blocking thread.
///
/// The thread exits once every sender is dropped and the queue is drained.
pub(crate) struct IoWorker {
    tx: mpsc::UnboundedSender<Job>,
}

impl IoWorker {
    pub(crate) fn spawn(ctx: RecordContext) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        tokio::task::spawn_blocking(move || {
            debug!("Config I/O worker started");
            while let Some(job) = rx.blocking_recv() {
                job(&ctx);
            }
            debug!("Config I/O worker stopped");
        });
        Self { tx }
    }

    /// Queue `f` behind every earlier job. A panic inside `f` is caught and
    /// reported as [`ConfigError::Panicked`].
    ///
    /// The receiver yields `Err` only if the worker is gone.
    pub(crate) fn run<R, F>(
        &self,
        schema: SchemaId,
        stage: &'static str,
        f: F,
    ) -> oneshot::Receiver<ConfigResult<R>>
    where
        R: Send + 'static,
        F: FnOnce(&RecordContext) -> ConfigResult<R> + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Job = Box::new(move |ctx| {
            let result = catch_unwind(AssertUnwindSafe(|| f(ctx))).unwrap_or_else(|payload| {
                Err(ConfigError::Panicked {
                    schema,
                    stage,
                    message: panic_message(&*payload),
                })
            });
            let _ = reply_tx.send(result);
        });
        // On failure the job, and with it `reply_tx`, is dropped here.
        let _ = self.tx.send(job);
        reply_rx
    }
}
