//! MessageProcessor - N workers draining one bound queue
//!
//! Each worker owns a private executor. The queue is the only thing the
//! workers share.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::builder::MessageProcessorBuilder;
use super::worker_loop::Worker;
use crate::ports::{MessageExecutor, MessageQueue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    NotStarted,
    Running,
    Stopped,
}

impl fmt::Display for ProcessorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "not_started",
            Self::Running => "running",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// Join handles survive into `Stopped` so `shutdown_and_join` can still
/// await workers after a plain `shutdown`.
enum Lifecycle<Q: MessageQueue, E> {
    NotStarted(Vec<Worker<Q, E>>),
    Running(Vec<JoinHandle<()>>),
    Stopped(Vec<JoinHandle<()>>),
}

pub struct MessageProcessor<Q: MessageQueue, E> {
    name: Arc<str>,
    queue: Arc<Q>,
    worker_count: usize,
    shutdown_tx: watch::Sender<bool>,
    lifecycle: Mutex<Lifecycle<Q, E>>,
}

impl<Q, E> MessageProcessor<Q, E>
where
    Q: MessageQueue + 'static,
    E: MessageExecutor<Q::Message> + 'static,
{
    pub fn builder(name: impl Into<String>) -> MessageProcessorBuilder<Q> {
        MessageProcessorBuilder::new(name)
    }

    pub(crate) fn new(name: String, queue: Arc<Q>, workers: Vec<Worker<Q, E>>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            name: Arc::from(name),
            queue,
            worker_count: workers.len(),
            shutdown_tx,
            lifecycle: Mutex::new(Lifecycle::NotStarted(workers)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binding_queue(&self) -> &Arc<Q> {
        &self.queue
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn state(&self) -> ProcessorState {
        match &*self.lock() {
            Lifecycle::NotStarted(_) => ProcessorState::NotStarted,
            Lifecycle::Running(_) => ProcessorState::Running,
            Lifecycle::Stopped(_) => ProcessorState::Stopped,
        }
    }

    /// Spawn every worker onto the current tokio runtime, in construction
    /// order. Calling it again is a no-op.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut lifecycle = self.lock();
        let workers = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped(Vec::new())) {
            Lifecycle::NotStarted(workers) => workers,
            other => {
                *lifecycle = other;
                return;
            }
        };

        let joins = workers
            .into_iter()
            .map(|worker| {
                let name = Arc::clone(&self.name);
                let shutdown_rx = self.shutdown_tx.subscribe();
                tokio::spawn(worker.run(name, shutdown_rx))
            })
            .collect();
        *lifecycle = Lifecycle::Running(joins);

        info!(
            processor = %self.name,
            queue = %self.queue.name(),
            worker_count = self.worker_count,
            "message processor started"
        );
    }

    /// Workers spawned and not yet finished.
    pub fn running_workers(&self) -> usize {
        match &*self.lock() {
            Lifecycle::Running(joins) | Lifecycle::Stopped(joins) => {
                joins.iter().filter(|join| !join.is_finished()).count()
            }
            Lifecycle::NotStarted(_) => 0,
        }
    }

    /// Ask every worker to stop at its next dequeue attempt and move the
    /// processor to `Stopped`.
    ///
    /// Handlers already running are not interrupted. A processor that was
    /// never started can no longer be started.
    pub fn shutdown(&self) {
        // receivers may already be gone if every worker has exited
        let _ = self.shutdown_tx.send(true);

        let mut lifecycle = self.lock();
        let joins = match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped(Vec::new())) {
            Lifecycle::Running(joins) | Lifecycle::Stopped(joins) => joins,
            Lifecycle::NotStarted(_) => Vec::new(),
        };
        *lifecycle = Lifecycle::Stopped(joins);
    }

    /// Shutdown and wait for all workers.
    pub async fn shutdown_and_join(&self) {
        self.shutdown();

        let joins = match &mut *self.lock() {
            Lifecycle::Stopped(joins) => std::mem::take(joins),
            _ => return,
        };

        for join in joins {
            if let Err(err) = join.await {
                warn!(processor = %self.name, error = %err, "worker task ended abnormally");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Lifecycle<Q, E>> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<Q: MessageQueue, E> fmt::Debug for MessageProcessor<Q, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageProcessor")
            .field("name", &self.name)
            .field("queue", &self.queue.name())
            .field("worker_count", &self.worker_count)
            .finish_non_exhaustive()
    }
}
