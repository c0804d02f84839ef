//! Worker - one polling loop bound to one executor
//!
//! # Flow
//! 1. `MessageQueue::dequeue()`
//! 2. empty: wait per `PollPolicy`, retry
//! 3. message: `MessageExecutor::handle()`; errors and panics are logged and
//!    the message is dropped
//!
//! Shutdown is only observed between dequeue attempts. An in-flight
//! `handle()` always runs to completion.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::ports::{MessageExecutor, MessageQueue};

/// What an idle worker does when the queue reports empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollPolicy {
    /// Retry right away, only yielding to the scheduler.
    Immediate,
    /// Sleep before the next dequeue attempt.
    Interval(Duration),
}

impl PollPolicy {
    pub fn from_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            Self::Immediate
        } else {
            Self::Interval(interval)
        }
    }
}

pub(crate) struct Worker<Q: MessageQueue, E> {
    id: usize,
    queue: Arc<Q>,
    executor: E,
    poll: PollPolicy,
}

impl<Q, E> Worker<Q, E>
where
    Q: MessageQueue + 'static,
    E: MessageExecutor<Q::Message> + 'static,
{
    pub(crate) fn new(id: usize, queue: Arc<Q>, executor: E, poll: PollPolicy) -> Self {
        Self {
            id,
            queue,
            executor,
            poll,
        }
    }

    pub(crate) async fn run(mut self, processor: Arc<str>, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            if stop_requested(&shutdown_rx) {
                break;
            }

            let Some(message) = self.queue.dequeue().await else {
                match self.poll {
                    PollPolicy::Immediate => tokio::task::yield_now().await,
                    PollPolicy::Interval(interval) => {
                        tokio::select! {
                            changed = shutdown_rx.changed() => {
                                if changed.is_err() {
                                    break;
                                }
                            }
                            _ = tokio::time::sleep(interval) => {}
                        }
                    }
                }
                continue;
            };

            self.process(&processor, &message).await;
        }

        debug!(processor = %processor, worker_id = self.id, "worker stopped");
    }

    async fn process(&mut self, processor: &str, message: &Q::Message) {
        let result = AssertUnwindSafe(self.executor.handle(message))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(
                    processor = %processor,
                    worker_id = self.id,
                    payload = %message,
                    error = %err,
                    "exception raised when executing message"
                );
            }
            Err(panic) => {
                error!(
                    processor = %processor,
                    worker_id = self.id,
                    payload = %message,
                    panic = %panic_message(&*panic),
                    "executor panicked while executing message"
                );
            }
        }
    }
}

/// Set by `shutdown()`, or implied once the processor (the sender) is gone.
fn stop_requested(shutdown_rx: &watch::Receiver<bool>) -> bool {
    *shutdown_rx.borrow() || shutdown_rx.has_changed().is_err()
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
