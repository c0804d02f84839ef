//! MessageProcessorBuilder - validated construction of a worker pool
//!
//! Fail-fast: a missing queue or a zero executor count is reported by
//! `build()` before any executor is created.

use std::sync::Arc;
use std::time::Duration;

use super::processor::MessageProcessor;
use super::worker_loop::{PollPolicy, Worker};
use crate::config::ProcessorConfig;
use crate::domain::ConfigError;
use crate::ports::{MessageExecutor, MessageQueue};

/// ```ignore
/// let processor = MessageProcessorBuilder::new("CommandProcessor")
///     .queue(queue)
///     .executor_count(4)
///     .dequeue_interval(Duration::from_millis(50))
///     .build(|| DispatchingExecutor::new(registry.clone()))?;
/// processor.start();
/// ```
pub struct MessageProcessorBuilder<Q> {
    name: String,
    queue: Option<Arc<Q>>,
    executor_count: usize,
    dequeue_interval: Duration,
}

impl<Q: MessageQueue + 'static> MessageProcessorBuilder<Q> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            queue: None,
            executor_count: 1,
            dequeue_interval: Duration::ZERO,
        }
    }

    pub fn from_config(config: &ProcessorConfig) -> Self {
        Self::new(config.name.clone())
            .executor_count(config.executor_count)
            .dequeue_interval(config.dequeue_interval())
    }

    pub fn queue(mut self, queue: Arc<Q>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn executor_count(mut self, executor_count: usize) -> Self {
        self.executor_count = executor_count;
        self
    }

    /// Zero retries immediately when the queue is empty.
    pub fn dequeue_interval(mut self, interval: Duration) -> Self {
        self.dequeue_interval = interval;
        self
    }

    /// Validate, then call `executor_factory` once per worker.
    pub fn build<E, F>(self, mut executor_factory: F) -> Result<MessageProcessor<Q, E>, ConfigError>
    where
        E: MessageExecutor<Q::Message> + 'static,
        F: FnMut() -> E,
    {
        let Some(queue) = self.queue else {
            return Err(ConfigError::MissingQueue {
                processor: self.name,
            });
        };
        if self.executor_count == 0 {
            return Err(ConfigError::NoExecutors {
                processor: self.name,
            });
        }

        let poll = PollPolicy::from_interval(self.dequeue_interval);
        let workers = (0..self.executor_count)
            .map(|id| Worker::new(id, Arc::clone(&queue), executor_factory(), poll))
            .collect();

        Ok(MessageProcessor::new(self.name, queue, workers))
    }
}
