//! MessageQueue port - the source a processor drains

use std::fmt;

use async_trait::async_trait;

/// Ordered source of messages shared by every worker of a processor.
///
/// Implementations must be safe under concurrent `dequeue` callers and must
/// never hand the same logical item to two callers. The processor adds no
/// locking of its own around the queue.
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// `Display` is the textual form used when a message fails.
    type Message: fmt::Display + Send + Sync + 'static;

    /// Diagnostic name.
    fn name(&self) -> &str;

    /// Take one message, or `None` if the queue is currently empty.
    async fn dequeue(&self) -> Option<Self::Message>;
}
