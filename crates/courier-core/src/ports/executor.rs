//! MessageExecutor port - what a worker invokes per message

use async_trait::async_trait;

use crate::domain::HandlerError;

/// Handler-shaped object owned by exactly one worker.
///
/// `&mut self` because an executor is never shared: each worker gets its own
/// instance from the processor's factory.
#[async_trait]
pub trait MessageExecutor<M: Send + Sync>: Send {
    async fn handle(&mut self, message: &M) -> Result<(), HandlerError>;
}
