//! DispatchingExecutor - registry-backed fan-out
//!
//! Every handler whose capability the message's kind is assignable to is
//! invoked, in registry order. The first handler error stops the fan-out and
//! is returned to the worker.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::{HandlerError, MessageEnvelope};
use crate::ports::MessageExecutor;
use crate::typed::HandlerRegistry;

#[derive(Clone)]
pub struct DispatchingExecutor {
    registry: Arc<HandlerRegistry>,
}

impl DispatchingExecutor {
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// Execute one envelope against all matching handlers.
    pub async fn dispatch(&self, envelope: &MessageEnvelope) -> Result<(), HandlerError> {
        let kind = envelope.kind();
        let handlers = self.registry.get_handlers(&kind);
        if handlers.is_empty() {
            return Err(HandlerError::NoHandler(kind.name()));
        }

        for handler in handlers {
            debug!(kind = %kind, handler = %handler.handler_id(), "dispatching message");
            handler.handle_dyn(envelope).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl MessageExecutor<MessageEnvelope> for DispatchingExecutor {
    async fn handle(&mut self, message: &MessageEnvelope) -> Result<(), HandlerError> {
        self.dispatch(message).await
    }
}
