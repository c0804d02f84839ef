//! Handler trait and the adapter that erases its message type
//!
//! - `Handler<M>`: typed surface, one impl per capability a handler supports
//! - `DynHandler`: object-safe surface stored in the registry
//! - `TypedHandler<M, H>`: `Handler<M>` → `DynHandler`

use std::any::TypeId;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{HandlerError, Message, MessageEnvelope, MessageKind};

/// Handles messages of kind `M::KIND` (and, through the registry, any kind
/// that lists `M::KIND` among its ancestors).
///
/// # Example
/// ```ignore
/// struct AccountHandler;
///
/// #[async_trait]
/// impl Handler<OpenAccount> for AccountHandler {
///     async fn handle(&self, message: OpenAccount) -> Result<(), HandlerError> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Handler<M: Message>: Send + Sync {
    async fn handle(&self, message: M) -> Result<(), HandlerError>;
}

/// Identity of a concrete handler type, used to de-duplicate bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId {
    type_id: TypeId,
    type_name: &'static str,
}

impl HandlerId {
    pub fn of<H: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<H>(),
            type_name: std::any::type_name::<H>(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// Object-safe handler, invoked with an envelope of any kind.
#[async_trait]
pub trait DynHandler: Send + Sync {
    async fn handle_dyn(&self, envelope: &MessageEnvelope) -> Result<(), HandlerError>;

    /// Identity of the wrapped handler, not of the adapter.
    fn handler_id(&self) -> HandlerId;

    /// The capability this binding was registered under.
    fn capability(&self) -> MessageKind;
}

pub struct TypedHandler<M: Message, H: Handler<M>> {
    handler: Arc<H>,
    _marker: PhantomData<M>,
}

impl<M: Message, H: Handler<M>> TypedHandler<M, H> {
    pub fn new(handler: Arc<H>) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<M: Message, H: Handler<M> + 'static> DynHandler for TypedHandler<M, H> {
    async fn handle_dyn(&self, envelope: &MessageEnvelope) -> Result<(), HandlerError> {
        let message: M = envelope.decode()?;
        self.handler.handle(message).await
    }

    fn handler_id(&self) -> HandlerId {
        HandlerId::of::<H>()
    }

    fn capability(&self) -> MessageKind {
        M::KIND
    }
}
