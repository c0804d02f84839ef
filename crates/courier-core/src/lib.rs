//! courier-core
//!
//! Message-dispatch core for CQRS-style pipelines.
//!
//! # Modules
//! - **domain**: message kinds, envelopes, error types
//! - **typed**: `Handler<M>`, the type-erasing adapter, `HandlerRegistry`
//! - **ports**: `MessageQueue` and `MessageExecutor`, the seams the worker
//!   pool consumes
//! - **app**: `MessageProcessor` (worker pool) and its builder
//! - **impls**: `InMemoryQueue`, `DispatchingExecutor`
//! - **config**: `ProcessorConfig`
//! - **observability**: tracing subscriber setup

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod observability;
pub mod ports;
pub mod typed;

pub use crate::app::{MessageProcessor, MessageProcessorBuilder, ProcessorState};
pub use crate::config::ProcessorConfig;
pub use crate::domain::{
    ActivationError, ConfigError, HandlerError, Message, MessageEnvelope, MessageKind,
    RegistryError,
};
pub use crate::ports::{MessageExecutor, MessageQueue};
pub use crate::typed::{DynHandler, Handler, HandlerId, HandlerModule, HandlerRegistry, RegistryBuilder};
