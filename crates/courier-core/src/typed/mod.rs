//! Typed - handler registration and lookup
//!
//! # Two layers
//! - **Typed**: `Message`, `Handler<M>`; the compiler checks which messages a
//!   handler accepts
//! - **Dyn**: `DynHandler`; what the registry stores and callers invoke

pub mod handler;
pub mod registry;

pub use self::handler::{DynHandler, Handler, HandlerId, TypedHandler};
pub use self::registry::{Capabilities, HandlerModule, HandlerRegistry, RegistryBuilder};
