//! Domain model: message kinds, envelopes and error types.

pub mod errors;
pub mod message;

pub use self::errors::{ActivationError, ConfigError, HandlerError, RegistryError};
pub use self::message::{Message, MessageEnvelope, MessageKind};
