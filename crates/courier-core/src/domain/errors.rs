//! Errors - one enum per failure domain
//!
//! - `RegistryError`: discovery/bootstrap, fatal for the whole pass
//! - `ConfigError`: processor construction, fatal for that processor
//! - `HandlerError`: one message, contained at the worker boundary

use thiserror::Error;

/// Raised while handling a single message.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("failed to decode {kind} payload as {target}: {source}")]
    Decode {
        kind: &'static str,
        target: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {kind} payload: {source}")]
    Encode {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("no handler registered for message kind={0}")]
    NoHandler(&'static str),

    #[error("{0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}

/// Returned by a handler factory when the handler cannot be brought up.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct ActivationError(String);

impl ActivationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("handler [type={handler}] could not be activated: {source}")]
    Activation {
        handler: &'static str,
        #[source]
        source: ActivationError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no queue is bound to message processor {processor}")]
    MissingQueue { processor: String },

    #[error("there must be at least one message executor for {processor}")]
    NoExecutors { processor: String },

    #[error("failed to load processor configuration: {0}")]
    Load(#[from] config::ConfigError),
}
