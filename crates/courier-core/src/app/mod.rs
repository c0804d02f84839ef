//! App - the worker pool
//!
//! # Main components
//! - **MessageProcessorBuilder**: validated construction
//! - **MessageProcessor**: owns the workers and their lifecycle
//! - **Worker**: dequeue → execute → contain failures, in a loop

pub mod builder;
pub mod processor;
pub mod worker_loop;

pub use self::builder::MessageProcessorBuilder;
pub use self::processor::{MessageProcessor, ProcessorState};
pub use self::worker_loop::PollPolicy;
