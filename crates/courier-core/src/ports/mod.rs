//! Ports - the seams the worker pool consumes
//!
//! The processor only depends on these traits. Concrete queues (in-memory,
//! broker-backed, ...) and executors live outside this module.

pub mod executor;
pub mod message_queue;

pub use self::executor::MessageExecutor;
pub use self::message_queue::MessageQueue;
