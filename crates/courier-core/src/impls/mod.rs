//! Impls - ready-made adapters for the ports
//!
//! - **InMemoryQueue**: `MessageQueue` over a `VecDeque`, for tests and demos
//! - **DispatchingExecutor**: `MessageExecutor` that fans a message out to
//!   every matching handler in a `HandlerRegistry`

pub mod dispatch;
pub mod inmem_queue;

pub use self::dispatch::DispatchingExecutor;
pub use self::inmem_queue::InMemoryQueue;
