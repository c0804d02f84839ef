//! InMemoryQueue - development queue
//!
//! `dequeue` never waits: an empty queue answers `None` right away and the
//! worker's poll policy decides what happens next.

use std::collections::VecDeque;
use std::fmt;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::ports::MessageQueue;

pub struct InMemoryQueue<M> {
    name: String,
    messages: Mutex<VecDeque<M>>,
}

impl<M> InMemoryQueue<M> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            messages: Mutex::new(VecDeque::new()),
        }
    }

    pub fn from_messages(name: impl Into<String>, messages: impl IntoIterator<Item = M>) -> Self {
        Self {
            name: name.into(),
            messages: Mutex::new(messages.into_iter().collect()),
        }
    }

    pub async fn enqueue(&self, message: M) {
        self.messages.lock().await.push_back(message);
    }

    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

#[async_trait]
impl<M> MessageQueue for InMemoryQueue<M>
where
    M: fmt::Display + Send + Sync + 'static,
{
    type Message = M;

    fn name(&self) -> &str {
        &self.name
    }

    async fn dequeue(&self) -> Option<M> {
        self.messages.lock().await.pop_front()
    }
}
