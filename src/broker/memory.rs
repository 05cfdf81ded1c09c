//! In-process broker.
//!
//! Queues live in a map guarded by a mutex; receivers park on a
//! [`Notify`] until a publish or close wakes them.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;

use super::{BrokerError, MessageBroker};

/// FIFO-per-queue broker living in the current process
#[derive(Debug, Default)]
pub struct InMemoryBroker {
    queues: Mutex<HashMap<String, VecDeque<String>>>,
    notify: Notify,
    closed: AtomicBool,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting in `queue`, `None` if it was never declared
    pub fn depth(&self, queue: &str) -> Option<usize> {
        self.queues.lock().get(queue).map(VecDeque::len)
    }

    /// Wake all receivers; once drained they return `None`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn pop(&self, queue: &str) -> Result<Option<String>, BrokerError> {
        let mut queues = self.queues.lock();
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        Ok(messages.pop_front())
    }
}

#[async_trait]
impl MessageBroker for InMemoryBroker {
    async fn declare_queue(&self, queue: &str) -> Result<(), BrokerError> {
        self.queues.lock().entry(queue.to_string()).or_default();
        Ok(())
    }

    async fn purge_queue(&self, queue: &str) -> Result<u64, BrokerError> {
        let mut queues = self.queues.lock();
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| BrokerError::QueueNotFound(queue.to_string()))?;
        let purged = messages.len() as u64;
        messages.clear();
        Ok(purged)
    }

    async fn publish(&self, queue: &str, body: &str) -> Result<(), BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::Closed);
        }
        {
            let mut queues = self.queues.lock();
            let messages = queues
                .get_mut(queue)
                .ok_or_else(|| BrokerError::Unroutable(queue.to_string()))?;
            messages.push_back(body.to_string());
        }
        self.notify.notify_waiters();
        Ok(())
    }

    async fn receive(&self, queue: &str) -> Result<Option<String>, BrokerError> {
        loop {
            // Register interest before checking so a publish in between is not missed
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(body) = self.pop(queue)? {
                return Ok(Some(body));
            }
            if self.closed.load(Ordering::SeqCst) {
                return Ok(None);
            }
            notified.await;
        }
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}
