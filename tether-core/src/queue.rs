//! FIFO record queues shared between host producers and the dispatcher.
//!
//! Producers call [`RecordQueue::enqueue`] from any thread; the
//! dispatcher drains with [`RecordQueue::dequeue_oldest`] on the network
//! side. Both take the same lock, so each record is handed out at most
//! once and in insertion order.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::warn;

use crate::error::ChannelError;

/// Name of the queue holding location records.
pub const LOCATION_QUEUE: &str = "location";
/// Name of the queue holding history records.
pub const HISTORY_QUEUE: &str = "history";

#[derive(Debug)]
pub struct RecordQueue {
    name: &'static str,
    /// Oldest records are evicted beyond this bound. `None` = unbounded.
    capacity: Option<usize>,
    records: Mutex<VecDeque<String>>,
}

impl RecordQueue {
    /// An unbounded queue.
    pub fn new(name: &'static str) -> Self {
        Self::with_capacity(name, None)
    }

    pub fn with_capacity(name: &'static str, capacity: Option<usize>) -> Self {
        Self {
            name,
            capacity: capacity.filter(|c| *c > 0),
            records: Mutex::new(VecDeque::new()),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Append a record. Never fails.
    pub fn enqueue(&self, record: impl Into<String>) {
        let mut records = self.lock();
        records.push_back(record.into());
        if let Some(cap) = self.capacity {
            while records.len() > cap {
                records.pop_front();
                warn!(queue = self.name, capacity = cap, "queue full; dropped oldest record");
            }
        }
    }

    /// Remove and return the oldest record.
    pub fn dequeue_oldest(&self) -> Result<String, ChannelError> {
        self.lock()
            .pop_front()
            .ok_or(ChannelError::EmptyQueue(self.name))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    // A panic while holding the lock cannot leave a VecDeque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<String>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Textual record for a location fix.
pub fn location_record(latitude: f64, longitude: f64) -> String {
    format!("Location: {latitude},{longitude}")
}
