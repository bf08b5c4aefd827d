use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

/// Bounded admission: `max_concurrent` runs execute, up to `max_queued` more
/// wait in arrival order, anything beyond that is turned away.
#[derive(Debug)]
pub struct Admission {
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
    max_concurrent: usize,
    max_queued: usize,
}

/// A reserved place: either an execution permit or a spot in the queue.
#[derive(Debug)]
pub enum Slot {
    Ready(OwnedSemaphorePermit),
    Queued(QueueTicket),
}

/// Holds one queue position until a permit is granted or the ticket is dropped.
#[derive(Debug)]
pub struct QueueTicket {
    permits: Arc<Semaphore>,
    waiting: Arc<AtomicUsize>,
}

impl Drop for QueueTicket {
    fn drop(&mut self) {
        self.waiting.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Slot {
    /// Waits for an execution permit. The tokio semaphore is fair, so queued
    /// runs start in the order they were admitted.
    pub async fn ready(self) -> Result<OwnedSemaphorePermit, AcquireError> {
        match self {
            Slot::Ready(permit) => Ok(permit),
            Slot::Queued(ticket) => ticket.permits.clone().acquire_owned().await,
        }
    }
}

impl Admission {
    pub fn new(max_concurrent: usize, max_queued: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            permits: Arc::new(Semaphore::new(max_concurrent)),
            waiting: Arc::new(AtomicUsize::new(0)),
            max_concurrent,
            max_queued,
        }
    }

    /// Reserves a slot without waiting. `None` means the queue is full.
    pub fn admit(&self) -> Option<Slot> {
        if let Ok(permit) = self.permits.clone().try_acquire_owned() {
            return Some(Slot::Ready(permit));
        }

        let max_queued = self.max_queued;
        self.waiting
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < max_queued).then_some(n + 1)
            })
            .ok()?;

        Some(Slot::Queued(QueueTicket {
            permits: Arc::clone(&self.permits),
            waiting: Arc::clone(&self.waiting),
        }))
    }

    pub fn running(&self) -> usize {
        self.max_concurrent - self.permits.available_permits()
    }

    pub fn queued(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }
}
