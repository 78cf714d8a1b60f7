//! # Concurrency slot pool
//!
//! Fixed-capacity admission gate built on [`tokio::sync::Semaphore`].
//!
//! ## Invariants
//! - At most `capacity` [`Slot`]s are alive at any instant.
//! - A slot is released exactly once, when it is dropped. Moving it into the task that
//!   does the work makes the release cover every exit path: return, error, panic, abort.
//! - Capacity is fixed at construction.
//!
//! ## Lifecycle
//! [`SlotPool::drain`] waits for every slot to come back and then closes the pool;
//! later [`SlotPool::acquire`] calls fail with [`AdmissionError::Closed`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tokio::time;
use tracing::{debug, trace};

use crate::error::{AdmissionError, ShutdownError};

/// One unit of admission capacity; released on drop.
#[must_use = "the slot is released as soon as it is dropped"]
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

/// Counting semaphore with timed acquisition.
#[derive(Debug, Clone)]
pub struct SlotPool {
    sem: Arc<Semaphore>,
    capacity: u32,
}

impl SlotPool {
    /// Creates a pool with `capacity` slots (clamped to `1..=u32::MAX`).
    pub fn new(capacity: usize) -> Self {
        let capacity = u32::try_from(capacity.max(1)).unwrap_or(u32::MAX);
        Self {
            sem: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
        }
    }

    /// Waits up to `timeout` for a free slot.
    ///
    /// `Duration::ZERO` tries once without waiting.
    pub async fn acquire(&self, timeout: Duration) -> Result<Slot, AdmissionError> {
        let sem = Arc::clone(&self.sem);

        let permit = if timeout.is_zero() {
            match sem.try_acquire_owned() {
                Ok(permit) => permit,
                Err(TryAcquireError::Closed) => return Err(AdmissionError::Closed),
                Err(TryAcquireError::NoPermits) => {
                    return Err(AdmissionError::SlotTimeout { waited: timeout });
                }
            }
        } else {
            match time::timeout(timeout, sem.acquire_owned()).await {
                Ok(Ok(permit)) => permit,
                Ok(Err(_closed)) => return Err(AdmissionError::Closed),
                Err(_elapsed) => return Err(AdmissionError::SlotTimeout { waited: timeout }),
            }
        };

        trace!(in_use = self.in_use(), "slot acquired");
        Ok(Slot { _permit: permit })
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Slots currently free.
    #[inline]
    pub fn available(&self) -> usize {
        self.sem.available_permits()
    }

    /// Slots currently held.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.capacity().saturating_sub(self.available())
    }

    /// Stops admitting; pending and later acquisitions fail with [`AdmissionError::Closed`].
    pub fn close(&self) {
        self.sem.close();
    }

    pub fn is_closed(&self) -> bool {
        self.sem.is_closed()
    }

    /// Waits up to `grace` for every held slot to be released, then closes the pool.
    ///
    /// The pool is closed even when the grace period runs out.
    pub async fn drain(&self, grace: Duration) -> Result<(), ShutdownError> {
        let res = match time::timeout(grace, self.sem.acquire_many(self.capacity)).await {
            Ok(Ok(_all)) => {
                self.sem.close();
                Ok(())
            }
            Ok(Err(_closed)) => Ok(()),
            Err(_elapsed) => {
                self.sem.close();
                Err(ShutdownError::GraceExceeded {
                    grace,
                    running: self.in_use(),
                })
            }
        };
        debug!(ok = res.is_ok(), "slot pool drained");
        res
    }
}
