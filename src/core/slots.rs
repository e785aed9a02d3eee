use crate::utils::error::ExecutionError;
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

/// Fixed-size pool of execution slots. Acquisition never waits: a full pool
/// rejects the caller immediately.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    slots: Arc<Semaphore>,
    max: usize,
}

/// One held slot. Dropping it returns the slot to the pool.
#[derive(Debug)]
pub struct SlotGuard {
    _permit: OwnedSemaphorePermit,
}

impl ConcurrencyGate {
    pub fn new(max: usize) -> Self {
        Self {
            slots: Arc::new(Semaphore::new(max)),
            max,
        }
    }

    pub fn try_acquire(&self) -> Result<SlotGuard, ExecutionError> {
        match Arc::clone(&self.slots).try_acquire_owned() {
            Ok(permit) => Ok(SlotGuard { _permit: permit }),
            Err(TryAcquireError::NoPermits) | Err(TryAcquireError::Closed) => {
                Err(ExecutionError::CapacityExhausted { max: self.max })
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.max - self.slots.available_permits()
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn has_capacity(&self) -> bool {
        self.slots.available_permits() > 0
    }
}
