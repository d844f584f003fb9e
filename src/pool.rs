//! Counting permit pool backed by a fair async semaphore.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::GuardError;

/// A fixed pool of permits bounding concurrent access to a shared resource.
///
/// The pool starts with `capacity` permits. Each [`acquire`](Self::acquire)
/// checks one out; dropping the returned [`Permit`] (or passing it to
/// [`release`](Self::release)) returns it. At most `capacity` permits are
/// ever outstanding, so at most `capacity` holders proceed concurrently.
///
/// The pool is cheaply cloneable; clones draw from the same permits.
#[derive(Clone, Debug)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

/// A single permit checked out of a [`PermitPool`].
///
/// Dropping the permit returns it to the pool that issued it. Because the
/// permit is a move-only value, releasing twice or releasing something never
/// acquired does not compile.
#[derive(Debug)]
pub struct Permit {
    _permit: OwnedSemaphorePermit,
    issued_by: Arc<Semaphore>,
}

impl PermitPool {
    /// Creates a pool with `capacity` permits.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidConfiguration`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, GuardError> {
        if capacity == 0 {
            return Err(GuardError::InvalidConfiguration { capacity });
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        })
    }

    /// Waits until a permit is free and takes it.
    ///
    /// Waiters are served in FIFO order: tasks queued first are granted
    /// permits first. Suspends only the calling task, never a thread.
    ///
    /// # Cancel safety
    ///
    /// Dropping the returned future before it resolves gives up the place
    /// in the queue and leaves the pool's counters untouched.
    pub async fn acquire(&self) -> Permit {
        match Arc::clone(&self.semaphore).acquire_owned().await {
            Ok(inner) => Permit {
                _permit: inner,
                issued_by: Arc::clone(&self.semaphore),
            },
            // The pool never closes its semaphore
            Err(_) => unreachable!("permit pool semaphore closed"),
        }
    }

    /// Waits for a permit, giving up after `wait`.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::Timeout`] if no permit freed up within the
    /// bound. The pool is left untouched in that case.
    pub async fn acquire_for(&self, wait: Duration) -> Result<Permit, GuardError> {
        match tokio::time::timeout(wait, self.acquire()).await {
            Ok(permit) => Ok(permit),
            Err(_) => Err(GuardError::Timeout { waited: wait }),
        }
    }

    /// Takes a permit if one is free right now.
    pub fn try_acquire(&self) -> Option<Permit> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(|inner| Permit {
                _permit: inner,
                issued_by: Arc::clone(&self.semaphore),
            })
    }

    /// Returns a permit to the pool, checking it was issued here.
    ///
    /// Dropping a [`Permit`] releases it just as well; this method exists
    /// for callers that want the identity check. The permit always returns
    /// to its *issuing* pool, so counters stay exact even on error.
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::ProtocolViolation`] if the permit came from a
    /// different pool.
    pub fn release(&self, permit: Permit) -> Result<(), GuardError> {
        let issued_here = Arc::ptr_eq(&permit.issued_by, &self.semaphore);
        drop(permit);
        if issued_here {
            Ok(())
        } else {
            Err(GuardError::ProtocolViolation)
        }
    }

    /// Number of permits currently free.
    ///
    /// A snapshot; other tasks may acquire or release concurrently.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// The fixed capacity this pool was created with.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of permits currently checked out. Snapshot, like
    /// [`available_permits`](Self::available_permits).
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.semaphore.available_permits())
    }
}
