//! Error types for the permit pool, guard and dispatcher.

use std::time::Duration;

/// Faults raised by the permit machinery itself.
///
/// Workload failures are not represented here; they travel through
/// [`WorkloadError::Workload`] untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    /// A pool or guard was configured with a capacity of zero.
    #[error("invalid configuration: capacity must be positive (got {capacity})")]
    InvalidConfiguration {
        /// The rejected capacity value.
        capacity: usize,
    },
    /// A permit was handed back to a pool that did not issue it.
    ///
    /// The permit still returns to its issuing pool when dropped, so the
    /// counters of both pools stay exact.
    #[error("protocol violation: permit released into a pool that did not issue it")]
    ProtocolViolation,
    /// The configured bound on waiting for a permit elapsed.
    #[error("timed out waiting for a permit after {waited:?}")]
    Timeout {
        /// How long the caller waited before giving up.
        waited: Duration,
    },
}

/// Result type for pool and guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;

/// Error returned by [`Guard::execute`](crate::Guard::execute).
///
/// Either the guard never admitted the workload, or the workload ran and
/// failed. The workload's own error is carried verbatim; the guard never
/// wraps, retries or absorbs it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkloadError<E> {
    /// The guard refused or timed out before the workload started.
    #[error(transparent)]
    Guard(#[from] GuardError),
    /// The workload ran and returned this error.
    #[error("workload failed: {0}")]
    Workload(E),
}

impl<E> WorkloadError<E> {
    /// Returns `true` if the guard timed out waiting for a permit.
    pub fn is_timeout(&self) -> bool {
        matches!(self, WorkloadError::Guard(GuardError::Timeout { .. }))
    }

    /// Returns `true` if the workload itself failed.
    pub fn is_workload(&self) -> bool {
        matches!(self, WorkloadError::Workload(_))
    }

    /// Extracts the workload's error, if the workload is what failed.
    pub fn workload_error(self) -> Option<E> {
        match self {
            WorkloadError::Workload(e) => Some(e),
            WorkloadError::Guard(_) => None,
        }
    }

    /// Maps the workload's error type, leaving guard faults alone.
    ///
    /// # Examples
    ///
    /// ```
    /// use permit_guard::WorkloadError;
    ///
    /// let err: WorkloadError<String> = WorkloadError::Workload("boom".to_string());
    /// let mapped: WorkloadError<usize> = err.map_workload(|s| s.len());
    /// assert_eq!(mapped.workload_error(), Some(4));
    /// ```
    pub fn map_workload<F, T>(self, f: F) -> WorkloadError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            WorkloadError::Guard(e) => WorkloadError::Guard(e),
            WorkloadError::Workload(e) => WorkloadError::Workload(f(e)),
        }
    }
}
