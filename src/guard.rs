//! Guard implementation: brackets workloads with permit acquisition.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use crate::config::{GuardConfig, GuardConfigBuilder};
use crate::error::{GuardError, WorkloadError};
use crate::events::{EventListeners, GuardEvent};
use crate::pool::{Permit, PermitPool};

#[cfg(feature = "metrics")]
use metrics::{counter, describe_counter, describe_gauge, gauge};
#[cfg(feature = "metrics")]
use std::sync::Once;

#[cfg(feature = "metrics")]
static METRICS_INIT: Once = Once::new();

/// Runs workloads under a bounded number of concurrent slots.
///
/// Every [`execute`](Self::execute) call acquires a permit from the guard's
/// [`PermitPool`] before the workload starts and releases it when the
/// workload settles, however it settles. Workloads beyond the pool's
/// capacity wait their turn in FIFO order.
///
/// The guard is cheaply cloneable; clones share the pool, the live-workload
/// counter and the configuration, so a guard can be handed to any number of
/// tasks.
#[derive(Clone)]
pub struct Guard {
    pool: PermitPool,
    live: Arc<AtomicUsize>,
    config: Arc<GuardConfig>,
}

impl Guard {
    /// Creates a guard over an existing pool.
    ///
    /// Use this to share one pool between several guards, or when the pool
    /// is constructed elsewhere and handed in. For event hooks and a wait
    /// bound, use [`builder`](Self::builder) instead.
    pub fn new(pool: PermitPool) -> Self {
        let config = GuardConfig {
            capacity: pool.capacity(),
            max_wait: None,
            name: "guard".to_string(),
            event_listeners: EventListeners::new(),
        };
        Self {
            pool,
            live: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }

    /// Creates a new builder for configuring a guard.
    ///
    /// # Examples
    ///
    /// ```
    /// use permit_guard::Guard;
    /// use std::time::Duration;
    ///
    /// let guard = Guard::builder()
    ///     .capacity(10)
    ///     .max_wait(Some(Duration::from_secs(5)))
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn builder() -> GuardConfigBuilder {
        #[cfg(feature = "metrics")]
        {
            METRICS_INIT.call_once(|| {
                describe_counter!(
                    "permit_guard_admitted_total",
                    "Total number of workloads admitted by the guard"
                );
                describe_counter!(
                    "permit_guard_rejected_total",
                    "Total number of workloads rejected by the guard"
                );
                describe_counter!(
                    "permit_guard_completed_total",
                    "Total number of workloads that completed successfully"
                );
                describe_counter!(
                    "permit_guard_failed_total",
                    "Total number of workloads that failed"
                );
                describe_gauge!(
                    "permit_guard_live_workloads",
                    "Current number of live workloads"
                );
            });
        }
        GuardConfigBuilder::new()
    }

    pub(crate) fn from_config(config: GuardConfig) -> Result<Self, GuardError> {
        let pool = PermitPool::new(config.capacity)?;
        Ok(Self {
            pool,
            live: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        })
    }

    /// Runs `workload` under one of the guard's slots.
    ///
    /// Acquires a permit (waiting up to the configured `max_wait`, if any),
    /// runs the workload, and releases the permit when the workload settles.
    /// Release happens on every exit path: normal return, workload error,
    /// panic unwind, and cancellation of the returned future mid-workload.
    /// Cancelling while still waiting for a permit leaves the pool
    /// untouched.
    ///
    /// The workload's error is returned verbatim inside
    /// [`WorkloadError::Workload`]; the guard never retries or transforms
    /// it.
    ///
    /// Calling `execute` from inside a workload running under the same
    /// guard is an ordinary acquisition: the inner call waits for a free
    /// permit like any other caller. If no other holder can release one,
    /// that inner call never completes; at capacity 1 it always deadlocks.
    ///
    /// # Errors
    ///
    /// - [`WorkloadError::Guard`] with [`GuardError::Timeout`] if `max_wait`
    ///   elapsed before a permit freed up; the workload never started.
    /// - [`WorkloadError::Workload`] if the workload ran and failed.
    ///
    /// # Examples
    ///
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use permit_guard::{Guard, PermitPool};
    ///
    /// let pool = PermitPool::new(4).unwrap();
    /// let guard = Guard::new(pool);
    ///
    /// let result = guard.execute(|| async { Ok::<_, String>(42) }).await;
    /// assert_eq!(result.unwrap(), 42);
    /// assert_eq!(guard.pool().available_permits(), 4);
    /// # }
    /// ```
    pub async fn execute<F, Fut, T, E>(&self, workload: F) -> Result<T, WorkloadError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = match self.config.max_wait {
            Some(wait) => match self.pool.acquire_for(wait).await {
                Ok(permit) => permit,
                Err(err) => {
                    self.emit_rejected();
                    return Err(WorkloadError::Guard(err));
                }
            },
            None => self.pool.acquire().await,
        };

        let admitted_at = Instant::now();
        let (slot, live_now) = InFlight::enter(permit, &self.live);
        self.emit_admitted(live_now);

        let result = workload().await;
        let duration = admitted_at.elapsed();
        drop(slot);

        match result {
            Ok(value) => {
                self.emit_completed(duration);
                Ok(value)
            }
            Err(err) => {
                self.emit_failed(duration);
                Err(WorkloadError::Workload(err))
            }
        }
    }

    /// Number of workloads currently running under this guard.
    ///
    /// A snapshot for observability; admission control goes through the
    /// pool, never through this counter.
    pub fn live_count(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// The pool this guard draws permits from.
    pub fn pool(&self) -> &PermitPool {
        &self.pool
    }

    /// The name of this guard instance.
    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn emit_admitted(&self, live: usize) {
        let event = GuardEvent::WorkloadAdmitted {
            guard_name: self.config.name.clone(),
            timestamp: Instant::now(),
            live,
        };
        self.config.event_listeners.emit(&event);

        #[cfg(feature = "tracing")]
        tracing::trace!(guard = %self.config.name, live, "workload admitted");

        #[cfg(feature = "metrics")]
        {
            counter!("permit_guard_admitted_total", "guard" => self.config.name.clone())
                .increment(1);
            gauge!("permit_guard_live_workloads", "guard" => self.config.name.clone())
                .set(live as f64);
        }
    }

    fn emit_rejected(&self) {
        let event = GuardEvent::WorkloadRejected {
            guard_name: self.config.name.clone(),
            timestamp: Instant::now(),
            capacity: self.pool.capacity(),
        };
        self.config.event_listeners.emit(&event);

        #[cfg(feature = "tracing")]
        tracing::debug!(guard = %self.config.name, "workload rejected (permit wait timed out)");

        #[cfg(feature = "metrics")]
        counter!("permit_guard_rejected_total", "guard" => self.config.name.clone()).increment(1);
    }

    fn emit_completed(&self, duration: Duration) {
        let event = GuardEvent::WorkloadCompleted {
            guard_name: self.config.name.clone(),
            timestamp: Instant::now(),
            duration,
        };
        self.config.event_listeners.emit(&event);

        #[cfg(feature = "tracing")]
        tracing::trace!(guard = %self.config.name, ?duration, "workload completed");

        #[cfg(feature = "metrics")]
        {
            counter!("permit_guard_completed_total", "guard" => self.config.name.clone())
                .increment(1);
            gauge!("permit_guard_live_workloads", "guard" => self.config.name.clone())
                .set(self.live.load(Ordering::SeqCst) as f64);
        }
    }

    fn emit_failed(&self, duration: Duration) {
        let event = GuardEvent::WorkloadFailed {
            guard_name: self.config.name.clone(),
            timestamp: Instant::now(),
            duration,
        };
        self.config.event_listeners.emit(&event);

        #[cfg(feature = "tracing")]
        tracing::debug!(guard = %self.config.name, ?duration, "workload failed");

        #[cfg(feature = "metrics")]
        {
            counter!("permit_guard_failed_total", "guard" => self.config.name.clone()).increment(1);
            gauge!("permit_guard_live_workloads", "guard" => self.config.name.clone())
                .set(self.live.load(Ordering::SeqCst) as f64);
        }
    }
}

/// One occupied slot: a permit plus the live-count increment that came with
/// it.
///
/// Dropping the slot undoes both. The decrement runs in `drop` before the
/// permit field is released, so the live count never exceeds the number of
/// held permits. Unwinding and future cancellation take the same path.
struct InFlight {
    _permit: Permit,
    live: Arc<AtomicUsize>,
}

impl InFlight {
    fn enter(permit: Permit, live: &Arc<AtomicUsize>) -> (Self, usize) {
        let now = live.fetch_add(1, Ordering::SeqCst) + 1;
        (
            Self {
                _permit: permit,
                live: Arc::clone(live),
            },
            now,
        )
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}
