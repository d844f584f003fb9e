//! Configuration for the guard.

use std::time::Duration;

use crate::error::GuardError;
use crate::events::{EventListeners, FnListener, GuardEvent};
use crate::guard::Guard;

/// Configuration for a [`Guard`].
#[derive(Clone)]
pub struct GuardConfig {
    /// Maximum number of workloads allowed to run concurrently.
    pub(crate) capacity: usize,
    /// Maximum time to wait for a permit.
    pub(crate) max_wait: Option<Duration>,
    /// Name of this guard instance.
    pub(crate) name: String,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<GuardEvent>,
}

impl GuardConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> GuardConfigBuilder {
        GuardConfigBuilder::new()
    }
}

/// Builder for guard configuration.
pub struct GuardConfigBuilder {
    capacity: usize,
    max_wait: Option<Duration>,
    name: String,
    event_listeners: EventListeners<GuardEvent>,
}

impl GuardConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            capacity: 16,
            max_wait: None,
            name: "guard".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of concurrently running workloads.
    ///
    /// Default: 16
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the maximum time [`execute`](Guard::execute) waits for a permit.
    ///
    /// If `None`, calls will wait indefinitely.
    /// Default: None
    pub fn max_wait(mut self, wait: Option<Duration>) -> Self {
        self.max_wait = wait;
        self
    }

    /// Sets the name of this guard instance.
    ///
    /// Default: "guard"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a workload is admitted.
    ///
    /// Invoked after a workload acquires a permit, immediately before it
    /// starts running.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the number of live workloads after this
    /// admission. This value will be between 1 and `capacity` (inclusive).
    ///
    /// # Example
    /// ```rust,no_run
    /// use permit_guard::Guard;
    ///
    /// let guard = Guard::builder()
    ///     .capacity(10)
    ///     .on_admitted(|live| {
    ///         println!("workload admitted - {} now running", live);
    ///         if live >= 8 {
    ///             println!("warning: approaching capacity!");
    ///         }
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn on_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GuardEvent::WorkloadAdmitted { live, .. } = event {
                f(*live);
            }
        }));
        self
    }

    /// Registers a callback when a workload is rejected.
    ///
    /// Invoked when a workload gave up waiting for a permit because the
    /// configured `max_wait` elapsed. The workload never started.
    ///
    /// # Callback Signature
    /// `Fn(usize)` - Called with the configured capacity that the workload
    /// could not get into.
    ///
    /// # Example
    /// ```rust,no_run
    /// use permit_guard::Guard;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use std::sync::Arc;
    /// use std::time::Duration;
    ///
    /// let rejections = Arc::new(AtomicUsize::new(0));
    /// let counter = Arc::clone(&rejections);
    ///
    /// let guard = Guard::builder()
    ///     .capacity(10)
    ///     .max_wait(Some(Duration::from_millis(100)))
    ///     .on_rejected(move |capacity| {
    ///         let count = counter.fetch_add(1, Ordering::SeqCst);
    ///         println!("rejected at capacity {} (total: {})", capacity, count + 1);
    ///     })
    ///     .build()
    ///     .unwrap();
    /// ```
    pub fn on_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GuardEvent::WorkloadRejected { capacity, .. } = event {
                f(*capacity);
            }
        }));
        self
    }

    /// Registers a callback when a workload completes successfully.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with the time from admission to completion.
    pub fn on_completed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GuardEvent::WorkloadCompleted { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Registers a callback when a workload fails.
    ///
    /// The workload ran and returned an error; its permit has already been
    /// released by the time the callback runs.
    ///
    /// # Callback Signature
    /// `Fn(Duration)` - Called with the time from admission to failure.
    pub fn on_failed<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let GuardEvent::WorkloadFailed { duration, .. } = event {
                f(*duration);
            }
        }));
        self
    }

    /// Builds the configuration and returns a [`Guard`].
    ///
    /// # Errors
    ///
    /// Returns [`GuardError::InvalidConfiguration`] if the capacity is zero.
    pub fn build(self) -> Result<Guard, GuardError> {
        let config = GuardConfig {
            capacity: self.capacity,
            max_wait: self.max_wait,
            name: self.name,
            event_listeners: self.event_listeners,
        };
        Guard::from_config(config)
    }
}

impl Default for GuardConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
