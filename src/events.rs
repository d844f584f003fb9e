//! Event system for guard observability.
//!
//! Listeners registered on a [`Guard`](crate::Guard) receive an event for
//! every admission, rejection and workload outcome. Listeners run inline on
//! the emitting task and should return quickly.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Trait for events emitted by the guard.
pub trait Event: Send + Sync + fmt::Debug {
    /// Returns the type of event (e.g., "workload_admitted").
    fn event_type(&self) -> &'static str;

    /// Returns when this event occurred.
    fn timestamp(&self) -> Instant;

    /// Returns the name of the guard instance that emitted this event.
    fn guard_name(&self) -> &str;
}

/// Trait for listening to guard events.
pub trait EventListener<E: Event>: Send + Sync {
    /// Called when an event occurs.
    fn on_event(&self, event: &E);
}

/// Type alias for boxed event listeners.
pub type BoxedEventListener<E> = Arc<dyn EventListener<E>>;

/// A collection of event listeners.
#[derive(Clone)]
pub struct EventListeners<E: Event> {
    listeners: Vec<BoxedEventListener<E>>,
}

impl<E: Event> EventListeners<E> {
    /// Creates a new empty event listener collection.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    /// Adds a listener to the collection.
    pub fn add<L>(&mut self, listener: L)
    where
        L: EventListener<E> + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    /// Emits an event to all registered listeners.
    ///
    /// If a listener panics, the panic is caught and the remaining listeners
    /// will still be called. This ensures one misbehaving listener doesn't
    /// prevent others from receiving events.
    pub fn emit(&self, event: &E) {
        for listener in &self.listeners {
            // Catch panics to ensure one listener doesn't prevent others from being called
            let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                listener.on_event(event);
            }));
        }
    }

    /// Returns true if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Returns the number of listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }
}

impl<E: Event> Default for EventListeners<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// A simple function-based event listener.
pub struct FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    f: F,
    _phantom: std::marker::PhantomData<E>,
}

impl<E, F> FnListener<E, F>
where
    F: Fn(&E) + Send + Sync,
{
    /// Creates a new function-based listener.
    pub fn new(f: F) -> Self {
        Self {
            f,
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<E, F> EventListener<E> for FnListener<E, F>
where
    E: Event,
    F: Fn(&E) + Send + Sync,
{
    fn on_event(&self, event: &E) {
        (self.f)(event)
    }
}

/// Events emitted by a guard around workload execution.
#[derive(Debug, Clone)]
pub enum GuardEvent {
    /// A workload acquired a permit and is about to run.
    WorkloadAdmitted {
        /// Name of the guard instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Number of live workloads after this admission.
        live: usize,
    },
    /// A workload was turned away because no permit freed up in time.
    WorkloadRejected {
        /// Name of the guard instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Configured pool capacity.
        capacity: usize,
    },
    /// A workload ran to completion.
    WorkloadCompleted {
        /// Name of the guard instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Time from admission to completion.
        duration: Duration,
    },
    /// A workload ran and returned an error.
    WorkloadFailed {
        /// Name of the guard instance.
        guard_name: String,
        /// When the event occurred.
        timestamp: Instant,
        /// Time from admission to failure.
        duration: Duration,
    },
}

impl Event for GuardEvent {
    fn event_type(&self) -> &'static str {
        match self {
            GuardEvent::WorkloadAdmitted { .. } => "workload_admitted",
            GuardEvent::WorkloadRejected { .. } => "workload_rejected",
            GuardEvent::WorkloadCompleted { .. } => "workload_completed",
            GuardEvent::WorkloadFailed { .. } => "workload_failed",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            GuardEvent::WorkloadAdmitted { timestamp, .. }
            | GuardEvent::WorkloadRejected { timestamp, .. }
            | GuardEvent::WorkloadCompleted { timestamp, .. }
            | GuardEvent::WorkloadFailed { timestamp, .. } => *timestamp,
        }
    }

    fn guard_name(&self) -> &str {
        match self {
            GuardEvent::WorkloadAdmitted { guard_name, .. }
            | GuardEvent::WorkloadRejected { guard_name, .. }
            | GuardEvent::WorkloadCompleted { guard_name, .. }
            | GuardEvent::WorkloadFailed { guard_name, .. } => guard_name,
        }
    }
}
