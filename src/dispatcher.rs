//! Dispatcher: fans one workload out across a batch of concurrent tasks.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::WorkloadError;
use crate::guard::Guard;

/// Spawns batches of guarded tasks and aggregates their outcomes.
///
/// Every task in a batch runs the same workload through the dispatcher's
/// [`Guard`], so at most the pool's capacity run at once; the rest queue in
/// FIFO order. Tasks settle independently: one failing task never aborts
/// the batch.
#[derive(Clone)]
pub struct Dispatcher {
    guard: Guard,
    deadline: Option<Duration>,
}

/// What became of each task in a batch.
///
/// Task indices are positions in the batch, `0..n`, in spawn order. The
/// index vectors come back sorted.
#[derive(Debug)]
pub struct BatchOutcome<E> {
    /// Number of tasks whose workload completed successfully.
    pub succeeded: usize,
    /// Tasks whose workload failed, with the error each one returned.
    pub failed: Vec<(usize, WorkloadError<E>)>,
    /// Tasks whose workload panicked.
    pub panicked: Vec<usize>,
    /// Tasks that had not settled when the deadline elapsed.
    pub outstanding: Vec<usize>,
}

impl<E> BatchOutcome<E> {
    /// Returns `true` if every task in the batch completed successfully.
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.panicked.is_empty() && self.outstanding.is_empty()
    }

    /// Number of tasks that settled one way or another.
    pub fn settled(&self) -> usize {
        self.succeeded + self.failed.len() + self.panicked.len()
    }
}

impl Dispatcher {
    /// Creates a dispatcher that runs batches under `guard`.
    pub fn new(guard: Guard) -> Self {
        Self {
            guard,
            deadline: None,
        }
    }

    /// Bounds how long [`run_all`](Self::run_all) waits for a batch.
    ///
    /// The deadline covers the whole batch, measured from the moment
    /// `run_all` is called. Without one, `run_all` waits for every task.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// The guard this dispatcher runs batches under.
    pub fn guard(&self) -> &Guard {
        &self.guard
    }

    /// Spawns `n` tasks all running `workload` and waits for them to settle.
    ///
    /// Each task invokes the workload through the guard, so admission is
    /// bounded by the pool's capacity. Successful completions are counted;
    /// failures, panics and (with a deadline) unsettled tasks are reported
    /// per task index in the returned [`BatchOutcome`]. Workload values are
    /// not collected; callers that need them should go through
    /// [`Guard::execute`] directly.
    ///
    /// When the deadline elapses, tasks still in flight are aborted
    /// best-effort and listed in [`BatchOutcome::outstanding`]. The abort
    /// is cooperative: a task blocked in non-async code keeps running until
    /// its next await point. Either way the guard's cleanup releases its
    /// permit, so the pool comes back to full capacity once those tasks
    /// wind down.
    ///
    /// # Examples
    ///
    /// ```
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// use permit_guard::{Dispatcher, Guard, PermitPool};
    ///
    /// let guard = Guard::new(PermitPool::new(2).unwrap());
    /// let dispatcher = Dispatcher::new(guard);
    ///
    /// let outcome = dispatcher
    ///     .run_all(5, || async { Ok::<_, String>(()) })
    ///     .await;
    /// assert!(outcome.all_succeeded());
    /// assert_eq!(outcome.succeeded, 5);
    /// # }
    /// ```
    pub async fn run_all<F, Fut, T, E>(&self, n: usize, workload: F) -> BatchOutcome<E>
    where
        F: Fn() -> Fut + Clone + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
    {
        #[cfg(feature = "tracing")]
        tracing::debug!(guard = %self.guard.name(), n, "dispatching batch");

        let deadline = self.deadline.map(|d| Instant::now() + d);

        let handles: Vec<_> = (0..n)
            .map(|index| {
                let guard = self.guard.clone();
                let workload = workload.clone();
                (index, tokio::spawn(async move { guard.execute(workload).await }))
            })
            .collect();

        let mut outcome = BatchOutcome {
            succeeded: 0,
            failed: Vec::new(),
            panicked: Vec::new(),
            outstanding: Vec::new(),
        };

        for (index, mut handle) in handles {
            let joined = match deadline {
                Some(at) => match tokio::time::timeout_at(at, &mut handle).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        handle.abort();
                        outcome.outstanding.push(index);
                        continue;
                    }
                },
                None => (&mut handle).await,
            };

            match joined {
                Ok(Ok(_)) => outcome.succeeded += 1,
                Ok(Err(err)) => outcome.failed.push((index, err)),
                Err(join_err) => {
                    if join_err.is_panic() {
                        outcome.panicked.push(index);
                    } else {
                        // Aborted from outside; it never settled.
                        outcome.outstanding.push(index);
                    }
                }
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            guard = %self.guard.name(),
            succeeded = outcome.succeeded,
            failed = outcome.failed.len(),
            panicked = outcome.panicked.len(),
            outstanding = outcome.outstanding.len(),
            "batch settled"
        );

        outcome
    }
}
