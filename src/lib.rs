//! Bounded concurrent access to a shared resource.
//!
//! A fixed pool of permits caps how many workloads run at once. Callers
//! funnel through a guard that acquires a permit before the workload starts
//! and gives it back when the workload settles, on every exit path. A
//! dispatcher fans one workload out across a batch of tasks, all bounded by
//! the same pool.
//!
//! Three pieces:
//!
//! - [`PermitPool`]: counting permits over a fair async semaphore.
//! - [`Guard`]: brackets a workload with acquire and release.
//! - [`Dispatcher`]: spawns batches of guarded tasks and aggregates their
//!   outcomes.
//!
//! # Basic Example
//!
//! ```rust
//! use permit_guard::{Guard, PermitPool};
//!
//! # async fn example() {
//! // At most 10 workloads run concurrently
//! let pool = PermitPool::new(10).unwrap();
//! let guard = Guard::new(pool);
//!
//! let result = guard
//!     .execute(|| async {
//!         // Your workload here
//!         Ok::<_, std::io::Error>("done")
//!     })
//!     .await;
//! # }
//! ```
//!
//! # Example with a Wait Bound
//!
//! Bound how long a workload may wait for a permit when the pool is drained:
//!
//! ```rust
//! use permit_guard::Guard;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let guard = Guard::builder()
//!     .capacity(5)
//!     .max_wait(Some(Duration::from_secs(2)))
//!     .name("db-guard")
//!     .build()
//!     .unwrap();
//!
//! let result = guard.execute(|| async { Ok::<_, ()>(()) }).await;
//!
//! // Workloads that wait more than 2 seconds are rejected with
//! // a timeout error instead of running
//! if let Err(err) = result {
//!     assert!(err.is_timeout() || err.is_workload());
//! }
//! # }
//! ```
//!
//! # Example with Event Listeners
//!
//! Monitor guard behavior using event hooks:
//!
//! ```rust
//! use permit_guard::Guard;
//!
//! # async fn example() {
//! let guard = Guard::builder()
//!     .capacity(10)
//!     .name("monitored-guard")
//!     .on_admitted(|live| {
//!         println!("workload admitted ({} live)", live);
//!     })
//!     .on_rejected(|capacity| {
//!         println!("workload rejected (capacity {})", capacity);
//!     })
//!     .on_completed(|duration| {
//!         println!("workload completed in {:?}", duration);
//!     })
//!     .build()
//!     .unwrap();
//! # }
//! ```
//!
//! # Fanning Out a Batch
//!
//! Run the same workload across many tasks, bounded by one pool:
//!
//! ```rust
//! use permit_guard::{Dispatcher, Guard, PermitPool};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let guard = Guard::new(PermitPool::new(10).unwrap());
//! let dispatcher = Dispatcher::new(guard).with_deadline(Duration::from_secs(30));
//!
//! let outcome = dispatcher
//!     .run_all(300, || async {
//!         // Talk to the shared resource
//!         Ok::<_, std::io::Error>(())
//!     })
//!     .await;
//!
//! println!(
//!     "{} succeeded, {} failed, {} still outstanding",
//!     outcome.succeeded,
//!     outcome.failed.len(),
//!     outcome.outstanding.len()
//! );
//! # }
//! ```
//!
//! # Error Handling
//!
//! The guard passes workload errors through verbatim as
//! [`WorkloadError::Workload`]; its own faults (timeouts, bad
//! configuration, misdirected releases) are [`GuardError`]s. A failing
//! workload still releases its permit.
//!
//! # Feature Flags
//!
//! - `tracing`: emit [`tracing`](https://docs.rs/tracing) events at
//!   admission, rejection and workload completion.
//! - `metrics`: record [`metrics`](https://docs.rs/metrics) counters and a
//!   live-workload gauge, labeled by guard name.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod guard;
pub mod pool;

pub use config::{GuardConfig, GuardConfigBuilder};
pub use dispatcher::{BatchOutcome, Dispatcher};
pub use error::{GuardError, Result, WorkloadError};
pub use events::GuardEvent;
pub use guard::Guard;
pub use pool::{Permit, PermitPool};
