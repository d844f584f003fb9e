//! Connection pool demonstration: 300 tasks sharing 10 connections.
//! Run with: cargo run --example connection_pool
//!
//! Each task checks a connection out of the guarded pool, holds it briefly,
//! and hands it back. The guard caps live connections at the pool size; the
//! dispatcher fans the tasks out and reports what became of each. Exits 0
//! when every task got its turn and every connection came back.
//!
//! Build with `--features tracing` to also see the guard's trace output.

use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::sleep;

use permit_guard::{Dispatcher, Guard};

const CONNECTIONS: usize = 10;
const TASKS: usize = 300;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();

    let guard = match Guard::builder()
        .capacity(CONNECTIONS)
        .name("connection-pool")
        .on_admitted(|live| {
            println!("  [POOL] Connection opened (live: {})", live);
        })
        .on_completed(|duration| {
            println!("  [POOL] Connection returned after {:?}", duration);
        })
        .build()
    {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("Invalid configuration: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let dispatcher = Dispatcher::new(guard).with_deadline(Duration::from_secs(30));

    println!(
        "Dispatching {} tasks over {} connections...\n",
        TASKS, CONNECTIONS
    );

    let concurrent = Arc::new(AtomicUsize::new(0));
    let max_observed = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&concurrent);
    let max = Arc::clone(&max_observed);

    let outcome = dispatcher
        .run_all(TASKS, move || {
            let counter = Arc::clone(&counter);
            let max = Arc::clone(&max);
            async move {
                let current = counter.fetch_add(1, Ordering::SeqCst) + 1;
                max.fetch_max(current, Ordering::SeqCst);

                // Simulated time on the connection
                sleep(Duration::from_millis(50)).await;

                counter.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, std::io::Error>(())
            }
        })
        .await;

    println!(
        "\n{} succeeded, {} failed, {} panicked, {} outstanding",
        outcome.succeeded,
        outcome.failed.len(),
        outcome.panicked.len(),
        outcome.outstanding.len()
    );
    println!(
        "Max concurrent observed: {} (cap was {})",
        max_observed.load(Ordering::SeqCst),
        CONNECTIONS
    );
    println!(
        "Connections available again: {}/{}",
        dispatcher.guard().pool().available_permits(),
        CONNECTIONS
    );

    let pool_whole = dispatcher.guard().pool().available_permits() == CONNECTIONS;
    if outcome.all_succeeded() && pool_whole {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
