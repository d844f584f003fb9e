use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;

use permit_guard::{Dispatcher, Guard, PermitPool};

/// Test the headline scenario: 300 tasks funneled through 10 permits
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn peak_concurrency_never_exceeds_capacity() {
    let capacity = 10;
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));

    let a = Arc::clone(&active);
    let p = Arc::clone(&peak);

    let guard = Guard::new(PermitPool::new(capacity).unwrap());
    let dispatcher = Dispatcher::new(guard);

    let outcome = dispatcher
        .run_all(300, move || {
            let active = Arc::clone(&a);
            let peak = Arc::clone(&p);
            async move {
                let current = active.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(current, Ordering::SeqCst);

                sleep(Duration::from_millis(50)).await;

                active.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), String>(())
            }
        })
        .await;

    assert!(outcome.all_succeeded());
    assert_eq!(outcome.succeeded, 300);

    let peak_seen = peak.load(Ordering::SeqCst);
    assert!(
        peak_seen <= capacity,
        "Peak concurrency {} exceeded capacity {}",
        peak_seen,
        capacity
    );

    // Every permit came back
    assert_eq!(dispatcher.guard().pool().available_permits(), capacity);
}

/// Test 100 concurrent workloads with limited permits
#[tokio::test]
async fn hundred_concurrent_workloads() {
    let completed = Arc::new(AtomicUsize::new(0));
    let guard = Guard::new(PermitPool::new(10).unwrap());

    let mut handles = vec![];
    for _ in 0..100 {
        let g = guard.clone();
        let c = Arc::clone(&completed);
        handles.push(tokio::spawn(async move {
            g.execute(|| async {
                sleep(Duration::from_millis(10)).await;
                c.fetch_add(1, Ordering::Relaxed);
                Ok::<(), String>(())
            })
            .await
        }));
    }

    let mut success_count = 0;
    for result in join_all(handles).await {
        if let Ok(Ok(_)) = result {
            success_count += 1;
        }
    }

    // All 100 should complete successfully
    assert_eq!(success_count, 100);
    assert_eq!(completed.load(Ordering::Relaxed), 100);
    assert_eq!(guard.pool().available_permits(), 10);
}

/// Test that a single permit serializes workloads in submission order
#[tokio::test]
async fn capacity_one_serializes_workloads() {
    let guard = Guard::new(PermitPool::new(1).unwrap());
    let log: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));

    let g = guard.clone();
    let l = Arc::clone(&log);
    let first = tokio::spawn(async move {
        g.execute(move || {
            let log = Arc::clone(&l);
            async move {
                log.lock().unwrap().push("first:start");
                sleep(Duration::from_millis(200)).await;
                log.lock().unwrap().push("first:end");
                Ok::<(), String>(())
            }
        })
        .await
    });

    // Let the first workload take the permit before queueing the second
    sleep(Duration::from_millis(50)).await;

    let g = guard.clone();
    let l = Arc::clone(&log);
    let second = tokio::spawn(async move {
        g.execute(move || {
            let log = Arc::clone(&l);
            async move {
                log.lock().unwrap().push("second:start");
                Ok::<(), String>(())
            }
        })
        .await
    });

    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    // The second workload only started after the first finished
    let log = log.lock().unwrap();
    assert_eq!(*log, vec!["first:start", "first:end", "second:start"]);
}

/// Test admission bounds hold with real parallelism
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn multi_threaded_admission() {
    let capacity = 8;
    let active = Arc::new(AtomicUsize::new(0));
    let violations = Arc::new(AtomicUsize::new(0));

    let guard = Guard::new(PermitPool::new(capacity).unwrap());

    let mut handles = vec![];
    for _ in 0..100 {
        let g = guard.clone();
        let a = Arc::clone(&active);
        let v = Arc::clone(&violations);
        handles.push(tokio::spawn(async move {
            g.execute(|| async {
                let current = a.fetch_add(1, Ordering::SeqCst) + 1;
                if current > capacity {
                    v.fetch_add(1, Ordering::SeqCst);
                }

                sleep(Duration::from_millis(5)).await;

                a.fetch_sub(1, Ordering::SeqCst);
                Ok::<(), String>(())
            })
            .await
        }));
    }

    let _ = join_all(handles).await;

    assert_eq!(
        violations.load(Ordering::SeqCst),
        0,
        "Admission bound violated {} times",
        violations.load(Ordering::SeqCst)
    );
}

/// Test live count reflects running workloads and drains to zero
#[tokio::test]
async fn live_count_tracks_admissions() {
    let guard = Guard::new(PermitPool::new(3).unwrap());

    let mut handles = vec![];
    for _ in 0..3 {
        let g = guard.clone();
        handles.push(tokio::spawn(async move {
            g.execute(|| async {
                sleep(Duration::from_millis(200)).await;
                Ok::<(), String>(())
            })
            .await
        }));
    }

    // All three should be running
    sleep(Duration::from_millis(50)).await;
    assert_eq!(guard.live_count(), 3);
    assert_eq!(guard.pool().in_use(), 3);
    assert_eq!(guard.pool().available_permits(), 0);

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(guard.live_count(), 0);
    assert_eq!(guard.pool().available_permits(), 3);
}

/// Test nested execute completes when a spare permit exists
#[tokio::test]
async fn reentrant_execute_with_spare_capacity() {
    let guard = Guard::new(PermitPool::new(2).unwrap());
    let inner_guard = guard.clone();

    let value = guard
        .execute(move || async move {
            inner_guard
                .execute(|| async { Ok::<_, String>(42) })
                .await
                .map_err(|e| e.to_string())
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
    assert_eq!(guard.pool().available_permits(), 2);
}

/// Test nested execute at capacity 1 never completes
#[tokio::test]
async fn reentrant_execute_at_capacity_one_stalls() {
    let guard = Guard::new(PermitPool::new(1).unwrap());
    let inner_guard = guard.clone();

    let attempt = tokio::time::timeout(
        Duration::from_millis(100),
        guard.execute(move || async move {
            inner_guard
                .execute(|| async { Ok::<_, String>(()) })
                .await
                .map_err(|e| e.to_string())
        }),
    )
    .await;

    assert!(
        attempt.is_err(),
        "Nested acquisition of the only permit should stall"
    );

    // Dropping the stalled call released its permit and live slot
    assert_eq!(guard.pool().available_permits(), 1);
    assert_eq!(guard.live_count(), 0);
}
