use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};
use std::time::Duration;
use tokio::time::sleep;

use permit_guard::Guard;

/// Test all four hooks fire with sensible payloads
#[tokio::test]
async fn hooks_fire_with_payloads() {
    let admitted = Arc::new(AtomicUsize::new(0));
    let max_live = Arc::new(AtomicUsize::new(0));
    let durations: Arc<Mutex<Vec<Duration>>> = Arc::new(Mutex::new(Vec::new()));
    let failed = Arc::new(AtomicUsize::new(0));

    let a = Arc::clone(&admitted);
    let m = Arc::clone(&max_live);
    let d = Arc::clone(&durations);
    let f = Arc::clone(&failed);

    let capacity = 2;
    let guard = Guard::builder()
        .capacity(capacity)
        .name("hooked")
        .on_admitted(move |live| {
            a.fetch_add(1, Ordering::SeqCst);
            m.fetch_max(live, Ordering::SeqCst);
        })
        .on_completed(move |duration| {
            d.lock().unwrap().push(duration);
        })
        .on_failed(move |_| {
            f.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let mut handles = vec![];
    for i in 0..6 {
        let g = guard.clone();
        handles.push(tokio::spawn(async move {
            g.execute(|| async move {
                sleep(Duration::from_millis(20)).await;
                if i < 4 {
                    Ok(())
                } else {
                    Err("late failure".to_string())
                }
            })
            .await
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    assert_eq!(admitted.load(Ordering::SeqCst), 6);
    assert_eq!(failed.load(Ordering::SeqCst), 2);

    // Every success reported a duration covering at least its sleep
    let durations = durations.lock().unwrap();
    assert_eq!(durations.len(), 4);
    for duration in durations.iter() {
        assert!(
            *duration >= Duration::from_millis(20),
            "Duration {:?} shorter than the workload's sleep",
            duration
        );
    }

    // The live payload never exceeded capacity
    let peak = max_live.load(Ordering::SeqCst);
    assert!(peak >= 1 && peak <= capacity, "Bad live payload: {}", peak);
}

/// Test the rejected hook reports the configured capacity
#[tokio::test]
async fn rejected_hook_reports_capacity() {
    let rejected = Arc::new(AtomicUsize::new(0));
    let reported = Arc::new(AtomicUsize::new(0));

    let r = Arc::clone(&rejected);
    let rep = Arc::clone(&reported);

    let guard = Guard::builder()
        .capacity(2)
        .max_wait(Some(Duration::from_millis(20)))
        .on_rejected(move |capacity| {
            r.fetch_add(1, Ordering::SeqCst);
            rep.store(capacity, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let _first = guard.pool().acquire().await;
    let _second = guard.pool().acquire().await;

    let result = guard.execute(|| async { Ok::<(), String>(()) }).await;
    assert!(result.unwrap_err().is_timeout());

    assert_eq!(rejected.load(Ordering::SeqCst), 1);
    assert_eq!(reported.load(Ordering::SeqCst), 2);
}

/// Test a panicking listener does not affect the workload
#[tokio::test]
async fn listener_panic_does_not_break_execution() {
    let completed = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&completed);

    let guard = Guard::builder()
        .capacity(1)
        .on_admitted(|_| {
            panic!("listener blew up");
        })
        .on_completed(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .unwrap();

    let value = guard.execute(|| async { Ok::<_, String>(7) }).await.unwrap();

    assert_eq!(value, 7);
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(guard.pool().available_permits(), 1);
}
