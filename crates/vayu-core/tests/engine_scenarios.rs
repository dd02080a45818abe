//! End-to-end engine runs against the in-memory provider: completion,
//! pause/resume, cancellation and per-job failures.

mod common;

use std::time::Duration;

use tokio::sync::broadcast::error::TryRecvError;
use vayu_core::{EngineState, JobStatus, MemoryProvider};

use common::{engine, jobs, media, payload, wait_until};

const TIMEOUT: Duration = Duration::from_secs(30);

#[test]
fn two_jobs_run_to_completion_in_order() {
    let p = MemoryProvider::new();
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let engine = engine(&p);
    let mut completed = engine.subscribe_completed();

    let items = vec![
        media(&p, &src, "one.jpg", 1_000_000),
        media(&p, &src, "two.jpg", 2_000_000),
    ];
    let ids = engine.enqueue(jobs(items, &dst)).unwrap();
    assert_eq!(engine.latest_progress().total_bytes, 3_000_000);
    engine.wait_idle();

    let last = engine.latest_progress();
    assert_eq!(last.copied_bytes, 3_000_000);
    assert_eq!(last.total_bytes, 3_000_000);
    assert!(last.completed);
    assert!(!last.cancelled);
    assert_eq!(engine.state(), EngineState::Idle);

    let first = completed.try_recv().unwrap();
    let second = completed.try_recv().unwrap();
    assert!(matches!(completed.try_recv(), Err(TryRecvError::Empty)));
    assert_eq!(first.job_id, ids[0]);
    assert_eq!(first.display_name, "one.jpg");
    assert_eq!(second.job_id, ids[1]);
    assert_eq!(p.contents(&first.destination).unwrap(), payload(1_000_000));
    assert_eq!(p.contents(&second.destination).unwrap(), payload(2_000_000));

    let reports = engine.reports();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| r.status == JobStatus::Completed));
}

#[test]
fn pause_freezes_active_time() {
    let p = MemoryProvider::new();
    p.set_read_delay(Duration::from_millis(2));
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let engine = engine(&p);
    let mut completed = engine.subscribe_completed();

    engine
        .enqueue(jobs(vec![media(&p, &src, "big.mp4", 10_000_000)], &dst))
        .unwrap();
    wait_until(TIMEOUT, || engine.latest_progress().copied_bytes >= 2_000_000);

    engine.pause();
    assert_eq!(engine.state(), EngineState::Paused);
    // Let the chunk that was in flight at pause time land.
    std::thread::sleep(Duration::from_millis(50));
    let before = engine.latest_progress();
    assert!(before.paused);

    std::thread::sleep(Duration::from_secs(2));
    let during = engine.latest_progress();
    assert_eq!(during.active_elapsed_secs, before.active_elapsed_secs);
    assert_eq!(during.copied_bytes, before.copied_bytes);

    engine.resume();
    assert_eq!(engine.state(), EngineState::Running);
    engine.wait_idle();

    let last = engine.latest_progress();
    assert!(last.completed);
    assert_eq!(last.copied_bytes, 10_000_000);
    // Two seconds of pause must not show up in active time.
    assert!(last.active_elapsed_secs < before.active_elapsed_secs + 1.9);
    assert!(completed.try_recv().is_ok());
    assert!(matches!(completed.try_recv(), Err(TryRecvError::Empty)));
}

#[test]
fn cancel_removes_partial_and_clears_queue() {
    let p = MemoryProvider::new();
    p.set_read_delay(Duration::from_millis(2));
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let engine = engine(&p);
    let mut completed = engine.subscribe_completed();

    let items = vec![
        media(&p, &src, "a.jpg", 5_000_000),
        media(&p, &src, "b.jpg", 1_000_000),
        media(&p, &src, "c.jpg", 1_000_000),
    ];
    engine.enqueue(jobs(items, &dst)).unwrap();
    wait_until(TIMEOUT, || engine.latest_progress().copied_bytes > 0);

    engine.cancel();
    assert_eq!(engine.queued(), 0);
    engine.wait_idle();

    assert_eq!(engine.state(), EngineState::Idle);
    assert!(p.items_in(&dst).is_empty(), "partial artifact left behind");
    assert_eq!(p.deleted().len(), 1);
    assert!(matches!(completed.try_recv(), Err(TryRecvError::Empty)));

    let last = engine.latest_progress();
    assert!(last.cancelled);
    assert!(!last.completed);

    let reports = engine.reports();
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(|r| r.status == JobStatus::Cancelled));
}

#[test]
fn cancel_while_paused_unwinds() {
    let p = MemoryProvider::new();
    p.set_read_delay(Duration::from_millis(2));
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let engine = engine(&p);

    engine
        .enqueue(jobs(vec![media(&p, &src, "a.jpg", 5_000_000)], &dst))
        .unwrap();
    wait_until(TIMEOUT, || engine.latest_progress().copied_bytes > 0);
    engine.pause();
    engine.cancel();
    engine.wait_idle();

    assert!(p.items_in(&dst).is_empty());
    assert_eq!(engine.reports()[0].status, JobStatus::Cancelled);
}

#[test]
fn failed_job_is_skipped() {
    let p = MemoryProvider::new();
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    p.fail_create("bad.jpg");
    let unreadable = media(&p, &src, "gone.jpg", 300);
    p.fail_read(&unreadable.locator);
    let engine = engine(&p);
    let mut completed = engine.subscribe_completed();

    let items = vec![
        media(&p, &src, "bad.jpg", 100),
        unreadable,
        media(&p, &src, "good.jpg", 200),
    ];
    engine.enqueue(jobs(items, &dst)).unwrap();
    engine.wait_idle();

    let reports = engine.reports();
    let statuses: Vec<_> = reports.iter().map(|r| r.status).collect();
    assert_eq!(
        statuses,
        [JobStatus::Failed, JobStatus::Failed, JobStatus::Completed]
    );
    assert!(reports[0].error.is_some());

    assert_eq!(completed.try_recv().unwrap().display_name, "good.jpg");
    assert!(matches!(completed.try_recv(), Err(TryRecvError::Empty)));

    let last = engine.latest_progress();
    assert!(last.completed);
    assert_eq!(last.copied_bytes, last.total_bytes);
    assert_eq!(last.copied_bytes, 200);
    // Only the good file exists at the destination.
    assert_eq!(p.items_in(&dst).len(), 1);
}

#[test]
fn read_error_midway_keeps_progress_monotonic() {
    let p = MemoryProvider::new();
    p.set_read_delay(Duration::from_millis(1));
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let broken = media(&p, &src, "broken.mp4", 1_000_000);
    p.fail_read_after(&broken.locator, 500_000);
    let engine = engine(&p);
    let mut rx = engine.subscribe_progress();

    let sampler = std::thread::spawn(move || {
        let mut seen = Vec::new();
        loop {
            if rx.has_changed().unwrap_or(false) {
                let s = rx.borrow_and_update().clone();
                seen.push(s.copied_bytes);
                if s.completed {
                    return seen;
                }
            }
            std::thread::sleep(Duration::from_micros(100));
        }
    });

    let items = vec![broken, media(&p, &src, "fine.jpg", 1_000)];
    engine.enqueue(jobs(items, &dst)).unwrap();
    engine.wait_idle();
    let seen = sampler.join().unwrap();

    for pair in seen.windows(2) {
        assert!(pair[1] >= pair[0], "copied bytes went backwards: {pair:?}");
    }
    let last = engine.latest_progress();
    assert!(last.completed);
    assert_eq!(last.copied_bytes, 501_000);
    assert_eq!(last.total_bytes, 501_000);

    let statuses: Vec<_> = engine.reports().iter().map(|r| r.status).collect();
    assert_eq!(statuses, [JobStatus::Failed, JobStatus::Completed]);
    let left = p.items_in(&dst);
    assert_eq!(left.len(), 1);
    assert!(left[0].as_str().ends_with("fine.jpg"));
}

#[test]
fn write_open_failure_removes_created_item() {
    let p = MemoryProvider::new();
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    p.fail_write("a.jpg");
    let engine = engine(&p);
    let mut completed = engine.subscribe_completed();

    engine
        .enqueue(jobs(vec![media(&p, &src, "a.jpg", 5_000)], &dst))
        .unwrap();
    engine.wait_idle();

    assert!(p.items_in(&dst).is_empty(), "created item left behind");
    assert_eq!(p.deleted().len(), 1);
    let reports = engine.reports();
    assert_eq!(reports[0].status, JobStatus::Failed);
    assert!(reports[0].error.as_deref().unwrap_or("").contains("for writing"));
    assert!(matches!(completed.try_recv(), Err(TryRecvError::Empty)));

    let last = engine.latest_progress();
    assert!(last.completed);
    assert_eq!(last.copied_bytes, 0);
    assert_eq!(last.total_bytes, 0);
}

#[test]
fn enqueue_during_run_extends_total() {
    let p = MemoryProvider::new();
    p.set_read_delay(Duration::from_millis(2));
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let engine = engine(&p);
    let mut completed = engine.subscribe_completed();

    engine
        .enqueue(jobs(vec![media(&p, &src, "first.jpg", 4_000_000)], &dst))
        .unwrap();
    wait_until(TIMEOUT, || engine.latest_progress().copied_bytes > 0);
    engine
        .enqueue(jobs(vec![media(&p, &src, "second.jpg", 500_000)], &dst))
        .unwrap();
    assert_eq!(engine.latest_progress().total_bytes, 4_500_000);
    engine.wait_idle();

    let last = engine.latest_progress();
    assert!(last.completed);
    assert_eq!(last.copied_bytes, 4_500_000);
    assert_eq!(completed.try_recv().unwrap().display_name, "first.jpg");
    assert_eq!(completed.try_recv().unwrap().display_name, "second.jpg");
}

#[test]
fn snapshots_stay_within_bounds_and_never_decrease() {
    let p = MemoryProvider::new();
    p.set_read_delay(Duration::from_millis(1));
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let engine = engine(&p);

    let items = (0..4)
        .map(|i| media(&p, &src, &format!("f{i}.jpg"), 700_000))
        .collect();
    engine.enqueue(jobs(items, &dst)).unwrap();

    let mut last_copied = 0;
    loop {
        let s = engine.latest_progress();
        assert!(s.copied_bytes <= s.total_bytes);
        assert!(s.copied_bytes >= last_copied, "copied bytes went backwards");
        last_copied = s.copied_bytes;
        if s.completed {
            break;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(last_copied, 2_800_000);
}

#[test]
fn commands_on_idle_engine_are_noops() {
    let p = MemoryProvider::new();
    let engine = engine(&p);
    engine.pause();
    engine.resume();
    engine.cancel();
    assert_eq!(engine.state(), EngineState::Idle);
    assert!(engine.enqueue(Vec::new()).unwrap().is_empty());
    assert_eq!(engine.state(), EngineState::Idle);
    engine.wait_idle();
}

#[test]
fn engine_restarts_after_cancel() {
    let p = MemoryProvider::new();
    p.set_read_delay(Duration::from_millis(2));
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let engine = engine(&p);

    engine
        .enqueue(jobs(vec![media(&p, &src, "a.jpg", 3_000_000)], &dst))
        .unwrap();
    wait_until(TIMEOUT, || engine.latest_progress().copied_bytes > 0);
    engine.cancel();
    engine.wait_idle();

    let mut completed = engine.subscribe_completed();
    engine
        .enqueue(jobs(vec![media(&p, &src, "b.jpg", 10_000)], &dst))
        .unwrap();
    engine.wait_idle();

    let last = engine.latest_progress();
    assert!(last.completed);
    assert_eq!(last.total_bytes, 10_000);
    assert_eq!(last.copied_bytes, 10_000);
    assert_eq!(completed.try_recv().unwrap().display_name, "b.jpg");
}

#[tokio::test]
async fn progress_subscriber_sees_completion() {
    let p = MemoryProvider::new();
    let src = p.add_folder("src");
    let dst = p.add_folder("dst");
    let engine = engine(&p);
    let mut rx = engine.subscribe_progress();

    engine
        .enqueue(jobs(vec![media(&p, &src, "a.jpg", 300_000)], &dst))
        .unwrap();

    tokio::time::timeout(TIMEOUT, async {
        loop {
            let done = rx.borrow_and_update().completed;
            if done {
                break;
            }
            rx.changed().await.unwrap();
        }
    })
    .await
    .expect("run did not complete");

    // A late subscriber immediately sees the final value.
    let late = engine.subscribe_progress();
    assert!(late.borrow().completed);
    assert_eq!(late.borrow().copied_bytes, 300_000);
}
