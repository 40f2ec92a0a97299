//! End-to-end run control: pausing, resuming and superseding runs.

use algoviz::{
    AlgorithmStatus, Error, PlaybackConfig, Result, RunContext, RunController, RunOutcome,
    RunStore, Session,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;

/// Lets spawned tasks run until they block.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

fn running_store(run_id: u64) -> RunStore {
    let store = RunStore::new();
    store.run_id.set(run_id);
    store.status.set(AlgorithmStatus::Running);
    store
}

fn log_of(store: &RunStore) -> Vec<String> {
    store.console_log.get().as_ref().clone()
}

/// Logs "step1", waits for `gate`, checkpoints, logs "step2".
async fn two_step_algorithm(run: RunContext, gate: oneshot::Receiver<()>) -> Result<()> {
    run.log("step1")?;
    let _ = gate.await;
    run.checkpoint().await?;
    run.log("step2")?;
    Ok(())
}

#[tokio::test]
async fn test_pause_between_steps_then_resume() {
    let store = running_store(1);
    let controller = RunController::new(store.clone());
    let (open_gate, gate) = oneshot::channel();
    let run = tokio::spawn(two_step_algorithm(controller.context(), gate));

    settle().await;
    assert_eq!(log_of(&store), vec!["step1"]);

    store.status.set(AlgorithmStatus::Paused);
    open_gate.send(()).unwrap();
    settle().await;

    assert!(!run.is_finished());
    assert_eq!(log_of(&store), vec!["step1"]);
    assert_eq!(store.current_step.get(), 1);
    assert_eq!(store.run_id.observer_count(), 1);
    assert_eq!(store.resume_signal.observer_count(), 1);

    store.atomically(|| {
        store.status.set(AlgorithmStatus::Running);
        store.resume_signal.update(|n| n + 1);
    });

    run.await.unwrap().unwrap();
    assert_eq!(log_of(&store), vec!["step1", "step2"]);
    assert_eq!(store.current_step.get(), 2);
    assert_eq!(store.run_id.observer_count(), 0);
    assert_eq!(store.resume_signal.observer_count(), 0);
}

#[tokio::test]
async fn test_new_run_cancels_paused_run() {
    let store = running_store(1);
    let controller = RunController::new(store.clone());
    let (open_gate, gate) = oneshot::channel();
    let run_a = tokio::spawn(two_step_algorithm(controller.context(), gate));

    settle().await;
    store.status.set(AlgorithmStatus::Paused);
    open_gate.send(()).unwrap();
    settle().await;
    assert!(!run_a.is_finished());

    // Run B starts.
    store.atomically(|| {
        store.status.set(AlgorithmStatus::Running);
        store.run_id.set(2);
    });

    let err = run_a.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::RunCancelled));
    assert_eq!(log_of(&store), vec!["step1"]);
    assert_eq!(store.current_step.get(), 1);
    assert_eq!(store.run_id.observer_count(), 0);
    assert_eq!(store.resume_signal.observer_count(), 0);
}

#[tokio::test]
async fn test_resume_signal_alone_does_not_wake() {
    let store = running_store(1);
    store.status.set(AlgorithmStatus::Paused);
    let controller = RunController::new(store.clone());
    let check = tokio::spawn({
        let controller = controller.clone();
        async move { controller.pause_if_needed(1).await }
    });

    settle().await;
    store.resume_signal.update(|n| n + 1);
    settle().await;
    assert!(!check.is_finished());

    store.status.set(AlgorithmStatus::Running);
    settle().await;
    assert!(!check.is_finished());

    store.resume_signal.update(|n| n + 1);
    check.await.unwrap().unwrap();
}

#[test]
fn test_log_and_step_counter_advance_together() {
    let store = running_store(1);
    let controller = RunController::new(store.clone());
    let mismatches = Arc::new(Mutex::new(Vec::new()));

    let observed = store.clone();
    let sink = mismatches.clone();
    let _watch = store.current_step.subscribe(move |current| {
        let length = observed.console_log.get().len() as u64;
        if length != *current {
            sink.lock().unwrap().push((length, *current));
        }
    });

    let threads: Vec<_> = (0..4)
        .map(|t| {
            let controller = controller.clone();
            std::thread::spawn(move || {
                for i in 0..50 {
                    controller.log(format!("thread {t} step {i}"));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }

    assert!(mismatches.lock().unwrap().is_empty());
    assert_eq!(store.current_step.get(), 200);
    assert_eq!(store.console_log.get().len(), 200);
}

fn fast_session() -> Session {
    Session::new(PlaybackConfig {
        unit_delay: Duration::from_millis(1),
        ..PlaybackConfig::default()
    })
}

#[tokio::test(start_paused = true)]
async fn test_repeated_pause_resume_keeps_one_waiter() {
    let session = fast_session();
    let store = session.store().clone();
    let handle = session.start_run("mergeSort", None).unwrap();

    for _ in 0..10 {
        session.pause();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(store.run_id.observer_count() <= 1);
        assert!(store.resume_signal.observer_count() <= 1);

        session.resume();
        tokio::time::sleep(Duration::from_millis(60)).await;
    }

    assert_eq!(handle.finished().await, RunOutcome::Completed);
    assert_eq!(store.run_id.observer_count(), 0);
    assert_eq!(store.resume_signal.observer_count(), 0);
    assert_eq!(store.current_step.get(), store.total_steps.get());
}

#[tokio::test(start_paused = true)]
async fn test_stale_run_never_writes_after_cancellation() {
    let session = fast_session();
    let store = session.store().clone();
    let first = session.start_run("quickSort", None).unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;
    session.pause();
    tokio::time::sleep(Duration::from_millis(500)).await;

    let second = session
        .start_run("factorialCalculator", Some(serde_json::json!({ "n": 2 })))
        .unwrap();
    assert_eq!(first.finished().await, RunOutcome::Cancelled);
    assert_eq!(second.finished().await, RunOutcome::Completed);

    let log = log_of(&store);
    assert_eq!(log.last().map(String::as_str), Some("2! = 2"));
    assert!(log.iter().all(|entry| !entry.starts_with("Partition")));
    assert_eq!(store.current_step.get(), log.len() as u64);
}

#[tokio::test(start_paused = true)]
async fn test_stop_while_paused() {
    let session = fast_session();
    let store = session.store().clone();
    let handle = session.start_run("towersOfHanoi", None).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    session.pause();
    tokio::time::sleep(Duration::from_millis(100)).await;

    session.stop();
    assert_eq!(handle.finished().await, RunOutcome::Cancelled);
    assert_eq!(store.status.get(), AlgorithmStatus::Idle);
    assert!(store.active_line.get().is_none());
    assert!(!session.resume());
}
