//! Inbound UI operations: start, pause, resume, stop, speed, selection.
//!
//! A [`Session`] owns the run controller and the algorithm registry. Starting a
//! run builds the algorithm, computes its trace, resets the store for the new
//! run in a single turn and spawns a driver task that replays the trace step by
//! step through a [`RunContext`].

use crate::algorithms::{Registry, Trace};
use crate::controller::{PlaybackConfig, RunContext, RunController};
use crate::error::Result;
use crate::store::{AlgorithmStatus, LineRange, RunId, RunSnapshot, RunStore};

use std::sync::Arc;
use tokio::task::JoinHandle;

/// How a run's driver task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step was shown and the run was still live at the end.
    Completed,
    /// A newer run or a stop superseded this one.
    Cancelled,
    /// The driver failed for a reason other than cancellation.
    Failed(String),
}

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    run_id: RunId,
    join: JoinHandle<RunOutcome>,
}

impl RunHandle {
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Waits for the driver task to end.
    pub async fn finished(self) -> RunOutcome {
        match self.join.await {
            Ok(outcome) => outcome,
            Err(e) => RunOutcome::Failed(e.to_string()),
        }
    }
}

/// The operations the UI performs on the shared run state.
#[derive(Debug, Clone)]
pub struct Session {
    controller: RunController,
    registry: Arc<Registry>,
}

impl Session {
    /// Creates a session over a fresh store whose speed starts at
    /// `playback.default_speed`.
    pub fn new(playback: PlaybackConfig) -> Self {
        let store = RunStore::with_speed(playback.clamp_speed(playback.default_speed));
        Self::with_store(store, playback)
    }

    /// Creates a session over an existing store.
    pub fn with_store(store: RunStore, playback: PlaybackConfig) -> Self {
        Self {
            controller: RunController::with_playback(store, playback),
            registry: Arc::new(Registry::new()),
        }
    }

    pub fn store(&self) -> &RunStore {
        self.controller.store()
    }

    pub fn controller(&self) -> &RunController {
        &self.controller
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Starts a run of algorithm `id`, superseding any run in progress.
    ///
    /// Must be called from within a tokio runtime: the driver is spawned onto it.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownAlgorithm`](crate::Error::UnknownAlgorithm) or
    /// [`Error::InvalidInput`](crate::Error::InvalidInput). The store is left
    /// untouched on error.
    pub fn start_run(&self, id: &str, input: Option<serde_json::Value>) -> Result<RunHandle> {
        let algorithm = self.registry.build(id, input)?;
        let trace = algorithm.trace();
        let source = algorithm.source();
        let total = trace.len() as u64;

        let store = self.store();
        // The run id moves last so its observers see the new run fully set up.
        let run_id = store.atomically(|| {
            let run_id = store.run_id.get() + 1;
            store.selected_algorithm.set(id.to_string());
            store.selected_algorithm_source.set(source.to_string());
            store.current_step.set(0);
            store.total_steps.set(total);
            store.console_log.set(Arc::new(Vec::new()));
            store.active_line.set(LineRange::NONE);
            store.status.set(AlgorithmStatus::Running);
            store.is_open.set(true);
            store.run_id.set(run_id);
            run_id
        });
        log::info!("Run {} started: {} ({} steps)", run_id, id, total);

        let run = self.controller.context_for(run_id);
        let join = tokio::spawn(drive(run, trace));
        Ok(RunHandle { run_id, join })
    }

    /// Pauses a running run. Returns whether anything changed.
    pub fn pause(&self) -> bool {
        let store = self.store();
        let changed = store.atomically(|| {
            if store.status.get() != AlgorithmStatus::Running {
                return false;
            }
            store.status.set(AlgorithmStatus::Paused);
            true
        });
        if changed {
            log::debug!("Run {} paused", store.run_id.get());
        }
        changed
    }

    /// Resumes a paused run. Returns whether anything changed.
    pub fn resume(&self) -> bool {
        let store = self.store();
        let changed = store.atomically(|| {
            if store.status.get() != AlgorithmStatus::Paused {
                return false;
            }
            // Status first: the waiter checks it when the signal fires.
            store.status.set(AlgorithmStatus::Running);
            store.resume_signal.update(|n| n + 1);
            true
        });
        if changed {
            log::debug!("Run {} resumed", store.run_id.get());
        }
        changed
    }

    /// Cancels the live run, if any, and returns to idle.
    pub fn stop(&self) {
        let store = self.store();
        let stopped = store.atomically(|| {
            let stopped = store.run_id.get();
            store.status.set(AlgorithmStatus::Idle);
            store.active_line.set(LineRange::NONE);
            store.run_id.update(|id| id + 1);
            stopped
        });
        log::info!("Run {} stopped", stopped);
    }

    /// Applies `speed` clamped to the configured range and returns the value
    /// actually applied.
    pub fn set_speed(&self, speed: u32) -> u32 {
        let applied = self.controller.playback().clamp_speed(speed);
        self.store().speed.set(applied);
        applied
    }

    /// Selects an algorithm without running it.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownAlgorithm`](crate::Error::UnknownAlgorithm) for an
    /// unregistered id.
    pub fn select(&self, id: &str) -> Result<()> {
        let algorithm = self.registry.build(id, None)?;
        let store = self.store();
        store.atomically(|| {
            store.selected_algorithm.set(id.to_string());
            store.selected_algorithm_source.set(algorithm.source().to_string());
        });
        Ok(())
    }

    pub fn set_open(&self, open: bool) {
        self.store().is_open.set(open);
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.store().snapshot()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(PlaybackConfig::default())
    }
}

async fn drive(run: RunContext, trace: Trace) -> RunOutcome {
    let run_id = run.run_id();
    match play(&run, trace).await {
        Ok(()) => {
            let store = run.controller().store();
            let finished = store.atomically(|| {
                if !run.is_live() {
                    return false;
                }
                store.status.set(AlgorithmStatus::Idle);
                store.active_line.set(LineRange::NONE);
                true
            });
            if finished {
                log::info!("Run {} completed", run_id);
                RunOutcome::Completed
            } else {
                log::debug!("Run {} superseded after its last step", run_id);
                RunOutcome::Cancelled
            }
        }
        Err(e) if e.is_cancelled() => {
            log::debug!("Run {} cancelled", run_id);
            RunOutcome::Cancelled
        }
        Err(e) => {
            log::error!("Run {} failed: {}", run_id, e);
            RunOutcome::Failed(e.to_string())
        }
    }
}

async fn play(run: &RunContext, trace: Trace) -> Result<()> {
    for step in trace {
        run.checkpoint().await?;
        run.highlight(step.line)?;
        run.log(step.message)?;
        run.pace().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;
    use std::time::Duration;

    fn two_values() -> Option<serde_json::Value> {
        Some(json!({ "values": [2, 1] }))
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_completes() {
        let session = Session::default();
        let handle = session.start_run("insertionSort", two_values()).unwrap();
        assert_eq!(handle.run_id(), 1);
        assert_eq!(handle.finished().await, RunOutcome::Completed);

        let state = session.snapshot();
        assert_eq!(state.status, AlgorithmStatus::Idle);
        assert_eq!(state.current_step, 5);
        assert_eq!(state.total_steps, 5);
        assert_eq!(state.console_log.last().map(String::as_str), Some("Sorted: [1, 2]"));
        assert!(state.active_line.is_none());
        assert!(state.is_open);
        assert_eq!(state.selected_algorithm, "insertionSort");
        assert!(state.selected_algorithm_source.starts_with("for i in 1..n:"));
    }

    #[tokio::test]
    async fn test_unknown_algorithm_leaves_state_untouched() {
        let session = Session::default();
        let before = session.snapshot();
        let err = session.start_run("bogoSort", None).unwrap_err();
        assert!(matches!(err, Error::UnknownAlgorithm(_)));
        assert_eq!(session.snapshot(), before);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_holds_until_resume() {
        let session = Session::default();
        let handle = session.start_run("insertionSort", two_values()).unwrap();
        assert!(session.pause());
        assert!(!session.pause());

        tokio::time::sleep(Duration::from_secs(30)).await;
        let state = session.snapshot();
        assert_eq!(state.status, AlgorithmStatus::Paused);
        assert_eq!(state.current_step, 0);

        assert!(session.resume());
        assert!(!session.resume());
        assert_eq!(handle.finished().await, RunOutcome::Completed);
        assert_eq!(session.snapshot().current_step, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_and_goes_idle() {
        let session = Session::default();
        let handle = session.start_run("insertionSort", two_values()).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        let logged = session.snapshot().current_step;
        assert_eq!(logged, 1);

        session.stop();
        assert_eq!(handle.finished().await, RunOutcome::Cancelled);

        let state = session.snapshot();
        assert_eq!(state.status, AlgorithmStatus::Idle);
        assert!(state.active_line.is_none());
        assert_eq!(state.current_step, logged);
        assert_eq!(state.run_id, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_run_supersedes_paused_run() {
        let session = Session::default();
        let first = session.start_run("heapSort", None).unwrap();
        tokio::time::sleep(Duration::from_millis(1)).await;
        session.pause();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let second = session.start_run("insertionSort", two_values()).unwrap();
        assert_eq!(first.finished().await, RunOutcome::Cancelled);
        assert_eq!(second.finished().await, RunOutcome::Completed);

        let state = session.snapshot();
        let expected: Vec<String> = session
            .registry()
            .build("insertionSort", two_values())
            .unwrap()
            .trace()
            .messages()
            .map(String::from)
            .collect();
        assert_eq!(state.console_log, expected);
        assert_eq!(state.selected_algorithm, "insertionSort");
    }

    #[test]
    fn test_set_speed_clamps() {
        let session = Session::default();
        assert_eq!(session.snapshot().speed, 50);
        assert_eq!(session.set_speed(0), 1);
        assert_eq!(session.set_speed(1000), 100);
        assert_eq!(session.set_speed(75), 75);
        assert_eq!(session.store().speed.get(), 75);
    }

    #[test]
    fn test_select_and_panel() {
        let session = Session::default();
        session.select("towersOfHanoi").unwrap();
        session.set_open(true);

        let state = session.snapshot();
        assert_eq!(state.selected_algorithm, "towersOfHanoi");
        assert!(state.selected_algorithm_source.starts_with("hanoi("));
        assert!(state.is_open);
        assert_eq!(state.status, AlgorithmStatus::Idle);
        assert!(session.select("nope").is_err());
    }

    #[test]
    fn test_new_uses_configured_default_speed() {
        let session = Session::new(PlaybackConfig {
            default_speed: 20,
            ..PlaybackConfig::default()
        });
        assert_eq!(session.store().speed.get(), 20);
    }
}
