//! Run control: pacing, trace logging and cooperative pause/resume/cancel.
//!
//! An algorithm run is a sequence of asynchronous steps. Between steps it calls
//! into the [`RunController`] to find out whether it may continue, must wait for
//! the user to resume, or has been superseded and must stop.
//!
//! Cancellation is cooperative. A stale run is never aborted from outside; it
//! notices at its next checkpoint, gets [`Error::RunCancelled`], and propagates
//! it up to the run driver, which drops it silently.
//!
//! # Examples
//!
//! ```
//! use algoviz::{AlgorithmStatus, RunController, RunStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = RunStore::new();
//!     store.run_id.set(1);
//!     store.status.set(AlgorithmStatus::Running);
//!
//!     let controller = RunController::new(store.clone());
//!     let run = controller.context();
//!
//!     run.log("compare 3 and 1").unwrap();
//!     run.checkpoint().await.unwrap();
//!     assert_eq!(store.current_step.get(), 1);
//!
//!     // A newer run makes this one stale.
//!     store.run_id.set(2);
//!     assert!(run.checkpoint().await.unwrap_err().is_cancelled());
//! }
//! ```

use crate::error::{Error, Result};
use crate::store::{AlgorithmStatus, LineRange, RunId, RunStore, Subscription};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::oneshot;

/// Settings that turn the speed cell into a per-step delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Speed a fresh store starts with.
    pub default_speed: u32,
    /// Highest accepted speed; speeds are clamped to `1..=max_speed`.
    pub max_speed: u32,
    /// Delay added per speed unit below `max_speed + 1`.
    pub unit_delay: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            default_speed: crate::store::DEFAULT_SPEED,
            max_speed: 100,
            unit_delay: Duration::from_millis(10),
        }
    }
}

impl PlaybackConfig {
    /// Checks that the speed range is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_speed` is zero or `default_speed`
    /// falls outside `1..=max_speed`.
    pub fn validate(&self) -> Result<()> {
        if self.max_speed == 0 {
            return Err(Error::Config("max_speed must be at least 1".to_string()));
        }
        if self.default_speed == 0 || self.default_speed > self.max_speed {
            return Err(Error::Config(format!(
                "default_speed {} outside 1..={}",
                self.default_speed, self.max_speed
            )));
        }
        Ok(())
    }

    /// Clamps `speed` into `1..=max_speed`.
    pub fn clamp_speed(&self, speed: u32) -> u32 {
        speed.clamp(1, self.max_speed.max(1))
    }

    /// The pause between two steps at the given speed. Faster means shorter.
    pub fn step_delay(&self, speed: u32) -> Duration {
        let speed = self.clamp_speed(speed);
        self.unit_delay * (self.max_speed.max(1) + 1 - speed)
    }
}

/// How a pending resume wait ended.
enum Wake {
    Resumed,
    Cancelled,
}

/// Book-keeping shared by the two observers of one resume wait.
struct PendingWait {
    outcome: Option<oneshot::Sender<Wake>>,
    subscriptions: Vec<Subscription>,
}

/// First caller wins: delivers the outcome and tears both observers down.
fn settle(pending: &Weak<Mutex<PendingWait>>, wake: Wake) {
    let Some(pending) = pending.upgrade() else {
        return;
    };
    let released = {
        let mut pending = pending.lock();
        let Some(outcome) = pending.outcome.take() else {
            return;
        };
        let _ = outcome.send(wake);
        std::mem::take(&mut pending.subscriptions)
    };
    drop(released);
}

/// Tears the observers down if the wait is abandoned before it settles.
struct WaitGuard(Arc<Mutex<PendingWait>>);

impl WaitGuard {
    fn register(&self, subscription: Subscription) {
        let mut pending = self.0.lock();
        if pending.outcome.is_some() {
            pending.subscriptions.push(subscription);
            return;
        }
        drop(pending);
        // Settled during registration; nothing left to observe.
        drop(subscription);
    }
}

impl Drop for WaitGuard {
    fn drop(&mut self) {
        let released = {
            let mut pending = self.0.lock();
            pending.outcome = None;
            std::mem::take(&mut pending.subscriptions)
        };
        drop(released);
    }
}

/// Gives step sequences pacing, logging and pause/cancel checkpoints.
///
/// The controller holds a [`RunStore`] handle and is cheap to clone.
#[derive(Debug, Clone)]
pub struct RunController {
    store: RunStore,
    playback: PlaybackConfig,
}

impl RunController {
    /// Creates a controller over `store` with default playback settings.
    pub fn new(store: RunStore) -> Self {
        Self::with_playback(store, PlaybackConfig::default())
    }

    /// Creates a controller over `store` with the given playback settings.
    pub fn with_playback(store: RunStore, playback: PlaybackConfig) -> Self {
        Self { store, playback }
    }

    /// The shared run state this controller drives.
    pub fn store(&self) -> &RunStore {
        &self.store
    }

    /// The playback settings.
    pub fn playback(&self) -> &PlaybackConfig {
        &self.playback
    }

    /// Suspends the caller for `duration` without blocking the runtime.
    ///
    /// Not cancellable: callers detect cancellation with a checkpoint afterwards.
    pub async fn delay(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// The per-step delay for the current speed, read fresh from the store.
    pub fn step_delay(&self) -> Duration {
        self.playback.step_delay(self.store.speed.get())
    }

    /// Appends `message` to the console log and advances the step counter.
    ///
    /// Both updates happen in one store turn.
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        self.store.atomically(|| {
            self.store.push_log(message);
            self.store.current_step.update(|n| n + 1);
        });
    }

    /// The checkpoint a step sequence calls between steps.
    ///
    /// Returns immediately when `expected` is still the live run and playback
    /// is not paused. While paused, suspends in
    /// [`wait_until_resume`](Self::wait_until_resume).
    ///
    /// # Errors
    ///
    /// [`Error::RunCancelled`] if the live run id differs from `expected`,
    /// before or after any suspension.
    pub async fn pause_if_needed(&self, expected: RunId) -> Result<()> {
        if self.store.run_id.get() != expected {
            return Err(Error::RunCancelled);
        }

        if self.store.status.get() == AlgorithmStatus::Paused {
            log::debug!("Run {} paused, waiting for resume", expected);
            self.wait_until_resume(expected).await?;
            log::debug!("Run {} resumed", expected);
        }

        if self.store.run_id.get() != expected {
            return Err(Error::RunCancelled);
        }
        Ok(())
    }

    /// [`pause_if_needed`](Self::pause_if_needed) for whatever run is live now.
    pub async fn pause_if_current(&self) -> Result<()> {
        self.pause_if_needed(self.store.run_id.get()).await
    }

    /// Suspends until the user resumes or the run goes stale.
    ///
    /// Observes the run id and the resume signal for the whole wait:
    ///
    /// - the run id moving away from `expected` cancels the wait;
    /// - the resume signal firing while status is [`AlgorithmStatus::Running`]
    ///   and the run id still equals `expected` resolves it.
    ///
    /// Exactly two observers are registered. Whichever branch settles first
    /// removes both; dropping the future before it settles removes them too.
    ///
    /// # Errors
    ///
    /// [`Error::RunCancelled`] if the run went stale while waiting.
    pub async fn wait_until_resume(&self, expected: RunId) -> Result<()> {
        let (outcome, wake) = oneshot::channel();
        let pending = Arc::new(Mutex::new(PendingWait {
            outcome: Some(outcome),
            subscriptions: Vec::with_capacity(2),
        }));
        let guard = WaitGuard(Arc::clone(&pending));

        let weak = Arc::downgrade(&pending);
        guard.register(self.store.run_id.subscribe(move |current| {
            if *current != expected {
                settle(&weak, Wake::Cancelled);
            }
        }));

        let weak = Arc::downgrade(&pending);
        let run_id = self.store.run_id.clone();
        let status = self.store.status.clone();
        guard.register(self.store.resume_signal.subscribe(move |_| {
            if run_id.get() != expected {
                settle(&weak, Wake::Cancelled);
            } else if status.get() == AlgorithmStatus::Running {
                settle(&weak, Wake::Resumed);
            }
        }));

        let woke = wake.await;
        drop(guard);

        match woke {
            Ok(Wake::Resumed) => Ok(()),
            Ok(Wake::Cancelled) | Err(_) => Err(Error::RunCancelled),
        }
    }

    /// A handle bound to the run that is live right now.
    pub fn context(&self) -> RunContext {
        self.context_for(self.store.run_id.get())
    }

    /// A handle bound to `run_id`.
    pub fn context_for(&self, run_id: RunId) -> RunContext {
        RunContext {
            controller: self.clone(),
            run_id,
        }
    }
}

/// The controller as seen by one run.
///
/// Captures the run id at creation. Every visible mutation made through it
/// checks that the run is still live in the same store turn that applies the
/// mutation, so a dead run can never append, advance or highlight.
#[derive(Debug, Clone)]
pub struct RunContext {
    controller: RunController,
    run_id: RunId,
}

impl RunContext {
    /// The run this context belongs to.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The underlying controller.
    pub fn controller(&self) -> &RunController {
        &self.controller
    }

    /// Whether this run is still the live one.
    pub fn is_live(&self) -> bool {
        self.controller.store.run_id.get() == self.run_id
    }

    /// Pause/cancel checkpoint for this run.
    pub async fn checkpoint(&self) -> Result<()> {
        self.controller.pause_if_needed(self.run_id).await
    }

    /// Waits one step delay at the current speed, then checkpoints.
    pub async fn pace(&self) -> Result<()> {
        self.controller.delay(self.controller.step_delay()).await;
        self.checkpoint().await
    }

    /// Logs a trace message if the run is live.
    pub fn log(&self, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        self.guarded(|controller| controller.log(message))
    }

    /// Highlights a pseudo-code range if the run is live.
    pub fn highlight(&self, line: LineRange) -> Result<()> {
        self.guarded(|controller| controller.store.active_line.set(line))
    }

    /// Publishes the expected step count if the run is live.
    pub fn set_total_steps(&self, total: u64) -> Result<()> {
        self.guarded(|controller| controller.store.total_steps.set(total))
    }

    fn guarded<R>(&self, f: impl FnOnce(&RunController) -> R) -> Result<R> {
        let store = &self.controller.store;
        store.atomically(|| {
            if store.run_id.get() == self.run_id {
                Ok(f(&self.controller))
            } else {
                Err(Error::RunCancelled)
            }
        })
    }
}
