//! Shared run state: independently observable cells.
//!
//! Every piece of state the UI renders lives in its own [`Observable`] cell.
//! A cell can be read ([`Observable::get`]), replaced ([`Observable::set`]) and
//! observed ([`Observable::subscribe`]). Observers run synchronously inside the
//! mutation that triggered them.
//!
//! The cells of one [`RunStore`] share a reentrant *turn lock*. Each mutation,
//! including the observer callbacks it triggers, runs while holding it, so
//! mutations coming from different tasks or threads are applied one at a time
//! and in order, as on a single UI thread. An observer may itself mutate other
//! cells; the lock is reentrant.
//!
//! # Examples
//!
//! ```
//! use algoviz::store::Observable;
//! use std::sync::atomic::{AtomicU64, Ordering};
//! use std::sync::Arc;
//!
//! let steps = Observable::new("steps", 0u64);
//! let seen = Arc::new(AtomicU64::new(0));
//!
//! let sink = seen.clone();
//! let subscription = steps.subscribe(move |v| sink.store(*v, Ordering::SeqCst));
//!
//! steps.set(3);
//! assert_eq!(seen.load(Ordering::SeqCst), 3);
//!
//! drop(subscription);
//! steps.set(4);
//! assert_eq!(seen.load(Ordering::SeqCst), 3);
//! ```

use parking_lot::{Mutex, ReentrantMutex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Identity of a run. Bumped by every new run and by stop.
pub type RunId = u64;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;
type TurnLock = Arc<ReentrantMutex<()>>;

struct Slot<T> {
    value: T,
    observers: Vec<(u64, Callback<T>)>,
    next_id: u64,
}

/// A single named piece of shared state with get/set/subscribe semantics.
///
/// Cloning an `Observable` yields another handle to the same cell.
pub struct Observable<T> {
    name: &'static str,
    slot: Arc<Mutex<Slot<T>>>,
    turn: TurnLock,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            slot: Arc::clone(&self.slot),
            turn: Arc::clone(&self.turn),
        }
    }
}

impl<T> fmt::Debug for Observable<T>
where
    T: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("Observable")
            .field("name", &self.name)
            .field("value", &slot.value)
            .field("observers", &slot.observers.len())
            .finish()
    }
}

impl<T> Observable<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Creates a standalone cell with its own turn lock.
    pub fn new(name: &'static str, value: T) -> Self {
        Self::with_turn(name, value, Arc::new(ReentrantMutex::new(())))
    }

    fn with_turn(name: &'static str, value: T, turn: TurnLock) -> Self {
        Self {
            name,
            slot: Arc::new(Mutex::new(Slot {
                value,
                observers: Vec::new(),
                next_id: 0,
            })),
            turn,
        }
    }

    /// The cell's name, used in logs and diagnostics.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.slot.lock().value.clone()
    }

    /// Replaces the value and notifies observers, in registration order.
    ///
    /// Setting a value equal to the current one is a no-op: nobody is notified.
    pub fn set(&self, value: T) {
        let _turn = self.turn.lock();
        let observers: Vec<(u64, Callback<T>)> = {
            let mut slot = self.slot.lock();
            if slot.value == value {
                return;
            }
            slot.value = value.clone();
            slot.observers
                .iter()
                .map(|(id, callback)| (*id, Arc::clone(callback)))
                .collect()
        };
        for (id, callback) in observers {
            // An earlier observer may have unsubscribed this one.
            if self.is_registered(id) {
                callback(&value);
            }
        }
    }

    /// Replaces the value with `f(current)`.
    ///
    /// The read and the write happen in the same turn.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let _turn = self.turn.lock();
        let current = self.get();
        self.set(f(&current));
    }

    /// Registers an observer.
    ///
    /// `callback` is invoked immediately with the current value and again on
    /// every change, until the returned [`Subscription`] is dropped or
    /// unsubscribed.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let _turn = self.turn.lock();
        let callback: Callback<T> = Arc::new(callback);
        let (id, current) = {
            let mut slot = self.slot.lock();
            let id = slot.next_id;
            slot.next_id += 1;
            slot.observers.push((id, Arc::clone(&callback)));
            (id, slot.value.clone())
        };

        let weak = Arc::downgrade(&self.slot);
        let subscription = Subscription::new(self.name, move || {
            if let Some(slot) = weak.upgrade() {
                slot.lock().observers.retain(|(observer, _)| *observer != id);
            }
        });

        callback(&current);
        subscription
    }

    /// Number of currently registered observers.
    pub fn observer_count(&self) -> usize {
        self.slot.lock().observers.len()
    }

    fn is_registered(&self, id: u64) -> bool {
        self.slot
            .lock()
            .observers
            .iter()
            .any(|(observer, _)| *observer == id)
    }
}

/// Handle to a registered observer.
///
/// Dropping the handle unsubscribes. Unsubscribing happens at most once, no
/// matter how many times [`unsubscribe`](Self::unsubscribe) or `drop` run.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cell: &'static str,
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(cell: &'static str, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cell,
            release: Some(Box::new(release)),
        }
    }

    /// Name of the observed cell.
    pub fn cell(&self) -> &'static str {
        self.cell
    }

    /// Whether the observer is still registered through this handle.
    pub fn is_active(&self) -> bool {
        self.release.is_some()
    }

    /// Removes the observer now.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    /// Keeps the observer registered for the lifetime of the cell.
    pub fn detach(mut self) {
        self.release = None;
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cell", &self.cell)
            .field("active", &self.is_active())
            .finish()
    }
}

/// Playback state of the visualizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlgorithmStatus {
    /// No run in progress.
    #[default]
    Idle,
    /// A run is stepping.
    Running,
    /// The live run is suspended at its next checkpoint.
    Paused,
}

/// Highlighted pseudo-code line range; `-1/-1` means nothing is highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    /// First highlighted line (1-based).
    pub start: i64,
    /// Last highlighted line, inclusive.
    pub end: i64,
}

impl LineRange {
    /// The "nothing highlighted" sentinel.
    pub const NONE: LineRange = LineRange { start: -1, end: -1 };

    /// A range covering `start..=end`.
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// A range covering a single line.
    pub const fn line(line: i64) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    /// Whether this is the sentinel.
    pub fn is_none(&self) -> bool {
        self.start < 0
    }
}

impl Default for LineRange {
    fn default() -> Self {
        Self::NONE
    }
}

/// Default playback speed on a `1..=100` scale.
pub const DEFAULT_SPEED: u32 = 50;

/// The shared run state: every cell the UI and the run controller use.
///
/// `RunStore` is a bundle of cell handles and is cheap to clone; pass it to
/// whoever needs it.
#[derive(Clone, Debug)]
pub struct RunStore {
    /// Whether the visualizer panel is open.
    pub is_open: Observable<bool>,
    /// Identifier of the selected algorithm, empty when none.
    pub selected_algorithm: Observable<String>,
    /// Pseudo-code of the selected algorithm.
    pub selected_algorithm_source: Observable<String>,
    /// Steps logged so far in the current run.
    pub current_step: Observable<u64>,
    /// Steps the current run will take.
    pub total_steps: Observable<u64>,
    /// Append-only trace of the current run.
    pub console_log: Observable<Arc<Vec<String>>>,
    /// Playback speed, read fresh at every step.
    pub speed: Observable<u32>,
    /// Highlighted pseudo-code line range.
    pub active_line: Observable<LineRange>,
    /// Playback status.
    pub status: Observable<AlgorithmStatus>,
    /// Bumped on every resume request; wakes paused waiters.
    pub resume_signal: Observable<u64>,
    /// Identity of the live run.
    pub run_id: Observable<RunId>,
    turn: TurnLock,
}

impl RunStore {
    /// Creates a store with default values.
    pub fn new() -> Self {
        Self::with_speed(DEFAULT_SPEED)
    }

    /// Creates a store with the given initial speed.
    pub fn with_speed(speed: u32) -> Self {
        let turn: TurnLock = Arc::new(ReentrantMutex::new(()));
        Self {
            is_open: Observable::with_turn("is_open", false, turn.clone()),
            selected_algorithm: Observable::with_turn(
                "selected_algorithm",
                String::new(),
                turn.clone(),
            ),
            selected_algorithm_source: Observable::with_turn(
                "selected_algorithm_source",
                String::new(),
                turn.clone(),
            ),
            current_step: Observable::with_turn("current_step", 0, turn.clone()),
            total_steps: Observable::with_turn("total_steps", 0, turn.clone()),
            console_log: Observable::with_turn("console_log", Arc::new(Vec::new()), turn.clone()),
            speed: Observable::with_turn("speed", speed, turn.clone()),
            active_line: Observable::with_turn("active_line", LineRange::NONE, turn.clone()),
            status: Observable::with_turn("status", AlgorithmStatus::Idle, turn.clone()),
            resume_signal: Observable::with_turn("resume_signal", 0, turn.clone()),
            run_id: Observable::with_turn("run_id", 0, turn.clone()),
            turn,
        }
    }

    /// Runs `f` within a single turn: no mutation from elsewhere interleaves.
    pub fn atomically<R>(&self, f: impl FnOnce() -> R) -> R {
        let _turn = self.turn.lock();
        f()
    }

    /// Appends a message to the console log.
    pub fn push_log(&self, message: String) {
        self.console_log.update(|log| {
            let mut next = Vec::with_capacity(log.len() + 1);
            next.extend(log.iter().cloned());
            next.push(message);
            Arc::new(next)
        });
    }

    /// Reads every cell within one turn.
    pub fn snapshot(&self) -> RunSnapshot {
        self.atomically(|| RunSnapshot {
            is_open: self.is_open.get(),
            selected_algorithm: self.selected_algorithm.get(),
            selected_algorithm_source: self.selected_algorithm_source.get(),
            current_step: self.current_step.get(),
            total_steps: self.total_steps.get(),
            console_log: self.console_log.get().as_ref().clone(),
            speed: self.speed.get(),
            active_line: self.active_line.get(),
            status: self.status.get(),
            resume_signal: self.resume_signal.get(),
            run_id: self.run_id.get(),
        })
    }
}

impl Default for RunStore {
    fn default() -> Self {
        Self::new()
    }
}

/// A consistent, serializable copy of every cell in a [`RunStore`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub is_open: bool,
    pub selected_algorithm: String,
    pub selected_algorithm_source: String,
    pub current_step: u64,
    pub total_steps: u64,
    pub console_log: Vec<String>,
    pub speed: u32,
    pub active_line: LineRange,
    pub status: AlgorithmStatus,
    pub resume_signal: u64,
    pub run_id: RunId,
}
