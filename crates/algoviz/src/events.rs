//! Real-time run events for WebSocket clients.
//!
//! The [`EventBroadcaster`] fans [`RunEvent`]s out to every connected client
//! over a Tokio `broadcast` channel. [`EventBroadcaster::attach`] bridges a
//! [`RunStore`] into it: one observer per visible cell turns each change into
//! an event.
//!
//! Observers run synchronously inside the store's turn lock, so broadcasting
//! never awaits. Events are therefore emitted in exactly the order the store
//! applied the changes.
//!
//! # Examples
//!
//! ```
//! use algoviz::{EventBroadcaster, RunEvent, RunStore};
//!
//! let store = RunStore::new();
//! let broadcaster = EventBroadcaster::new();
//! let _bridge = broadcaster.attach(&store);
//! let mut receiver = broadcaster.subscribe();
//!
//! store.speed.set(80);
//! assert!(matches!(receiver.try_recv(), Ok(RunEvent::SpeedChanged { speed: 80 })));
//! ```

use crate::store::{AlgorithmStatus, LineRange, Observable, RunId, RunSnapshot, RunStore, Subscription};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// The maximum number of events to buffer in the broadcast channel.
const EVENT_BUFFER_SIZE: usize = 1000;

/// Events sent to visualization clients.
///
/// Serialized with a `type` field naming the variant:
///
/// ```json
/// { "type": "log_appended", "entry": "Visit 40", "length": 12 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RunEvent {
    /// Full state, sent to a client when it connects.
    Snapshot { state: RunSnapshot },

    /// A new run became live. Clients should clear their log.
    RunStarted {
        run_id: RunId,
        algorithm: String,
        total_steps: u64,
    },

    StatusChanged { status: AlgorithmStatus },

    /// One entry was appended to the console log.
    LogAppended {
        entry: String,
        /// Log length after the append.
        length: usize,
    },

    StepChanged { current_step: u64 },

    TotalChanged { total_steps: u64 },

    ActiveLineChanged { line: LineRange },

    SpeedChanged { speed: u32 },

    SelectionChanged { algorithm: String },

    PanelChanged { open: bool },

    /// A new client has connected.
    Connected { client_id: String },

    /// Keep-alive.
    Ping {
        /// Unix timestamp in milliseconds.
        timestamp: i64,
    },

    Error { message: String },
}

impl RunEvent {
    /// Creates a `Ping` event with the current timestamp.
    pub fn ping() -> Self {
        RunEvent::Ping {
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        RunEvent::Error {
            message: message.into(),
        }
    }

    pub fn snapshot(state: RunSnapshot) -> Self {
        RunEvent::Snapshot { state }
    }

    /// Serializes the event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Sends [`RunEvent`]s to all connected WebSocket clients.
///
/// Cheap to clone; clones share the channel, the client set and the counter.
/// If a slow receiver falls more than 1000 events behind, it misses the oldest
/// ones and should resynchronize from a snapshot.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<RunEvent>,
    clients: Arc<RwLock<HashSet<String>>>,
    event_count: Arc<AtomicU64>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER_SIZE);
        Self {
            sender,
            clients: Arc::new(RwLock::new(HashSet::new())),
            event_count: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns a receiver for all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.sender.subscribe()
    }

    /// Sends `event` to every receiver and returns how many got it.
    pub fn broadcast(&self, event: RunEvent) -> usize {
        self.event_count.fetch_add(1, Ordering::Relaxed);
        self.sender.send(event).unwrap_or(0)
    }

    /// Adds a client and announces it with [`RunEvent::Connected`].
    pub fn register_client(&self, client_id: String) {
        self.clients.write().insert(client_id.clone());
        self.broadcast(RunEvent::Connected { client_id });
    }

    pub fn unregister_client(&self, client_id: &str) {
        self.clients.write().remove(client_id);
    }

    pub fn client_count(&self) -> usize {
        self.clients.read().len()
    }

    /// Total events broadcast since creation.
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }

    /// Forwards every visible change of `store` as an event.
    ///
    /// The bridge stays active for as long as the returned subscriptions are
    /// kept. The current values are not replayed; send a
    /// [`RunEvent::Snapshot`] for that.
    pub fn attach(&self, store: &RunStore) -> Vec<Subscription> {
        let mut bridge = vec![
            self.forward(&store.status, |status| RunEvent::StatusChanged { status }),
            self.forward(&store.current_step, |current_step| RunEvent::StepChanged {
                current_step,
            }),
            self.forward(&store.total_steps, |total_steps| RunEvent::TotalChanged {
                total_steps,
            }),
            self.forward(&store.active_line, |line| RunEvent::ActiveLineChanged { line }),
            self.forward(&store.speed, |speed| RunEvent::SpeedChanged { speed }),
            self.forward(&store.selected_algorithm, |algorithm| {
                RunEvent::SelectionChanged { algorithm }
            }),
            self.forward(&store.is_open, |open| RunEvent::PanelChanged { open }),
        ];

        let seen = Mutex::new(store.console_log.get().len());
        let events = self.clone();
        bridge.push(store.console_log.subscribe(move |log| {
            let mut seen = seen.lock();
            // A shorter log means a reset; the run start event covers it.
            for (index, entry) in log.iter().enumerate().skip(*seen) {
                events.broadcast(RunEvent::LogAppended {
                    entry: entry.clone(),
                    length: index + 1,
                });
            }
            *seen = log.len();
        }));

        let events = self.clone();
        let status = store.status.clone();
        let algorithm = store.selected_algorithm.clone();
        let total = store.total_steps.clone();
        let primed = AtomicBool::new(false);
        bridge.push(store.run_id.subscribe(move |run_id| {
            if !primed.swap(true, Ordering::Relaxed) {
                return;
            }
            // Stop bumps the run id too, but only after going idle.
            if status.get() == AlgorithmStatus::Running {
                events.broadcast(RunEvent::RunStarted {
                    run_id: *run_id,
                    algorithm: algorithm.get(),
                    total_steps: total.get(),
                });
            }
        }));

        bridge
    }

    /// Observes `cell`, skipping the immediate first call `subscribe` makes.
    fn forward<T>(&self, cell: &Observable<T>, event: fn(T) -> RunEvent) -> Subscription
    where
        T: Clone + PartialEq + Send + Sync + 'static,
    {
        let events = self.clone();
        let primed = AtomicBool::new(false);
        cell.subscribe(move |value| {
            if primed.swap(true, Ordering::Relaxed) {
                events.broadcast(event(value.clone()));
            }
        })
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    fn drain(receiver: &mut broadcast::Receiver<RunEvent>) -> Vec<RunEvent> {
        let mut events = Vec::new();
        loop {
            match receiver.try_recv() {
                Ok(event) => events.push(event),
                Err(TryRecvError::Empty) => return events,
                Err(e) => panic!("unexpected receive error: {e}"),
            }
        }
    }

    #[tokio::test]
    async fn test_event_broadcaster() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();

        assert_eq!(broadcaster.broadcast(RunEvent::error("boom")), 1);

        let event = receiver.recv().await.unwrap();
        assert_eq!(event, RunEvent::error("boom"));
        assert_eq!(broadcaster.event_count(), 1);
    }

    #[test]
    fn test_client_registration() {
        let broadcaster = EventBroadcaster::new();
        assert_eq!(broadcaster.client_count(), 0);

        broadcaster.register_client("client1".to_string());
        assert_eq!(broadcaster.client_count(), 1);
        assert_eq!(broadcaster.event_count(), 1);

        broadcaster.unregister_client("client1");
        assert_eq!(broadcaster.client_count(), 0);
    }

    #[test]
    fn test_event_serialization() {
        let json = RunEvent::ping().to_json();
        assert!(json.contains("\"type\":\"ping\""));
        assert!(json.contains("timestamp"));

        let json = RunEvent::StatusChanged {
            status: AlgorithmStatus::Paused,
        }
        .to_json();
        assert_eq!(json, r#"{"type":"status_changed","status":"paused"}"#);
    }

    #[test]
    fn test_attach_does_not_replay_current_values() {
        let store = RunStore::new();
        store.push_log("old".to_string());
        let broadcaster = EventBroadcaster::new();
        let _bridge = broadcaster.attach(&store);
        assert_eq!(broadcaster.event_count(), 0);
    }

    #[test]
    fn test_attach_forwards_changes_in_order() {
        let store = RunStore::new();
        let broadcaster = EventBroadcaster::new();
        let _bridge = broadcaster.attach(&store);
        let mut receiver = broadcaster.subscribe();

        store.atomically(|| {
            store.push_log("compare 3 and 1".to_string());
            store.current_step.update(|n| n + 1);
        });
        store.active_line.set(LineRange::new(2, 3));

        assert_eq!(
            drain(&mut receiver),
            vec![
                RunEvent::LogAppended {
                    entry: "compare 3 and 1".to_string(),
                    length: 1,
                },
                RunEvent::StepChanged { current_step: 1 },
                RunEvent::ActiveLineChanged {
                    line: LineRange::new(2, 3),
                },
            ]
        );
    }

    #[test]
    fn test_run_started_only_for_running_status() {
        let store = RunStore::new();
        let broadcaster = EventBroadcaster::new();
        let _bridge = broadcaster.attach(&store);
        let mut receiver = broadcaster.subscribe();

        store.atomically(|| {
            store.selected_algorithm.set("quickSort".to_string());
            store.total_steps.set(9);
            store.status.set(AlgorithmStatus::Running);
            store.run_id.set(1);
        });
        let events = drain(&mut receiver);
        assert_eq!(
            events.last(),
            Some(&RunEvent::RunStarted {
                run_id: 1,
                algorithm: "quickSort".to_string(),
                total_steps: 9,
            })
        );

        store.atomically(|| {
            store.status.set(AlgorithmStatus::Idle);
            store.run_id.set(2);
        });
        let events = drain(&mut receiver);
        assert_eq!(
            events,
            vec![RunEvent::StatusChanged {
                status: AlgorithmStatus::Idle,
            }]
        );
    }

    #[test]
    fn test_dropping_bridge_stops_events() {
        let store = RunStore::new();
        let broadcaster = EventBroadcaster::new();
        let bridge = broadcaster.attach(&store);
        assert_eq!(store.status.observer_count(), 1);

        drop(bridge);
        assert_eq!(store.status.observer_count(), 0);
        store.status.set(AlgorithmStatus::Running);
        assert_eq!(broadcaster.event_count(), 0);
    }
}
