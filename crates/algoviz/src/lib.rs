#![doc = include_str!("../README.md")]
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       algoviz server                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  api (axum)       REST + WS /ws/updates                       │
//! │     │                                                        │
//! │  session          start / pause / resume / stop / speed       │
//! │     │                                                        │
//! │  controller       delay, log, pause_if_needed,                │
//! │     │             wait_until_resume, RunContext               │
//! │     │                                                        │
//! │  store            observable cells sharing one turn lock      │
//! │     │                                                        │
//! │  events           store changes -> RunEvent broadcast         │
//! │                                                              │
//! │  algorithms       pure traces, replayed by the session        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Embedding
//!
//! ```
//! use algoviz::{AlgorithmStatus, PlaybackConfig, RunOutcome, Session};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let session = Session::new(PlaybackConfig {
//!         unit_delay: Duration::from_millis(1),
//!         ..PlaybackConfig::default()
//!     });
//!     let run = session
//!         .start_run("factorialCalculator", Some(serde_json::json!({ "n": 3 })))
//!         .unwrap();
//!
//!     assert_eq!(run.finished().await, RunOutcome::Completed);
//!
//!     let state = session.snapshot();
//!     assert_eq!(state.status, AlgorithmStatus::Idle);
//!     assert_eq!(state.console_log.last().unwrap(), "3! = 6");
//! }
//! ```

pub mod algorithms;

pub mod api;

pub mod controller;

pub mod error;

pub mod events;

pub mod server;

pub mod session;

pub mod store;

pub use algorithms::{Algorithm, AlgorithmInfo, Category, Registry, Step, Trace};
pub use api::{ApiState, ClientCommand};
pub use controller::{PlaybackConfig, RunContext, RunController};
pub use error::{Error, Result};
pub use events::{EventBroadcaster, RunEvent};
pub use server::{VizConfig, VizServer};
pub use session::{RunHandle, RunOutcome, Session};
pub use store::{AlgorithmStatus, LineRange, Observable, RunId, RunSnapshot, RunStore, Subscription};

/// The crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
