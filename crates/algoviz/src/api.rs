//! REST and WebSocket API endpoints for the visualizer.
//!
//! # API Endpoints
//!
//! ## REST Endpoints
//!
//! - `GET /api/algorithms` - List the gallery
//! - `GET /api/algorithms/{id}` - One algorithm with its pseudo-code
//! - `GET /api/state` - Snapshot of the run state
//! - `POST /api/select` - Select an algorithm without running it
//! - `POST /api/run` - Start a run, superseding any run in progress
//! - `POST /api/pause`, `POST /api/resume` - Pause or resume the live run
//! - `POST /api/stop` - Cancel the live run
//! - `PUT /api/speed` - Set playback speed
//! - `POST /api/panel` - Open or close the visualizer panel
//! - `GET /api/stats` - Run and WebSocket statistics
//!
//! ## WebSocket Endpoint
//!
//! - `WS /ws/updates` - Snapshot on connect, then a stream of [`RunEvent`]s.
//!   Clients may send [`ClientCommand`] JSON or the plain text `ping`.
//!
//! ## Static Assets
//!
//! - `GET /` - Main HTML interface

use crate::algorithms::AlgorithmInfo;
use crate::error::{Error, Result};
use crate::events::{EventBroadcaster, RunEvent};
use crate::session::{RunHandle, Session};
use crate::store::{RunSnapshot, Subscription};

use axum::extract::ws::{Message, WebSocket};
use axum::http::StatusCode;
use axum::{
    extract::{Path, State, WebSocketUpgrade},
    response::{Html, IntoResponse, Json},
    routing::{get, post, put},
    Router,
};
use futures::{sink::Sink, sink::SinkExt, stream::StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;

/// A type alias for API handler results.
type ApiResult<T> = std::result::Result<T, (StatusCode, String)>;

/// Maps a crate error onto an HTTP status.
fn api_error(e: Error) -> (StatusCode, String) {
    let status = match e {
        Error::UnknownAlgorithm(_) => StatusCode::NOT_FOUND,
        Error::InvalidInput(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

/// Shared state for all handlers.
///
/// Holds the session and the event broadcaster, plus the store observers that
/// feed the broadcaster. The observers live as long as any clone of the state.
#[derive(Clone)]
pub struct ApiState {
    pub session: Session,
    pub broadcaster: EventBroadcaster,
    _bridge: Arc<Vec<Subscription>>,
}

impl ApiState {
    /// Creates a state with a default session.
    pub fn new() -> Self {
        Self::with_session(Session::default())
    }

    /// Creates a state around `session` and starts forwarding its changes.
    pub fn with_session(session: Session) -> Self {
        let broadcaster = EventBroadcaster::new();
        let bridge = broadcaster.attach(session.store());
        Self {
            session,
            broadcaster,
            _bridge: Arc::new(bridge),
        }
    }

    /// Starts a run; see [`Session::start_run`].
    pub fn start_run(&self, algorithm: &str, input: Option<serde_json::Value>) -> Result<RunHandle> {
        self.session.start_run(algorithm, input)
    }

    /// Applies a command received from a WebSocket client.
    pub fn apply(&self, command: ClientCommand) -> Result<()> {
        match command {
            ClientCommand::Run { algorithm, input } => {
                self.start_run(&algorithm, input)?;
            }
            ClientCommand::Select { algorithm } => self.session.select(&algorithm)?,
            ClientCommand::Pause => {
                self.session.pause();
            }
            ClientCommand::Resume => {
                self.session.resume();
            }
            ClientCommand::Stop => self.session.stop(),
            ClientCommand::Speed { speed } => {
                self.session.set_speed(speed);
            }
            ClientCommand::Panel { open } => self.session.set_open(open),
        }
        Ok(())
    }
}

impl Default for ApiState {
    fn default() -> Self {
        Self::new()
    }
}

/// Commands a WebSocket client may send, tagged by `command`.
///
/// ```json
/// { "command": "run", "algorithm": "quickSort", "input": { "values": [3, 1, 2] } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ClientCommand {
    Run {
        algorithm: String,
        #[serde(default)]
        input: Option<serde_json::Value>,
    },
    Select {
        algorithm: String,
    },
    Pause,
    Resume,
    Stop,
    Speed {
        speed: u32,
    },
    Panel {
        open: bool,
    },
}

#[derive(Debug, Deserialize)]
pub struct RunRequest {
    pub algorithm: String,
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub algorithm: String,
}

#[derive(Debug, Deserialize)]
pub struct SpeedRequest {
    pub speed: u32,
}

#[derive(Debug, Deserialize)]
pub struct PanelRequest {
    pub open: bool,
}

/// Gallery entry plus its pseudo-code.
#[derive(Debug, Serialize)]
pub struct AlgorithmDetail {
    #[serde(flatten)]
    pub info: AlgorithmInfo,
    pub source: &'static str,
}

/// Creates the main application router.
pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/api/algorithms", get(list_algorithms))
        .route("/api/algorithms/{id}", get(get_algorithm))
        .route("/api/state", get(get_state))
        .route("/api/select", post(select_algorithm))
        .route("/api/run", post(start_run))
        .route("/api/pause", post(pause_run))
        .route("/api/resume", post(resume_run))
        .route("/api/stop", post(stop_run))
        .route("/api/speed", put(set_speed))
        .route("/api/panel", post(set_panel))
        .route("/api/stats", get(get_stats))
        // WebSocket
        .route("/ws/updates", get(ws_handler))
        .route("/", get(serve_index))
        .with_state(state)
}

async fn list_algorithms(State(state): State<ApiState>) -> Json<Vec<AlgorithmInfo>> {
    Json(state.session.registry().list())
}

async fn get_algorithm(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AlgorithmDetail>> {
    let registry = state.session.registry();
    let info = registry
        .info(&id)
        .cloned()
        .ok_or((StatusCode::NOT_FOUND, format!("Algorithm {} not found", id)))?;
    let algorithm = registry.build(&id, None).map_err(api_error)?;
    Ok(Json(AlgorithmDetail {
        info,
        source: algorithm.source(),
    }))
}

async fn get_state(State(state): State<ApiState>) -> Json<RunSnapshot> {
    Json(state.session.snapshot())
}

async fn select_algorithm(
    State(state): State<ApiState>,
    Json(req): Json<SelectRequest>,
) -> ApiResult<Json<RunSnapshot>> {
    state.session.select(&req.algorithm).map_err(api_error)?;
    Ok(Json(state.session.snapshot()))
}

async fn start_run(
    State(state): State<ApiState>,
    Json(req): Json<RunRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let handle = state
        .start_run(&req.algorithm, req.input)
        .map_err(api_error)?;
    Ok(Json(serde_json::json!({ "run_id": handle.run_id() })))
}

async fn pause_run(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "changed": state.session.pause() }))
}

async fn resume_run(State(state): State<ApiState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "changed": state.session.resume() }))
}

async fn stop_run(State(state): State<ApiState>) -> Json<RunSnapshot> {
    state.session.stop();
    Json(state.session.snapshot())
}

async fn set_speed(
    State(state): State<ApiState>,
    Json(req): Json<SpeedRequest>,
) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "speed": state.session.set_speed(req.speed) }))
}

async fn set_panel(
    State(state): State<ApiState>,
    Json(req): Json<PanelRequest>,
) -> Json<RunSnapshot> {
    state.session.set_open(req.open);
    Json(state.session.snapshot())
}

async fn get_stats(State(state): State<ApiState>) -> Json<serde_json::Value> {
    let run = state.session.snapshot();
    Json(serde_json::json!({
        "run": {
            "run_id": run.run_id,
            "status": run.status,
            "current_step": run.current_step,
            "total_steps": run.total_steps,
        },
        "algorithms": state.session.registry().len(),
        "websocket": {
            "connected_clients": state.broadcaster.client_count(),
            "total_events": state.broadcaster.event_count(),
        }
    }))
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state))
}

async fn handle_websocket(socket: WebSocket, state: ApiState) {
    let client_id = uuid::Uuid::new_v4().to_string();
    log::info!("WebSocket client connected: {}", client_id);

    state.broadcaster.register_client(client_id.clone());

    let (mut sender, mut receiver) = socket.split();

    // Subscribe before the snapshot so nothing falls in between.
    let mut event_rx = state.broadcaster.subscribe();

    let initial = RunEvent::snapshot(state.session.snapshot()).to_json();
    if let Err(e) = push(&mut sender, initial).await {
        log::error!("Failed to send initial state to {}: {}", client_id, e);
        state.broadcaster.unregister_client(&client_id);
        return;
    }

    // Forward broadcast events to this client.
    let broadcaster = state.broadcaster.clone();
    let session = state.session.clone();
    let client_id_clone = client_id.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let json = match event_rx.recv().await {
                Ok(event) => event.to_json(),
                Err(RecvError::Lagged(missed)) => {
                    log::warn!("Client {} lagged by {} events, resyncing", client_id_clone, missed);
                    RunEvent::snapshot(session.snapshot()).to_json()
                }
                Err(RecvError::Closed) => break,
            };
            if let Err(e) = push(&mut sender, json).await {
                log::debug!("Stopped forwarding to {}: {}", client_id_clone, e);
                break;
            }
        }
        broadcaster.unregister_client(&client_id_clone);
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                log::debug!("Received from {}: {}", client_id, text.as_str());
                if text.as_str() == "ping" {
                    state.broadcaster.broadcast(RunEvent::ping());
                    continue;
                }
                let applied = serde_json::from_str::<ClientCommand>(text.as_str())
                    .map_err(Error::from)
                    .and_then(|command| state.apply(command));
                if let Err(e) = applied {
                    log::debug!("Rejected command from {}: {}", client_id, e);
                    state
                        .broadcaster
                        .broadcast(RunEvent::error(format!("{}: {}", client_id, e)));
                }
            }
            Ok(Message::Close(_)) => {
                log::info!("WebSocket client {} closed gracefully", client_id);
                break;
            }
            Err(e) => {
                log::error!("Client {}: {}", client_id, Error::WebSocket(e.to_string()));
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    state.broadcaster.unregister_client(&client_id);
    log::info!("WebSocket client disconnected: {}", client_id);
}

/// Sends one JSON text frame.
async fn push<S>(sender: &mut S, json: String) -> Result<()>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    sender
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| Error::WebSocket(e.to_string()))
}

async fn serve_index() -> Html<&'static str> {
    Html(include_str!("../web/index.html"))
}
