//! HTTP and WebSocket server for the visualizer.
//!
//! [`VizServer`] serves the browser page and the REST/WebSocket API defined in
//! [`api`](crate::api), with optional CORS and request tracing middleware.
//!
//! # Examples
//!
//! ```rust,ignore
//! use algoviz::{VizConfig, VizServer};
//!
//! #[tokio::main]
//! async fn main() -> algoviz::Result<()> {
//!     let server = VizServer::new(VizConfig::default())?;
//!
//!     let shutdown = async {
//!         tokio::signal::ctrl_c().await.ok();
//!     };
//!     server.start_with_shutdown(shutdown).await
//! }
//! ```

use crate::api::{create_router, ApiState};
use crate::controller::PlaybackConfig;
use crate::error::{Error, Result};
use crate::session::Session;

use axum::Router;
use std::net::SocketAddr;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VizConfig {
    /// The host address to bind to.
    pub host: String,
    /// The port to listen on.
    pub port: u16,
    /// Allow cross-origin requests from any origin.
    pub enable_cors: bool,
    /// Log every HTTP request.
    pub enable_tracing: bool,
    /// Speed range and per-step pacing.
    pub playback: PlaybackConfig,
}

impl Default for VizConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8888,
            enable_cors: true,
            enable_tracing: true,
            playback: PlaybackConfig::default(),
        }
    }
}

impl VizConfig {
    /// Listens on all interfaces.
    pub fn development() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            ..Self::default()
        }
    }

    /// Localhost only, no CORS, no request tracing.
    pub fn production() -> Self {
        Self {
            enable_cors: false,
            enable_tracing: false,
            ..Self::default()
        }
    }

    /// Parses `host:port`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the host is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid address: {}", e)))
    }

    /// Checks the address and the playback settings.
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;
        self.playback.validate()
    }
}

/// The visualizer server.
pub struct VizServer {
    config: VizConfig,
    state: ApiState,
}

impl VizServer {
    /// Creates a server with a fresh session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `config` does not validate.
    pub fn new(config: VizConfig) -> Result<Self> {
        config.validate()?;
        let state = ApiState::with_session(Session::new(config.playback.clone()));
        Ok(Self { config, state })
    }

    /// Creates a server around an existing state.
    pub fn with_state(config: VizConfig, state: ApiState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &VizConfig {
        &self.config
    }

    pub fn state(&self) -> &ApiState {
        &self.state
    }

    /// The router with the configured middleware applied.
    pub fn router(&self) -> Router {
        let mut app = create_router(self.state.clone());

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any);
            app = app.layer(cors);
        }

        if self.config.enable_tracing {
            app = app.layer(TraceLayer::new_for_http());
        }

        app
    }

    /// Serves until the process is killed.
    pub async fn start(self) -> Result<()> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Serves until `shutdown_signal` completes, then drains connections.
    pub async fn start_with_shutdown<F>(self, shutdown_signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.socket_addr()?;
        let app = self.router();

        log::info!("Starting algoviz server on http://{}", addr);
        log::info!("  - Web UI:    http://{}/", addr);
        log::info!("  - API:       http://{}/api/algorithms", addr);
        log::info!("  - WebSocket: ws://{}/ws/updates", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| Error::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| Error::Server(format!("Server error: {}", e)))?;

        log::info!("Server shutdown complete");
        Ok(())
    }
}
