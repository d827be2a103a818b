//! Booking server implementation
//!
//! This module wires the booking service, the HTTP router and the
//! background expiry sweep together.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::booking::{BookingService, ExpirySweeper};
use crate::config::Config;
use crate::storage::{BookingStore, SqliteBookingRepository};

use super::routes::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Booking service
    pub service: Arc<BookingService>,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: Config,
}

// ============================================================================
// Booking Server
// ============================================================================

/// Main booking server
pub struct BookingServer {
    config: Config,
    state: AppState,
}

impl BookingServer {
    /// Create a server backed by the configured SQLite database
    pub fn new(config: Config) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let store = SqliteBookingRepository::new(&config.database.sqlite_path)
            .map_err(|e| ServerError::InitError(e.to_string()))?;

        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Create a server over an existing store
    pub fn with_store(config: Config, store: Arc<dyn BookingStore>) -> Self {
        let service = Arc::new(BookingService::new(store, &config));
        Self::with_service(config, service)
    }

    /// Create a server over an existing booking service
    pub fn with_service(config: Config, service: Arc<BookingService>) -> Self {
        let state = AppState {
            service,
            start_time: Instant::now(),
            config: config.clone(),
        };
        Self { config, state }
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        // Add CORS layer if enabled
        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        // Add tracing layer if enabled
        if self.config.server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Start the server
    pub async fn start(&self) -> Result<(), ServerError> {
        self.start_with_shutdown(std::future::pending()).await
    }

    /// Start with graceful shutdown
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = self.config.server.bind_address;

        tracing::info!("Starting booking server on {}", addr);

        // Start background tasks
        let sweeper = self.start_background_tasks();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()));

        sweeper.abort();
        served?;

        tracing::info!("Booking server shutdown complete");
        Ok(())
    }

    /// Start background tasks
    fn start_background_tasks(&self) -> tokio::task::JoinHandle<()> {
        let interval = self.config.reservations.sweep_interval();
        let handle = ExpirySweeper::new(self.state.service.clone(), interval).spawn();

        tracing::info!(
            interval_secs = interval.as_secs(),
            "Background expiry sweep started"
        );
        handle
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.server.bind_address,
            sqlite_path: self.config.database.sqlite_path.display().to_string(),
            step_minutes: self.config.calendar.step_minutes,
            buffer_minutes: self.config.calendar.buffer_minutes,
            pending_ttl_hours: self.config.reservations.pending_ttl_hours,
            cors_enabled: self.config.server.enable_cors,
            request_logging_enabled: self.config.server.enable_request_logging,
            metrics_enabled: self.config.server.enable_metrics,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub sqlite_path: String,
    pub step_minutes: u32,
    pub buffer_minutes: u32,
    pub pending_ttl_hours: u64,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
    pub metrics_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Booking Server\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Database: {}\n\
             Slot Step: {} min\n\
             Buffer: {} min\n\
             Pending TTL: {}h\n\
             CORS: {}\n\
             Request Logging: {}\n\
             Metrics: {}",
            "",
            self.bind_address,
            self.sqlite_path,
            self.step_minutes,
            self.buffer_minutes,
            self.pending_ttl_hours,
            enabled(self.cors_enabled),
            enabled(self.request_logging_enabled),
            enabled(self.metrics_enabled),
        )
    }
}

fn enabled(flag: bool) -> &'static str {
    if flag {
        "enabled"
    } else {
        "disabled"
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Initialization error
    InitError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::InitError(msg) => write!(f, "Initialization error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================
