//! HTTP surface of the booking engine
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                     Booking Server                       │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │                    REST API                        │  │
//! │  │  GET   /api/profiles/{id}/availability             │  │
//! │  │  GET   /api/profiles/{id}/unavailable-days         │  │
//! │  │  POST  /api/reservations                           │  │
//! │  │  POST  /api/day-reservations                       │  │
//! │  │  GET   /api/reservations/{id}                      │  │
//! │  │  PATCH /api/reservations/{id}/status               │  │
//! │  │  GET   /api/health, /metrics                       │  │
//! │  └────────────────────────────────────────────────────┘  │
//! │                          │                               │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │     BookingService (blocking pool) + sweeper       │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use termin::api::BookingServer;
//! use termin::config::Config;
//!
//! let server = BookingServer::new(Config::from_env()?)?;
//! server.start().await?;
//! ```

pub mod config;
pub mod routes;
pub mod server;

// Re-export main types
pub use config::{ConfigError, ServerConfig, ServerConfigBuilder};
pub use routes::{create_router, ApiError, ApiResponse, ErrorResponse, USER_HEADER};
pub use server::{AppState, BookingServer, ServerError, ServerInfo};
