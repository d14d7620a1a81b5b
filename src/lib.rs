//! Room-scoped real-time presence and chat broadcast over WebSocket.
//!
//! Authenticated clients join rooms, exchange persisted chat messages, and see who
//! else is online and typing. Presence is held in-process by a single registry;
//! membership and messages live in Postgres.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

pub use config::Config;
pub use error::{AppError, EventError};
pub use handlers::http::AppState;
pub use services::{PresenceRegistry, Realtime};

use axum::routing::{get, post};
use handlers::http;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Build the router (ws, health, online list, logout). Used by main and by integration tests.
pub fn create_app(state: AppState) -> axum::Router {
    let auth_routes = axum::Router::new().route("/logout", post(auth::logout));

    axum::Router::new()
        .route("/ws", get(handlers::ws_handler))
        .route("/health", get(http::health))
        .route("/rooms/:room_id/online", get(http::room_online))
        .nest("/auth", auth_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
