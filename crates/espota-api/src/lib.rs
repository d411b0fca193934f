//! espota-api - HTTP layer for the ESP8266 OTA update server
//!
//! This crate mounts the update endpoint on an axum router and owns the
//! per-day request log. The decision itself lives in `espota-core`.
//!
//! # Usage
//!
//! ```ignore
//! use espota_api::{create_router, AppState};
//! use espota_core::Config;
//!
//! let state = AppState::new(Config::load("espota.toml")?);
//! let router = create_router(state);
//! axum::serve(
//!     listener,
//!     router.into_make_service_with_connect_info::<std::net::SocketAddr>(),
//! )
//! .await?;
//! ```

pub mod error;
pub mod handlers;
pub mod request_log;
pub mod state;

pub use error::ApiError;
pub use request_log::RequestLog;
pub use state::AppState;

use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

/// Create the update API router with the given application state
///
/// The update route answers `GET` (and `HEAD`, which axum derives from the
/// `GET` handler and sends without a body).
pub fn create_router(state: AppState) -> Router {
    let route = state.config().server.route.clone();

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Firmware update endpoint
        .route(&route, get(handlers::update::serve_update))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
