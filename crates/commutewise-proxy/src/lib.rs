//! Commutewise travel time proxy
//!
//! Fronts the travel time provider with a per-client [`RequestGovernor`] so
//! the provider credential never leaves the server and request volume stays
//! within budget.
//!
//! ```text
//!  client ──POST /api/directions──▶ governor ──▶ validate ──▶ provider
//!                                     │ 429          │ 400        │ 400 / 500
//! ```

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use commutewise_core::{RequestGovernor, TravelTimeProvider};

pub use error::ApiError;

/// Shared proxy state.
pub struct AppState {
    pub governor: RequestGovernor,
    /// `None` when the provider credential was not configured.
    pub provider: Option<Arc<dyn TravelTimeProvider>>,
}

impl AppState {
    pub fn new(governor: RequestGovernor, provider: Option<Arc<dyn TravelTimeProvider>>) -> Self {
        Self { governor, provider }
    }
}

/// Build the proxy router
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(routes::health::health_check))
        .route(
            "/api/directions",
            post(routes::directions::directions).fallback(routes::directions::method_not_allowed),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
