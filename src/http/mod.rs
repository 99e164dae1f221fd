//! Router assembly: wires the sync endpoints, the health check, and the
//! cross-cutting middleware (body-size cap, request tracing) onto the
//! `Store` backend and JWT key, grounded in
//! `spacedriveapp-spacedrive/apps/server/src/main.rs`'s router construction.

mod status;
mod sync;

use std::time::Duration;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::routing::{get, post};
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::auth::JwtKey;
use crate::config::Config;
use crate::store::PgStore;

#[derive(Clone)]
pub struct AppState {
    pub store: PgStore,
    pub jwt_key: JwtKey,
    pub sync_timeout: Duration,
}

impl FromRef<AppState> for JwtKey {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_key.clone()
    }
}

pub fn router(store: PgStore, config: &Config) -> Router {
    let state = AppState {
        store,
        jwt_key: JwtKey(config.jwt_secret.clone().into()),
        sync_timeout: Duration::from_secs(config.sync_timeout_secs),
    };

    Router::new()
        .route("/api/sync", post(sync::sync))
        .route("/api/sync/status", get(status::status))
        .route("/healthz", get(healthz))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(config.max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}
