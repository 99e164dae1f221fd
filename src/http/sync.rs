//! `POST /api/sync` (spec.md §6).

use axum::extract::{FromRequest, Request, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::domain::EntityKind;
use crate::error::AppError;
use crate::orchestrator::{self, SyncInput};
use crate::pull::ServerChanges;

use super::AppState;

/// Wraps `axum::Json` so a malformed envelope surfaces as
/// [`AppError::EnvelopeInvalid`] — and thus the `{success: false, error}`
/// body every other rejection in this crate produces — instead of axum's
/// own `JsonRejection` body (spec.md §6, §7 "every rejection is reported
/// in the same envelope shape").
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: serde::de::DeserializeOwned,
    Json<T>: FromRequest<S, Rejection = axum::extract::rejection::JsonRejection>,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::EnvelopeInvalid(rejection.body_text()))?;
        Ok(ValidatedJson(value))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ChangesWire {
    #[serde(default)]
    pub mood_logs: Vec<serde_json::Value>,
    #[serde(default)]
    pub journal_entries: Vec<serde_json::Value>,
    #[serde(default)]
    pub check_ins: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    pub device_id: Uuid,
    pub last_sync_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub changes: ChangesWire,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedWire {
    pub entity: EntityKind,
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponse {
    pub success: bool,
    pub server_changes: ServerChanges,
    /// Always empty: this design never reports a conflict back to the
    /// client, only last-write-wins outcomes (spec.md §6).
    pub conflicts: Vec<serde_json::Value>,
    pub last_sync_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedWire>,
}

pub async fn sync(
    State(state): State<AppState>,
    AuthContext(ctx): AuthContext,
    ValidatedJson(request): ValidatedJson<SyncRequest>,
) -> Result<Json<SyncResponse>, AppError> {
    let input = SyncInput {
        device_id: request.device_id,
        last_sync_at: request.last_sync_at,
        mood_logs: request.changes.mood_logs,
        journal_entries: request.changes.journal_entries,
        check_ins: request.changes.check_ins,
    };

    let output = tokio::time::timeout(state.sync_timeout, orchestrator::run_sync(&state.store, ctx, input))
        .await
        .map_err(|_| AppError::Timeout)??;

    Ok(Json(SyncResponse {
        success: true,
        server_changes: output.server_changes,
        conflicts: Vec::new(),
        last_sync_at: output.last_sync_at,
        rejected: output
            .rejected
            .into_iter()
            .map(|r| RejectedWire { entity: r.entity, index: r.index, error: r.error })
            .collect(),
    }))
}
