//! `GET /api/sync/status` (spec.md §6).

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::domain::SyncCursor;
use crate::error::AppError;
use crate::store::Store;

use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub device_id: Uuid,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub success: bool,
    pub cursors: Vec<SyncCursor>,
}

pub async fn status(
    State(state): State<AppState>,
    AuthContext(ctx): AuthContext,
    Query(query): Query<StatusQuery>,
) -> Result<Json<StatusResponse>, AppError> {
    let cursors = state
        .store
        .get_cursors(ctx.tenant_id, ctx.user_id, query.device_id)
        .await?;
    Ok(Json(StatusResponse { success: true, cursors }))
}
