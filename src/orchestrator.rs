//! Public entry point for a single sync call (spec.md §4.6).
//!
//! ```text
//! RECEIVE → VALIDATE_ENVELOPE → BEGIN_TX →
//!   PUSH_MOODS → PUSH_JOURNALS → PUSH_CHECKINS →
//!   PULL_MOODS → PULL_JOURNALS → PULL_CHECKINS → PULL_RESOURCES →
//!   UPDATE_CURSORS → COMMIT → RESPOND
//! ```
//!
//! Envelope validation (well-formed `deviceId`, `changes` shaped as a
//! mapping of sequences) happens one layer up, in the wire types deserialized
//! by `http::sync` — by the time a [`SyncInput`] reaches this module the
//! envelope is already known-good. Per-change validation happens here, one
//! item at a time, so a single malformed change cannot fail the batch.
//!
//! Everything from the first push through the final cursor advance runs
//! inside one [`crate::store::StoreTx`] (spec.md §4.6, §5 "Transactionality"):
//! a crash or cancelled timeout partway through rolls the whole batch back
//! instead of leaving some pushes applied and cursors unadvanced. A
//! replayed batch is harmless either way (merges are idempotent on `id`),
//! which is the property the spec's own retry story (spec.md §5
//! "Cancellation & timeouts") leans on — the transaction removes the
//! partial-application risk without making retries any less necessary.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{CallerContext, EntityKind};
use crate::error::AppError;
use crate::merge::{self, MergeError};
use crate::pull::{self, ServerChanges};
use crate::cursor;
use crate::store::{Store, StoreError, StoreTx};

/// Already-envelope-validated input to a sync call.
#[derive(Debug, Clone, Default)]
pub struct SyncInput {
    pub device_id: Uuid,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub mood_logs: Vec<serde_json::Value>,
    pub journal_entries: Vec<serde_json::Value>,
    pub check_ins: Vec<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct RejectedChange {
    pub entity: EntityKind,
    /// Index of the offending item within its `changes.<entity>` array.
    pub index: usize,
    pub error: String,
}

#[derive(Debug, Clone)]
pub struct SyncOutput {
    pub server_changes: ServerChanges,
    pub last_sync_at: DateTime<Utc>,
    pub rejected: Vec<RejectedChange>,
}

pub async fn run_sync<S: Store>(
    store: &S,
    ctx: CallerContext,
    input: SyncInput,
) -> Result<SyncOutput, AppError> {
    tracing::info!(
        tenant_id = %ctx.tenant_id,
        user_id = %ctx.user_id,
        device_id = %input.device_id,
        mood_logs = input.mood_logs.len(),
        journal_entries = input.journal_entries.len(),
        check_ins = input.check_ins.len(),
        "sync call started"
    );

    let since = input.last_sync_at.unwrap_or_else(pull::epoch);
    let mut rejected = Vec::new();

    let mut tx = store.begin_tx().await?;

    push_mood_logs(&mut tx, ctx, &input.mood_logs, &mut rejected).await?;
    push_journal_entries(&mut tx, ctx, &input.journal_entries, &mut rejected).await?;
    push_check_ins(&mut tx, ctx, &input.check_ins, &mut rejected).await?;

    let server_changes = pull::plan_pull(&mut tx, ctx, since, since, since, since).await?;

    let server_now = Utc::now();
    cursor::advance_cursors(&mut tx, ctx.tenant_id, ctx.user_id, input.device_id, server_now)
        .await?;

    tx.commit().await?;

    tracing::info!(
        tenant_id = %ctx.tenant_id,
        user_id = %ctx.user_id,
        device_id = %input.device_id,
        rejected = rejected.len(),
        "sync call committed"
    );

    Ok(SyncOutput { server_changes, last_sync_at: server_now, rejected })
}

async fn push_mood_logs<S: StoreTx>(
    store: &mut S,
    ctx: CallerContext,
    raw_changes: &[serde_json::Value],
    rejected: &mut Vec<RejectedChange>,
) -> Result<(), StoreError> {
    for (index, raw) in raw_changes.iter().enumerate() {
        let change = match crate::domain::validate::parse_mood_log(raw) {
            Ok(change) => change,
            Err(err) => {
                rejected.push(RejectedChange { entity: EntityKind::MoodLog, index, error: err.to_string() });
                continue;
            }
        };
        match merge::merge_mood_log(store, ctx, &change).await {
            Ok(_outcome) => {}
            Err(MergeError::Store(err)) => return Err(err),
            Err(err) => rejected.push(RejectedChange { entity: EntityKind::MoodLog, index, error: err.to_string() }),
        }
    }
    Ok(())
}

async fn push_journal_entries<S: StoreTx>(
    store: &mut S,
    ctx: CallerContext,
    raw_changes: &[serde_json::Value],
    rejected: &mut Vec<RejectedChange>,
) -> Result<(), StoreError> {
    for (index, raw) in raw_changes.iter().enumerate() {
        let change = match crate::domain::validate::parse_journal_entry(raw) {
            Ok(change) => change,
            Err(err) => {
                rejected.push(RejectedChange {
                    entity: EntityKind::JournalEntry,
                    index,
                    error: err.to_string(),
                });
                continue;
            }
        };
        match merge::merge_journal_entry(store, ctx, &change).await {
            Ok(_outcome) => {}
            Err(MergeError::Store(err)) => return Err(err),
            Err(err) => rejected.push(RejectedChange {
                entity: EntityKind::JournalEntry,
                index,
                error: err.to_string(),
            }),
        }
    }
    Ok(())
}

async fn push_check_ins<S: StoreTx>(
    store: &mut S,
    ctx: CallerContext,
    raw_changes: &[serde_json::Value],
    rejected: &mut Vec<RejectedChange>,
) -> Result<(), StoreError> {
    for (index, raw) in raw_changes.iter().enumerate() {
        let change = match crate::domain::validate::parse_check_in(raw) {
            Ok(change) => change,
            Err(err) => {
                rejected.push(RejectedChange { entity: EntityKind::CheckIn, index, error: err.to_string() });
                continue;
            }
        };
        match merge::merge_check_in(store, ctx, &change).await {
            Ok(_outcome) => {}
            Err(MergeError::Store(err)) => return Err(err),
            Err(err) => rejected.push(RejectedChange { entity: EntityKind::CheckIn, index, error: err.to_string() }),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::store::FakeStore;
    use serde_json::json;

    fn ctx(tenant: Uuid, user: Uuid) -> CallerContext {
        CallerContext { tenant_id: tenant, user_id: user, role: Role::Crew }
    }

    #[tokio::test]
    async fn bootstrap_pull_returns_empty_changes_and_writes_cursors() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let device = Uuid::new_v4();

        let input = SyncInput { device_id: device, ..Default::default() };
        let output = run_sync(&store, ctx(tenant, user), input).await.unwrap();

        assert!(output.server_changes.mood_logs.is_empty());
        assert!(output.server_changes.journal_entries.is_empty());
        assert!(output.server_changes.check_ins.is_empty());
        assert!(output.server_changes.resources.is_empty());
        assert!(output.rejected.is_empty());

        let cursors = store.get_cursors(tenant, user, device).await.unwrap();
        assert_eq!(cursors.len(), crate::domain::CursorEntity::ALL.len());
    }

    #[tokio::test]
    async fn first_push_is_visible_in_the_same_calls_pull() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();

        let input = SyncInput {
            device_id: Uuid::new_v4(),
            mood_logs: vec![json!({
                "id": id,
                "clientCreatedAt": "2024-01-01T10:00:00Z",
                "mood": "good",
            })],
            ..Default::default()
        };
        let output = run_sync(&store, ctx(tenant, user), input).await.unwrap();

        assert_eq!(output.server_changes.mood_logs.len(), 1);
        assert_eq!(output.server_changes.mood_logs[0].envelope.id, id);
        assert_eq!(output.server_changes.mood_logs[0].envelope.user_id, user);
        assert!(output.rejected.is_empty());
    }

    #[tokio::test]
    async fn malformed_change_is_rejected_without_failing_the_batch() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let good_id = Uuid::new_v4();

        let input = SyncInput {
            device_id: Uuid::new_v4(),
            mood_logs: vec![
                json!({ "id": good_id, "clientCreatedAt": "2024-01-01T10:00:00Z", "mood": "good" }),
                json!({ "id": Uuid::new_v4(), "clientCreatedAt": "2024-01-01T10:00:00Z", "mood": "ecstatic" }),
            ],
            ..Default::default()
        };
        let output = run_sync(&store, ctx(tenant, user), input).await.unwrap();

        assert_eq!(output.server_changes.mood_logs.len(), 1);
        assert_eq!(output.rejected.len(), 1);
        assert_eq!(output.rejected[0].entity, EntityKind::MoodLog);
        assert_eq!(output.rejected[0].index, 1);
    }

    #[tokio::test]
    async fn insert_only_push_missing_required_field_is_rejected_not_fatal() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();

        let input = SyncInput {
            device_id: Uuid::new_v4(),
            mood_logs: vec![json!({
                "id": Uuid::new_v4(),
                "clientCreatedAt": "2024-01-01T10:00:00Z",
            })],
            ..Default::default()
        };
        let output = run_sync(&store, ctx(tenant, user), input).await.unwrap();

        assert!(output.server_changes.mood_logs.is_empty());
        assert_eq!(output.rejected.len(), 1);
        assert_eq!(output.rejected[0].entity, EntityKind::MoodLog);
    }

    #[tokio::test]
    async fn empty_lastsyncat_equal_to_latest_update_yields_empty_delta() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();

        let first = SyncInput {
            device_id: Uuid::new_v4(),
            mood_logs: vec![json!({
                "id": Uuid::new_v4(),
                "clientCreatedAt": "2024-01-01T10:00:00Z",
                "mood": "good",
            })],
            ..Default::default()
        };
        let first_output = run_sync(&store, ctx(tenant, user), first).await.unwrap();

        let second = SyncInput {
            device_id: Uuid::new_v4(),
            last_sync_at: Some(first_output.last_sync_at),
            ..Default::default()
        };
        let second_output = run_sync(&store, ctx(tenant, user), second).await.unwrap();
        assert!(second_output.server_changes.mood_logs.is_empty());
    }
}
