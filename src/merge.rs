//! Per-entity upsert with last-write-wins on `updated_at` (spec.md §4.3).
//!
//! A pure function of the caller context, the current stored row (fetched
//! by `reconcile`), and the pushed payload: no cross-entity side effects,
//! no cascading updates (spec.md §9 "Merge engine as a pure function").

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::domain::{CallerContext, CheckInChange, JournalEntryChange, MoodLogChange, Role};
use crate::reconcile::{self, Reconciliation};
use crate::store::{StoreError, StoreTx};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Updated,
    /// The stored row was newer than (or equal to) the payload; the
    /// payload was silently discarded (spec.md §4.3 step 4), or the
    /// change targeted a row this caller does not own.
    Skipped,
}

#[derive(Debug, Error)]
pub enum MergeError {
    /// A new record was pushed without `clientCreatedAt` (spec.md §4.3
    /// step 3: "if the payload lacks `client_created_at`, reject as a
    /// validation failure").
    #[error("clientCreatedAt is required for a new record")]
    MissingClientCreatedAt,
    /// A live (non-tombstone) mood log is pushed as a brand new row with
    /// no `mood`. Only a tombstone may skip it — a live row needs a value
    /// to actually show the crew member (domain::validate only checks
    /// shape, not whether this particular push is the row's first).
    #[error("mood is required when inserting a non-deleted mood log")]
    MissingMood,
    /// Mirrors `MissingMood` for journal entries.
    #[error("content is required when inserting a non-deleted journal entry")]
    MissingContent,
    /// Mirrors `MissingMood` for check-ins.
    #[error("scheduledFor is required when inserting a non-deleted check-in")]
    MissingScheduledFor,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// `client_updated_at := updated_at if present else client_created_at`
/// (spec.md §4.3 step 4), falling back to the existing row's own
/// `updated_at` only when the payload supplies neither.
fn effective_client_updated_at(
    updated_at: Option<DateTime<Utc>>,
    client_created_at: Option<DateTime<Utc>>,
    existing_updated_at: DateTime<Utc>,
) -> DateTime<Utc> {
    updated_at.or(client_created_at).unwrap_or(existing_updated_at)
}

pub async fn merge_mood_log<S: StoreTx>(
    store: &mut S,
    ctx: CallerContext,
    change: &MoodLogChange,
) -> Result<MergeOutcome, MergeError> {
    match reconcile::reconcile_mood_log(store, ctx.tenant_id, change.id).await? {
        Reconciliation::Insert => {
            if change.client_created_at.is_none() {
                return Err(MergeError::MissingClientCreatedAt);
            }
            if !change.is_deleted && change.mood.is_none() {
                return Err(MergeError::MissingMood);
            }
            store.insert_mood_log(ctx.tenant_id, ctx.user_id, change).await?;
            Ok(MergeOutcome::Inserted)
        }
        Reconciliation::Update(existing) => {
            // Mood logs are strictly user-scoped regardless of role
            // (spec.md §4.1).
            if existing.envelope.user_id != ctx.user_id {
                return Ok(MergeOutcome::Skipped);
            }
            let client_updated_at = effective_client_updated_at(
                change.updated_at,
                change.client_created_at,
                existing.envelope.updated_at,
            );
            let applied = store
                .update_mood_log_if_newer(ctx.tenant_id, change.id, change, client_updated_at)
                .await?;
            Ok(if applied { MergeOutcome::Updated } else { MergeOutcome::Skipped })
        }
    }
}

pub async fn merge_journal_entry<S: StoreTx>(
    store: &mut S,
    ctx: CallerContext,
    change: &JournalEntryChange,
) -> Result<MergeOutcome, MergeError> {
    match reconcile::reconcile_journal_entry(store, ctx.tenant_id, change.id).await? {
        Reconciliation::Insert => {
            if change.client_created_at.is_none() {
                return Err(MergeError::MissingClientCreatedAt);
            }
            if !change.is_deleted && change.content.is_none() {
                return Err(MergeError::MissingContent);
            }
            store
                .insert_journal_entry(ctx.tenant_id, ctx.user_id, change)
                .await?;
            Ok(MergeOutcome::Inserted)
        }
        Reconciliation::Update(existing) => {
            if existing.envelope.user_id != ctx.user_id {
                return Ok(MergeOutcome::Skipped);
            }
            let client_updated_at = effective_client_updated_at(
                change.updated_at,
                change.client_created_at,
                existing.envelope.updated_at,
            );
            let applied = store
                .update_journal_entry_if_newer(ctx.tenant_id, change.id, change, client_updated_at)
                .await?;
            Ok(if applied { MergeOutcome::Updated } else { MergeOutcome::Skipped })
        }
    }
}

/// Check-ins are the one entity where role changes write authorization:
/// crew may only touch their own row, but admin/psychologist may push an
/// update to any row in the tenant (this is how review fields reach a
/// crew member's check-in). Review fields themselves are gated
/// separately by [`Role::can_review_check_ins`], independent of who owns
/// the row.
pub async fn merge_check_in<S: StoreTx>(
    store: &mut S,
    ctx: CallerContext,
    change: &CheckInChange,
) -> Result<MergeOutcome, MergeError> {
    let allow_review_fields = ctx.role.can_review_check_ins();
    match reconcile::reconcile_check_in(store, ctx.tenant_id, change.id).await? {
        Reconciliation::Insert => {
            if change.client_created_at.is_none() {
                return Err(MergeError::MissingClientCreatedAt);
            }
            if !change.is_deleted && change.scheduled_for.is_none() {
                return Err(MergeError::MissingScheduledFor);
            }
            store
                .insert_check_in(ctx.tenant_id, ctx.user_id, change, allow_review_fields)
                .await?;
            Ok(MergeOutcome::Inserted)
        }
        Reconciliation::Update(existing) => {
            if ctx.role == Role::Crew && existing.envelope.user_id != ctx.user_id {
                return Ok(MergeOutcome::Skipped);
            }
            let client_updated_at = effective_client_updated_at(
                change.updated_at,
                change.client_created_at,
                existing.envelope.updated_at,
            );
            let applied = store
                .update_check_in_if_newer(
                    ctx.tenant_id,
                    change.id,
                    change,
                    client_updated_at,
                    allow_review_fields,
                )
                .await?;
            Ok(if applied { MergeOutcome::Updated } else { MergeOutcome::Skipped })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Mood;
    use crate::store::{FakeStore, Store};
    use chrono::Duration;
    use uuid::Uuid;

    fn ctx(tenant: Uuid, user: Uuid, role: Role) -> CallerContext {
        CallerContext { tenant_id: tenant, user_id: user, role }
    }

    fn mood_change(id: Uuid, client_created_at: Option<DateTime<Utc>>) -> MoodLogChange {
        MoodLogChange {
            id,
            client_created_at,
            updated_at: None,
            is_deleted: false,
            mood: Some(Mood::Good),
            intensity: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn first_push_inserts_with_server_timestamps() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        let change = mood_change(id, Some(Utc::now()));

        let mut tx = store.begin_tx().await.unwrap();
        let outcome = merge_mood_log(&mut tx, ctx(tenant, user, Role::Crew), &change)
            .await
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Inserted);
        tx.commit().await.unwrap();

        let row = store.find_mood_log(tenant, id).await.unwrap().unwrap();
        assert_eq!(row.envelope.user_id, user);
        assert_eq!(row.envelope.tenant_id, tenant);
        assert_eq!(row.envelope.created_at, row.envelope.updated_at);
    }

    #[tokio::test]
    async fn insert_without_client_created_at_is_rejected() {
        let store = FakeStore::new();
        let change = mood_change(Uuid::new_v4(), None);
        let mut tx = store.begin_tx().await.unwrap();
        let err = merge_mood_log(&mut tx, ctx(Uuid::new_v4(), Uuid::new_v4(), Role::Crew), &change)
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::MissingClientCreatedAt));
    }

    #[tokio::test]
    async fn insert_of_live_mood_log_without_mood_is_rejected() {
        let store = FakeStore::new();
        let mut change = mood_change(Uuid::new_v4(), Some(Utc::now()));
        change.mood = None;
        let mut tx = store.begin_tx().await.unwrap();
        let err = merge_mood_log(&mut tx, ctx(Uuid::new_v4(), Uuid::new_v4(), Role::Crew), &change)
            .await
            .unwrap_err();
        assert!(matches!(err, MergeError::MissingMood));
    }

    #[tokio::test]
    async fn tombstone_as_first_push_inserts_without_mood() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        let mut change = mood_change(id, Some(Utc::now()));
        change.mood = None;
        change.is_deleted = true;

        let mut tx = store.begin_tx().await.unwrap();
        let outcome = merge_mood_log(&mut tx, ctx(tenant, user, Role::Crew), &change)
            .await
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Inserted);
        tx.commit().await.unwrap();

        let row = store.find_mood_log(tenant, id).await.unwrap().unwrap();
        assert!(row.mood.is_none());
        assert!(row.envelope.is_deleted);
    }

    #[tokio::test]
    async fn stale_update_is_skipped_and_leaves_row_unchanged() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        let insert = mood_change(id, Some(Utc::now() - Duration::hours(2)));
        {
            let mut tx = store.begin_tx().await.unwrap();
            merge_mood_log(&mut tx, ctx(tenant, user, Role::Crew), &insert).await.unwrap();
            tx.commit().await.unwrap();
        }
        let after_insert = store.find_mood_log(tenant, id).await.unwrap().unwrap();

        let mut stale_update = mood_change(id, Some(Utc::now() - Duration::hours(2)));
        stale_update.updated_at = Some(after_insert.envelope.updated_at - Duration::hours(1));
        stale_update.mood = Some(Mood::Bad);
        let mut tx = store.begin_tx().await.unwrap();
        let outcome = merge_mood_log(&mut tx, ctx(tenant, user, Role::Crew), &stale_update)
            .await
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Skipped);
        tx.commit().await.unwrap();

        let row = store.find_mood_log(tenant, id).await.unwrap().unwrap();
        assert_eq!(row.mood, Some(Mood::Good));
    }

    #[tokio::test]
    async fn repeated_identical_push_is_idempotent() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        let mut change = mood_change(id, Some(Utc::now()));
        change.intensity = Some(5);

        {
            let mut tx = store.begin_tx().await.unwrap();
            merge_mood_log(&mut tx, ctx(tenant, user, Role::Crew), &change).await.unwrap();
            tx.commit().await.unwrap();
        }
        let after_first = store.find_mood_log(tenant, id).await.unwrap().unwrap();

        // Replaying the exact same push (e.g. after a dropped response).
        let mut tx = store.begin_tx().await.unwrap();
        let outcome = merge_mood_log(&mut tx, ctx(tenant, user, Role::Crew), &change)
            .await
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Skipped);
        tx.commit().await.unwrap();
        let after_replay = store.find_mood_log(tenant, id).await.unwrap().unwrap();
        assert_eq!(after_first.mood, after_replay.mood);
        assert_eq!(after_first.intensity, after_replay.intensity);
    }

    #[tokio::test]
    async fn cross_user_push_is_dropped_not_erroring() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let owner = Uuid::new_v4();
        let intruder = Uuid::new_v4();
        let id = Uuid::new_v4();
        let insert = mood_change(id, Some(Utc::now()));
        {
            let mut tx = store.begin_tx().await.unwrap();
            merge_mood_log(&mut tx, ctx(tenant, owner, Role::Crew), &insert).await.unwrap();
            tx.commit().await.unwrap();
        }

        let mut hostile_update = mood_change(id, Some(Utc::now()));
        hostile_update.updated_at = Some(Utc::now() + Duration::days(365));
        hostile_update.mood = Some(Mood::Terrible);
        let mut tx = store.begin_tx().await.unwrap();
        let outcome = merge_mood_log(&mut tx, ctx(tenant, intruder, Role::Crew), &hostile_update)
            .await
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Skipped);
        tx.commit().await.unwrap();

        let row = store.find_mood_log(tenant, id).await.unwrap().unwrap();
        assert_eq!(row.mood, Some(Mood::Good));
        assert_eq!(row.envelope.user_id, owner);
    }

    fn check_in_change(id: Uuid, client_created_at: Option<DateTime<Utc>>) -> CheckInChange {
        CheckInChange {
            id,
            client_created_at,
            updated_at: None,
            is_deleted: false,
            scheduled_for: Some(Utc::now()),
            completed_at: None,
            mood: Some(Mood::Okay),
            responses: None,
            needs_attention: None,
            reviewed_by: None,
            reviewed_at: None,
            review_notes: None,
        }
    }

    #[tokio::test]
    async fn non_psychologist_cannot_set_review_fields() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let id = Uuid::new_v4();
        let mut change = check_in_change(id, Some(Utc::now()));
        change.needs_attention = Some(true);
        change.reviewed_by = Some(Uuid::new_v4());
        change.reviewed_at = Some(Utc::now());
        change.review_notes = Some("should not persist".into());

        let mut tx = store.begin_tx().await.unwrap();
        merge_check_in(&mut tx, ctx(tenant, user, Role::Crew), &change).await.unwrap();
        tx.commit().await.unwrap();

        let row = store.find_check_in(tenant, id).await.unwrap().unwrap();
        assert!(!row.needs_attention);
        assert!(row.reviewed_by.is_none());
        assert!(row.review_notes.is_none());
    }

    #[tokio::test]
    async fn psychologist_can_review_another_users_check_in() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let crew_user = Uuid::new_v4();
        let psych = Uuid::new_v4();
        let id = Uuid::new_v4();

        let insert = check_in_change(id, Some(Utc::now() - Duration::hours(1)));
        {
            let mut tx = store.begin_tx().await.unwrap();
            merge_check_in(&mut tx, ctx(tenant, crew_user, Role::Crew), &insert)
                .await
                .unwrap();
            tx.commit().await.unwrap();
        }

        let mut review = check_in_change(id, Some(Utc::now() - Duration::hours(1)));
        review.scheduled_for = None;
        review.mood = None;
        review.updated_at = Some(Utc::now());
        review.needs_attention = Some(true);
        review.reviewed_by = Some(psych);
        review.reviewed_at = Some(Utc::now());
        review.review_notes = Some("follow up next week".into());

        let mut tx = store.begin_tx().await.unwrap();
        let outcome = merge_check_in(&mut tx, ctx(tenant, psych, Role::Psychologist), &review)
            .await
            .unwrap();
        assert_eq!(outcome, MergeOutcome::Updated);
        tx.commit().await.unwrap();

        let row = store.find_check_in(tenant, id).await.unwrap().unwrap();
        assert!(row.needs_attention);
        assert_eq!(row.reviewed_by, Some(psych));
        assert_eq!(row.envelope.user_id, crew_user);
    }
}
