//! Assembles the set of server-side changes a device has not yet seen
//! (spec.md §4.4).
//!
//! Each entity is planned independently against its own cursor; there is
//! no cross-entity pagination or ordering guarantee beyond "ascending by
//! `updated_at` within an entity" (spec.md §9 "Pull is not a single total
//! order").

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::{CallerContext, CheckInRow, JournalEntryRow, MoodLogRow, Resource, Role};
use crate::store::{CheckInScope, StoreError, StoreTx};

/// Everything a device needs pulled, one vector per entity. Mirrors
/// `serverChanges` on the wire (spec.md §7).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerChanges {
    pub mood_logs: Vec<MoodLogRow>,
    pub journal_entries: Vec<JournalEntryRow>,
    pub check_ins: Vec<CheckInRow>,
    pub resources: Vec<Resource>,
}

/// `since` defaults to the Unix epoch when a device has no prior cursor
/// for an entity — "pull everything" is just the degenerate case of
/// "pull everything newer than the beginning of time" (spec.md §4.4).
pub fn epoch() -> DateTime<Utc> {
    Utc.timestamp_opt(0, 0).single().expect("epoch is representable")
}

pub async fn plan_pull<S: StoreTx>(
    store: &mut S,
    ctx: CallerContext,
    since_mood_logs: DateTime<Utc>,
    since_journal_entries: DateTime<Utc>,
    since_check_ins: DateTime<Utc>,
    since_resources: DateTime<Utc>,
) -> Result<ServerChanges, StoreError> {
    let mood_logs = store
        .list_mood_logs_updated_since(ctx.tenant_id, ctx.user_id, since_mood_logs)
        .await?;
    let journal_entries = store
        .list_journal_entries_updated_since(ctx.tenant_id, ctx.user_id, since_journal_entries)
        .await?;

    let check_in_scope = if ctx.role.can_read_all_check_ins() {
        CheckInScope::Tenant
    } else {
        CheckInScope::Own(ctx.user_id)
    };
    let check_ins = store
        .list_check_ins_updated_since(ctx.tenant_id, check_in_scope, since_check_ins)
        .await?;

    let resources = store
        .list_resources_updated_since(ctx.tenant_id, since_resources)
        .await?;

    Ok(ServerChanges { mood_logs, journal_entries, check_ins, resources })
}

/// Read-only convenience for a psychologist/admin browsing the whole
/// tenant's check-ins outside of a push/pull cycle (spec.md §4.1, used
/// by `GET /api/sync/status` callers that only want scope information,
/// not a full pull).
pub fn check_in_scope_for(role: Role, user_id: Uuid) -> CheckInScope {
    if role.can_read_all_check_ins() {
        CheckInScope::Tenant
    } else {
        CheckInScope::Own(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Mood, MoodLogChange};
    use crate::store::{FakeStore, Store};
    use chrono::Duration;

    #[tokio::test]
    async fn bootstrap_pull_with_no_cursor_returns_everything() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        store.seed_mood_log(MoodLogRow {
            envelope: crate::domain::Envelope {
                id: Uuid::new_v4(),
                tenant_id: tenant,
                user_id: user,
                client_created_at: Utc::now(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
                synced_at: Utc::now(),
                is_deleted: false,
            },
            mood: Some(Mood::Great),
            intensity: None,
            notes: None,
        });

        let ctx = CallerContext { tenant_id: tenant, user_id: user, role: Role::Crew };
        let mut tx = store.begin_tx().await.unwrap();
        let changes = plan_pull(&mut tx, ctx, epoch(), epoch(), epoch(), epoch())
            .await
            .unwrap();
        assert_eq!(changes.mood_logs.len(), 1);
    }

    #[tokio::test]
    async fn crew_only_sees_own_check_ins_admin_sees_all() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let crew_a = Uuid::new_v4();
        let crew_b = Uuid::new_v4();
        let admin = Uuid::new_v4();

        for user in [crew_a, crew_b] {
            let change = crate::domain::CheckInChange {
                id: Uuid::new_v4(),
                client_created_at: Some(Utc::now() - Duration::hours(1)),
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
            };
            let ctx = CallerContext { tenant_id: tenant, user_id: user, role: Role::Crew };
            let mut tx = store.begin_tx().await.unwrap();
            crate::merge::merge_check_in(&mut tx, ctx, &change).await.unwrap();
            tx.commit().await.unwrap();
        }

        let crew_ctx = CallerContext { tenant_id: tenant, user_id: crew_a, role: Role::Crew };
        let mut tx = store.begin_tx().await.unwrap();
        let crew_changes = plan_pull(&mut tx, crew_ctx, epoch(), epoch(), epoch(), epoch())
            .await
            .unwrap();
        assert_eq!(crew_changes.check_ins.len(), 1);

        let admin_ctx = CallerContext { tenant_id: tenant, user_id: admin, role: Role::Admin };
        let mut tx = store.begin_tx().await.unwrap();
        let admin_changes = plan_pull(&mut tx, admin_ctx, epoch(), epoch(), epoch(), epoch())
            .await
            .unwrap();
        assert_eq!(admin_changes.check_ins.len(), 2);
    }

    #[tokio::test]
    async fn global_resource_visible_across_tenants() {
        let store = FakeStore::new();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        store.seed_resource(Resource {
            id: Uuid::new_v4(),
            tenant_id: None,
            title: "Managing fatigue at sea".into(),
            resource_type: crate::domain::ResourceType::Article,
            category: None,
            tags: vec![],
            is_published: true,
            offline_available: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });

        for tenant in [tenant_a, tenant_b] {
            let ctx = CallerContext { tenant_id: tenant, user_id: Uuid::new_v4(), role: Role::Crew };
            let mut tx = store.begin_tx().await.unwrap();
            let changes = plan_pull(&mut tx, ctx, epoch(), epoch(), epoch(), epoch())
                .await
                .unwrap();
            assert_eq!(changes.resources.len(), 1);
        }
    }

    #[tokio::test]
    async fn pull_since_a_recent_cursor_excludes_older_rows() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();

        let old_change = MoodLogChange {
            id: Uuid::new_v4(),
            client_created_at: Some(Utc::now() - Duration::days(2)),
            updated_at: None,
            is_deleted: false,
            mood: Some(Mood::Bad),
            intensity: None,
            notes: None,
        };
        let ctx = CallerContext { tenant_id: tenant, user_id: user, role: Role::Crew };
        {
            let mut tx = store.begin_tx().await.unwrap();
            crate::merge::merge_mood_log(&mut tx, ctx, &old_change).await.unwrap();
            tx.commit().await.unwrap();
        }

        let cutoff = Utc::now() - Duration::hours(1);
        let mut tx = store.begin_tx().await.unwrap();
        let changes = plan_pull(&mut tx, ctx, cutoff, cutoff, cutoff, cutoff).await.unwrap();
        assert!(changes.mood_logs.is_empty());
    }
}
