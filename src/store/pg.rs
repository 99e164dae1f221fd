//! Postgres-backed [`Store`]/[`StoreTx`]: runtime-checked `sqlx` queries
//! (no `query!` macro, since there is no live database to verify against
//! at build time) following the upsert-with-a-`WHERE updated_at <`-guard
//! shape from
//! `other_examples/…iqrah-mobile…backend-crates-storage-src-sync_repository.rs`,
//! including that file's split between a pool-level gateway (`apply_changes`
//! opens the transaction) and `_tx`-suffixed methods that do the actual
//! work against an open `sqlx::Transaction`.
//!
//! The DDL these queries assume (composite index on `(tenant_id, user_id)`,
//! single index on `updated_at`, per spec.md §6) is owned by the schema
//! migration collaborator and out of scope here.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::{
    CheckInChange, CheckInRow, CursorEntity, Envelope, JournalEntryChange, JournalEntryRow,
    Mood, MoodLogChange, MoodLogRow, Resource, ResourceType, SyncCursor,
};

use super::{CheckInScope, Store, StoreError, StoreTx};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl Store for PgStore {
    type Tx = PgTx;

    /// Opens the single transaction a whole sync call runs in (spec.md
    /// §4.6, §5 "Transactionality"). `Pool::begin` hands back a
    /// `'static`-lifetime transaction that owns one pooled connection
    /// outright, so `PgTx` needs no lifetime parameter of its own.
    async fn begin_tx(&self) -> Result<PgTx, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(PgTx { tx })
    }

    async fn get_cursors(&self, tenant: Uuid, user: Uuid, device: Uuid) -> Result<Vec<SyncCursor>, StoreError> {
        let rows = sqlx::query_as::<_, CursorSqlRow>(
            "SELECT tenant_id, user_id, device_id, entity, last_synced_at, last_record_id, sync_cursor
             FROM sync_cursors WHERE tenant_id = $1 AND user_id = $2 AND device_id = $3",
        )
        .bind(tenant)
        .bind(user)
        .bind(device)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

/// One sync call's transaction. Every method runs its query against
/// `&mut self.tx`; the transaction commits (making the whole batch
/// visible at once) only in [`StoreTx::commit`] — dropped without a
/// commit, `sqlx::Transaction` rolls itself back.
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[derive(sqlx::FromRow)]
struct MoodLogSqlRow {
    id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    client_created_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    synced_at: DateTime<Utc>,
    is_deleted: bool,
    mood: Option<String>,
    intensity: Option<i16>,
    notes: Option<String>,
}

fn mood_to_str(mood: Mood) -> &'static str {
    match mood {
        Mood::Great => "great",
        Mood::Good => "good",
        Mood::Okay => "okay",
        Mood::Bad => "bad",
        Mood::Terrible => "terrible",
    }
}

fn str_to_mood(s: &str) -> Mood {
    match s {
        "great" => Mood::Great,
        "good" => Mood::Good,
        "okay" => Mood::Okay,
        "bad" => Mood::Bad,
        _ => Mood::Terrible,
    }
}

impl From<MoodLogSqlRow> for MoodLogRow {
    fn from(r: MoodLogSqlRow) -> Self {
        MoodLogRow {
            envelope: Envelope {
                id: r.id,
                tenant_id: r.tenant_id,
                user_id: r.user_id,
                client_created_at: r.client_created_at,
                created_at: r.created_at,
                updated_at: r.updated_at,
                synced_at: r.synced_at,
                is_deleted: r.is_deleted,
            },
            mood: r.mood.as_deref().map(str_to_mood),
            intensity: r.intensity,
            notes: r.notes,
        }
    }
}

impl StoreTx for PgTx {
    async fn find_mood_log(&mut self, tenant: Uuid, id: Uuid) -> Result<Option<MoodLogRow>, StoreError> {
        let row = sqlx::query_as::<_, MoodLogSqlRow>(
            "SELECT id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                    is_deleted, mood, intensity, notes
             FROM mood_logs WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_mood_log(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &MoodLogChange,
    ) -> Result<MoodLogRow, StoreError> {
        let row = sqlx::query_as::<_, MoodLogSqlRow>(
            "INSERT INTO mood_logs
                (id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                 is_deleted, mood, intensity, notes)
             VALUES ($1, $2, $3, $4, now(), now(), now(), $5, $6, $7, $8)
             RETURNING id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                       is_deleted, mood, intensity, notes",
        )
        .bind(change.id)
        .bind(tenant)
        .bind(user)
        .bind(change.client_created_at)
        .bind(change.is_deleted)
        .bind(change.mood.map(mood_to_str))
        .bind(change.intensity)
        .bind(&change.notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn update_mood_log_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &MoodLogChange,
        client_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE mood_logs SET
                mood = COALESCE($1, mood),
                intensity = $2,
                notes = $3,
                is_deleted = $4,
                updated_at = now(),
                synced_at = now()
             WHERE id = $5 AND tenant_id = $6 AND updated_at < $7",
        )
        .bind(change.mood.map(mood_to_str))
        .bind(change.intensity)
        .bind(&change.notes)
        .bind(change.is_deleted)
        .bind(id)
        .bind(tenant)
        .bind(client_updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_mood_logs_updated_since(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodLogRow>, StoreError> {
        let rows = sqlx::query_as::<_, MoodLogSqlRow>(
            "SELECT id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                    is_deleted, mood, intensity, notes
             FROM mood_logs
             WHERE tenant_id = $1 AND user_id = $2 AND updated_at > $3
             ORDER BY updated_at ASC",
        )
        .bind(tenant)
        .bind(user)
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_journal_entry(&mut self, tenant: Uuid, id: Uuid) -> Result<Option<JournalEntryRow>, StoreError> {
        let row = sqlx::query_as::<_, JournalEntrySqlRow>(
            "SELECT id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                    is_deleted, title, content, mood, is_private
             FROM journal_entries WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_journal_entry(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &JournalEntryChange,
    ) -> Result<JournalEntryRow, StoreError> {
        let row = sqlx::query_as::<_, JournalEntrySqlRow>(
            "INSERT INTO journal_entries
                (id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                 is_deleted, title, content, mood, is_private)
             VALUES ($1, $2, $3, $4, now(), now(), now(), $5, $6, $7, $8, $9)
             RETURNING id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                       is_deleted, title, content, mood, is_private",
        )
        .bind(change.id)
        .bind(tenant)
        .bind(user)
        .bind(change.client_created_at)
        .bind(change.is_deleted)
        .bind(&change.title)
        .bind(change.content.clone().unwrap_or_default())
        .bind(change.mood.map(mood_to_str))
        .bind(change.is_private.unwrap_or(true))
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn update_journal_entry_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &JournalEntryChange,
        client_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE journal_entries SET
                title = COALESCE($1, title),
                content = COALESCE($2, content),
                mood = COALESCE($3, mood),
                is_private = COALESCE($4, is_private),
                is_deleted = $5,
                updated_at = now(),
                synced_at = now()
             WHERE id = $6 AND tenant_id = $7 AND updated_at < $8",
        )
        .bind(&change.title)
        .bind(&change.content)
        .bind(change.mood.map(mood_to_str))
        .bind(change.is_private)
        .bind(change.is_deleted)
        .bind(id)
        .bind(tenant)
        .bind(client_updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_journal_entries_updated_since(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<JournalEntryRow>, StoreError> {
        let rows = sqlx::query_as::<_, JournalEntrySqlRow>(
            "SELECT id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                    is_deleted, title, content, mood, is_private
             FROM journal_entries
             WHERE tenant_id = $1 AND user_id = $2 AND updated_at > $3
             ORDER BY updated_at ASC",
        )
        .bind(tenant)
        .bind(user)
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_check_in(&mut self, tenant: Uuid, id: Uuid) -> Result<Option<CheckInRow>, StoreError> {
        let row = sqlx::query_as::<_, CheckInSqlRow>(
            "SELECT id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                    is_deleted, scheduled_for, completed_at, mood, responses, needs_attention,
                    reviewed_by, reviewed_at, review_notes
             FROM check_ins WHERE id = $1 AND tenant_id = $2",
        )
        .bind(id)
        .bind(tenant)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row.map(Into::into))
    }

    async fn insert_check_in(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &CheckInChange,
        allow_review_fields: bool,
    ) -> Result<CheckInRow, StoreError> {
        let (needs_attention, reviewed_by, reviewed_at, review_notes) = if allow_review_fields {
            (
                change.needs_attention.unwrap_or(false),
                change.reviewed_by,
                change.reviewed_at,
                change.review_notes.clone(),
            )
        } else {
            (false, None, None, None)
        };
        let row = sqlx::query_as::<_, CheckInSqlRow>(
            "INSERT INTO check_ins
                (id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                 is_deleted, scheduled_for, completed_at, mood, responses, needs_attention,
                 reviewed_by, reviewed_at, review_notes)
             VALUES ($1, $2, $3, $4, now(), now(), now(), $5, $6, $7, $8, $9, $10, $11, $12, $13)
             RETURNING id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                       is_deleted, scheduled_for, completed_at, mood, responses, needs_attention,
                       reviewed_by, reviewed_at, review_notes",
        )
        .bind(change.id)
        .bind(tenant)
        .bind(user)
        .bind(change.client_created_at)
        .bind(change.is_deleted)
        .bind(change.scheduled_for)
        .bind(change.completed_at)
        .bind(change.mood.map(mood_to_str))
        .bind(&change.responses)
        .bind(needs_attention)
        .bind(reviewed_by)
        .bind(reviewed_at)
        .bind(review_notes)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row.into())
    }

    async fn update_check_in_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &CheckInChange,
        client_updated_at: DateTime<Utc>,
        allow_review_fields: bool,
    ) -> Result<bool, StoreError> {
        let (needs_attention, reviewed_by, reviewed_at, review_notes) = if allow_review_fields {
            (
                change.needs_attention,
                change.reviewed_by,
                change.reviewed_at,
                change.review_notes.clone(),
            )
        } else {
            (None, None, None, None)
        };
        let result = sqlx::query(
            "UPDATE check_ins SET
                scheduled_for = COALESCE($1, scheduled_for),
                completed_at = COALESCE($2, completed_at),
                mood = COALESCE($3, mood),
                responses = COALESCE($4, responses),
                needs_attention = COALESCE($5, needs_attention),
                reviewed_by = COALESCE($6, reviewed_by),
                reviewed_at = COALESCE($7, reviewed_at),
                review_notes = COALESCE($8, review_notes),
                is_deleted = $9,
                updated_at = now(),
                synced_at = now()
             WHERE id = $10 AND tenant_id = $11 AND updated_at < $12",
        )
        .bind(change.scheduled_for)
        .bind(change.completed_at)
        .bind(change.mood.map(mood_to_str))
        .bind(&change.responses)
        .bind(needs_attention)
        .bind(reviewed_by)
        .bind(reviewed_at)
        .bind(review_notes)
        .bind(change.is_deleted)
        .bind(id)
        .bind(tenant)
        .bind(client_updated_at)
        .execute(&mut *self.tx)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_check_ins_updated_since(
        &mut self,
        tenant: Uuid,
        scope: CheckInScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<CheckInRow>, StoreError> {
        let rows = match scope {
            CheckInScope::Own(user) => {
                sqlx::query_as::<_, CheckInSqlRow>(
                    "SELECT id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                            is_deleted, scheduled_for, completed_at, mood, responses, needs_attention,
                            reviewed_by, reviewed_at, review_notes
                     FROM check_ins
                     WHERE tenant_id = $1 AND user_id = $2 AND updated_at > $3
                     ORDER BY updated_at ASC",
                )
                .bind(tenant)
                .bind(user)
                .bind(since)
                .fetch_all(&mut *self.tx)
                .await?
            }
            CheckInScope::Tenant => {
                sqlx::query_as::<_, CheckInSqlRow>(
                    "SELECT id, tenant_id, user_id, client_created_at, created_at, updated_at, synced_at,
                            is_deleted, scheduled_for, completed_at, mood, responses, needs_attention,
                            reviewed_by, reviewed_at, review_notes
                     FROM check_ins
                     WHERE tenant_id = $1 AND updated_at > $2
                     ORDER BY updated_at ASC",
                )
                .bind(tenant)
                .bind(since)
                .fetch_all(&mut *self.tx)
                .await?
            }
        };
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn list_resources_updated_since(&mut self, tenant: Uuid, since: DateTime<Utc>) -> Result<Vec<Resource>, StoreError> {
        let rows = sqlx::query_as::<_, ResourceSqlRow>(
            "SELECT id, tenant_id, title, type, category, tags, is_published, offline_available,
                    created_at, updated_at
             FROM resources
             WHERE is_published AND (tenant_id = $1 OR tenant_id IS NULL) AND updated_at > $2
             ORDER BY updated_at ASC",
        )
        .bind(tenant)
        .bind(since)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn upsert_cursor(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        device: Uuid,
        entity: CursorEntity,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sync_cursors (tenant_id, user_id, device_id, entity, last_synced_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT (tenant_id, user_id, device_id, entity)
             DO UPDATE SET last_synced_at = EXCLUDED.last_synced_at",
        )
        .bind(tenant)
        .bind(user)
        .bind(device)
        .bind(cursor_entity_to_str(entity))
        .bind(at)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct JournalEntrySqlRow {
    id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    client_created_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    synced_at: DateTime<Utc>,
    is_deleted: bool,
    title: Option<String>,
    content: String,
    mood: Option<String>,
    is_private: bool,
}

impl From<JournalEntrySqlRow> for JournalEntryRow {
    fn from(r: JournalEntrySqlRow) -> Self {
        JournalEntryRow {
            envelope: Envelope {
                id: r.id,
                tenant_id: r.tenant_id,
                user_id: r.user_id,
                client_created_at: r.client_created_at,
                created_at: r.created_at,
                updated_at: r.updated_at,
                synced_at: r.synced_at,
                is_deleted: r.is_deleted,
            },
            title: r.title,
            content: r.content,
            mood: r.mood.as_deref().map(str_to_mood),
            is_private: r.is_private,
        }
    }
}

#[derive(sqlx::FromRow)]
struct CheckInSqlRow {
    id: Uuid,
    tenant_id: Uuid,
    user_id: Uuid,
    client_created_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    synced_at: DateTime<Utc>,
    is_deleted: bool,
    scheduled_for: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    mood: Option<String>,
    responses: Option<serde_json::Value>,
    needs_attention: bool,
    reviewed_by: Option<Uuid>,
    reviewed_at: Option<DateTime<Utc>>,
    review_notes: Option<String>,
}

impl From<CheckInSqlRow> for CheckInRow {
    fn from(r: CheckInSqlRow) -> Self {
        CheckInRow {
            envelope: Envelope {
                id: r.id,
                tenant_id: r.tenant_id,
                user_id: r.user_id,
                client_created_at: r.client_created_at,
                created_at: r.created_at,
                updated_at: r.updated_at,
                synced_at: r.synced_at,
                is_deleted: r.is_deleted,
            },
            scheduled_for: r.scheduled_for,
            completed_at: r.completed_at,
            mood: r.mood.as_deref().map(str_to_mood),
            responses: r.responses,
            needs_attention: r.needs_attention,
            reviewed_by: r.reviewed_by,
            reviewed_at: r.reviewed_at,
            review_notes: r.review_notes,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ResourceSqlRow {
    id: Uuid,
    tenant_id: Option<Uuid>,
    title: String,
    #[sqlx(rename = "type")]
    resource_type: String,
    category: Option<String>,
    tags: Vec<String>,
    is_published: bool,
    offline_available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ResourceSqlRow> for Resource {
    fn from(r: ResourceSqlRow) -> Self {
        Resource {
            id: r.id,
            tenant_id: r.tenant_id,
            title: r.title,
            resource_type: match r.resource_type.as_str() {
                "article" => ResourceType::Article,
                "video" => ResourceType::Video,
                "exercise" => ResourceType::Exercise,
                _ => ResourceType::Audio,
            },
            category: r.category,
            tags: r.tags,
            is_published: r.is_published,
            offline_available: r.offline_available,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn cursor_entity_to_str(entity: CursorEntity) -> &'static str {
    match entity {
        CursorEntity::MoodLog => "mood_log",
        CursorEntity::JournalEntry => "journal_entry",
        CursorEntity::CheckIn => "check_in",
        CursorEntity::Resource => "resource",
    }
}

fn str_to_cursor_entity(s: &str) -> CursorEntity {
    match s {
        "mood_log" => CursorEntity::MoodLog,
        "journal_entry" => CursorEntity::JournalEntry,
        "check_in" => CursorEntity::CheckIn,
        _ => CursorEntity::Resource,
    }
}

#[derive(sqlx::FromRow)]
struct CursorSqlRow {
    tenant_id: Uuid,
    user_id: Uuid,
    device_id: Uuid,
    entity: String,
    last_synced_at: DateTime<Utc>,
    last_record_id: Option<Uuid>,
    sync_cursor: Option<String>,
}

impl From<CursorSqlRow> for SyncCursor {
    fn from(r: CursorSqlRow) -> Self {
        SyncCursor {
            tenant_id: r.tenant_id,
            user_id: r.user_id,
            device_id: r.device_id,
            entity: str_to_cursor_entity(&r.entity),
            last_synced_at: r.last_synced_at,
            last_record_id: r.last_record_id,
            sync_cursor: r.sync_cursor,
        }
    }
}
