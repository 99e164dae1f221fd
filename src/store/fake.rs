//! In-memory [`Store`]/[`StoreTx`] used by the unit and property tests in
//! `merge`, `pull`, `cursor`, and `orchestrator`.
//!
//! This is the idiomatic generalization of the teacher's own test seam:
//! `sync-engine`'s `SyncClient` took a generic `ApplyDomainOp` trait object
//! and `push`/`pull` closures precisely so tests never needed a real
//! network or a real server. Here the seam is the whole [`Store`] trait,
//! and the fixture is a plain `Mutex`-guarded set of tables rather than a
//! SQLite file, since nothing about these tests depends on SQL semantics.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{
    CheckInChange, CheckInRow, CursorEntity, Envelope, JournalEntryChange, JournalEntryRow,
    MoodLogChange, MoodLogRow, Resource, SyncCursor,
};

use super::{CheckInScope, Store, StoreError, StoreTx};

#[derive(Debug, Default, Clone)]
struct Tables {
    mood_logs: HashMap<Uuid, MoodLogRow>,
    journal_entries: HashMap<Uuid, JournalEntryRow>,
    check_ins: HashMap<Uuid, CheckInRow>,
    resources: HashMap<Uuid, Resource>,
    cursors: HashMap<(Uuid, Uuid, Uuid, CursorEntity), SyncCursor>,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    inner: Arc<Mutex<Tables>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test helper: seed a resource directly, bypassing the sync protocol
    /// (resources are authored by an administrative path out of scope here).
    pub fn seed_resource(&self, resource: Resource) {
        self.inner.lock().unwrap().resources.insert(resource.id, resource);
    }

    /// Test helper: seed a mood log row as if it had been pushed by a prior
    /// sync, used to set up cross-tenant / last-write-wins scenarios.
    pub fn seed_mood_log(&self, row: MoodLogRow) {
        self.inner.lock().unwrap().mood_logs.insert(row.envelope.id, row);
    }

    // These mirror `StoreTx`'s method set but take `&self`, so tests and
    // the non-transactional `Store::get_cursors` path can read committed
    // state without opening a transaction of their own. `FakeTx` delegates
    // to these once it holds `&mut self`.

    pub async fn find_mood_log(&self, tenant: Uuid, id: Uuid) -> Result<Option<MoodLogRow>, StoreError> {
        let rows = &self.inner.lock().unwrap().mood_logs;
        Ok(rows.get(&id).filter(|r| r.envelope.tenant_id == tenant).cloned())
    }

    pub async fn insert_mood_log(
        &self,
        tenant: Uuid,
        user: Uuid,
        change: &MoodLogChange,
    ) -> Result<MoodLogRow, StoreError> {
        let now = Utc::now();
        let row = MoodLogRow {
            envelope: Envelope {
                id: change.id,
                tenant_id: tenant,
                user_id: user,
                client_created_at: change.client_created_at.unwrap_or(now),
                created_at: now,
                updated_at: now,
                synced_at: now,
                is_deleted: change.is_deleted,
            },
            mood: change.mood,
            intensity: change.intensity,
            notes: change.notes.clone(),
        };
        self.inner.lock().unwrap().mood_logs.insert(row.envelope.id, row.clone());
        Ok(row)
    }

    pub async fn update_mood_log_if_newer(
        &self,
        tenant: Uuid,
        id: Uuid,
        change: &MoodLogChange,
        client_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.inner.lock().unwrap();
        let Some(row) = tables.mood_logs.get_mut(&id) else {
            return Ok(false);
        };
        if row.envelope.tenant_id != tenant || client_updated_at <= row.envelope.updated_at {
            return Ok(false);
        }
        let now = Utc::now();
        if change.mood.is_some() {
            row.mood = change.mood;
        }
        row.intensity = change.intensity;
        row.notes = change.notes.clone();
        row.envelope.is_deleted = change.is_deleted;
        row.envelope.updated_at = now;
        row.envelope.synced_at = now;
        Ok(true)
    }

    pub async fn list_mood_logs_updated_since(
        &self,
        tenant: Uuid,
        user: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodLogRow>, StoreError> {
        let tables = self.inner.lock().unwrap();
        let mut rows: Vec<MoodLogRow> = tables
            .mood_logs
            .values()
            .filter(|r| r.envelope.tenant_id == tenant && r.envelope.user_id == user && r.envelope.updated_at > since)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.envelope.updated_at);
        Ok(rows)
    }

    pub async fn find_journal_entry(
        &self,
        tenant: Uuid,
        id: Uuid,
    ) -> Result<Option<JournalEntryRow>, StoreError> {
        let rows = &self.inner.lock().unwrap().journal_entries;
        Ok(rows.get(&id).filter(|r| r.envelope.tenant_id == tenant).cloned())
    }

    pub async fn insert_journal_entry(
        &self,
        tenant: Uuid,
        user: Uuid,
        change: &JournalEntryChange,
    ) -> Result<JournalEntryRow, StoreError> {
        let now = Utc::now();
        let row = JournalEntryRow {
            envelope: Envelope {
                id: change.id,
                tenant_id: tenant,
                user_id: user,
                client_created_at: change.client_created_at.unwrap_or(now),
                created_at: now,
                updated_at: now,
                synced_at: now,
                is_deleted: change.is_deleted,
            },
            title: change.title.clone(),
            content: change.content.clone().unwrap_or_default(),
            mood: change.mood,
            is_private: change.is_private.unwrap_or(true),
        };
        self.inner
            .lock()
            .unwrap()
            .journal_entries
            .insert(row.envelope.id, row.clone());
        Ok(row)
    }

    pub async fn update_journal_entry_if_newer(
        &self,
        tenant: Uuid,
        id: Uuid,
        change: &JournalEntryChange,
        client_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.inner.lock().unwrap();
        let Some(row) = tables.journal_entries.get_mut(&id) else {
            return Ok(false);
        };
        if row.envelope.tenant_id != tenant || client_updated_at <= row.envelope.updated_at {
            return Ok(false);
        }
        let now = Utc::now();
        if let Some(title) = &change.title {
            row.title = Some(title.clone());
        }
        if let Some(content) = &change.content {
            row.content = content.clone();
        }
        if change.mood.is_some() {
            row.mood = change.mood;
        }
        if let Some(is_private) = change.is_private {
            row.is_private = is_private;
        }
        row.envelope.is_deleted = change.is_deleted;
        row.envelope.updated_at = now;
        row.envelope.synced_at = now;
        Ok(true)
    }

    pub async fn list_journal_entries_updated_since(
        &self,
        tenant: Uuid,
        user: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<JournalEntryRow>, StoreError> {
        let tables = self.inner.lock().unwrap();
        let mut rows: Vec<JournalEntryRow> = tables
            .journal_entries
            .values()
            .filter(|r| r.envelope.tenant_id == tenant && r.envelope.user_id == user && r.envelope.updated_at > since)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.envelope.updated_at);
        Ok(rows)
    }

    pub async fn find_check_in(&self, tenant: Uuid, id: Uuid) -> Result<Option<CheckInRow>, StoreError> {
        let rows = &self.inner.lock().unwrap().check_ins;
        Ok(rows.get(&id).filter(|r| r.envelope.tenant_id == tenant).cloned())
    }

    pub async fn insert_check_in(
        &self,
        tenant: Uuid,
        user: Uuid,
        change: &CheckInChange,
        allow_review_fields: bool,
    ) -> Result<CheckInRow, StoreError> {
        let now = Utc::now();
        let row = CheckInRow {
            envelope: Envelope {
                id: change.id,
                tenant_id: tenant,
                user_id: user,
                client_created_at: change.client_created_at.unwrap_or(now),
                created_at: now,
                updated_at: now,
                synced_at: now,
                is_deleted: change.is_deleted,
            },
            scheduled_for: change.scheduled_for.unwrap_or(now),
            completed_at: change.completed_at,
            mood: change.mood,
            responses: change.responses.clone(),
            needs_attention: if allow_review_fields { change.needs_attention.unwrap_or(false) } else { false },
            reviewed_by: if allow_review_fields { change.reviewed_by } else { None },
            reviewed_at: if allow_review_fields { change.reviewed_at } else { None },
            review_notes: if allow_review_fields { change.review_notes.clone() } else { None },
        };
        self.inner.lock().unwrap().check_ins.insert(row.envelope.id, row.clone());
        Ok(row)
    }

    pub async fn update_check_in_if_newer(
        &self,
        tenant: Uuid,
        id: Uuid,
        change: &CheckInChange,
        client_updated_at: DateTime<Utc>,
        allow_review_fields: bool,
    ) -> Result<bool, StoreError> {
        let mut tables = self.inner.lock().unwrap();
        let Some(row) = tables.check_ins.get_mut(&id) else {
            return Ok(false);
        };
        if row.envelope.tenant_id != tenant || client_updated_at <= row.envelope.updated_at {
            return Ok(false);
        }
        let now = Utc::now();
        if let Some(scheduled_for) = change.scheduled_for {
            row.scheduled_for = scheduled_for;
        }
        if change.completed_at.is_some() {
            row.completed_at = change.completed_at;
        }
        if change.mood.is_some() {
            row.mood = change.mood;
        }
        if change.responses.is_some() {
            row.responses = change.responses.clone();
        }
        if allow_review_fields {
            if let Some(needs_attention) = change.needs_attention {
                row.needs_attention = needs_attention;
            }
            if change.reviewed_by.is_some() {
                row.reviewed_by = change.reviewed_by;
            }
            if change.reviewed_at.is_some() {
                row.reviewed_at = change.reviewed_at;
            }
            if change.review_notes.is_some() {
                row.review_notes = change.review_notes.clone();
            }
        }
        row.envelope.is_deleted = change.is_deleted;
        row.envelope.updated_at = now;
        row.envelope.synced_at = now;
        Ok(true)
    }

    pub async fn list_check_ins_updated_since(
        &self,
        tenant: Uuid,
        scope: CheckInScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<CheckInRow>, StoreError> {
        let tables = self.inner.lock().unwrap();
        let mut rows: Vec<CheckInRow> = tables
            .check_ins
            .values()
            .filter(|r| r.envelope.tenant_id == tenant && r.envelope.updated_at > since)
            .filter(|r| match scope {
                CheckInScope::Own(user) => r.envelope.user_id == user,
                CheckInScope::Tenant => true,
            })
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.envelope.updated_at);
        Ok(rows)
    }

    pub async fn list_resources_updated_since(
        &self,
        tenant: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<Resource>, StoreError> {
        let tables = self.inner.lock().unwrap();
        let mut rows: Vec<Resource> = tables
            .resources
            .values()
            .filter(|r| r.is_published && (r.tenant_id == Some(tenant) || r.tenant_id.is_none()))
            .filter(|r| r.updated_at > since)
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.updated_at);
        Ok(rows)
    }

    pub async fn upsert_cursor(
        &self,
        tenant: Uuid,
        user: Uuid,
        device: Uuid,
        entity: CursorEntity,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.inner.lock().unwrap();
        tables.cursors.insert(
            (tenant, user, device, entity),
            SyncCursor {
                tenant_id: tenant,
                user_id: user,
                device_id: device,
                entity,
                last_synced_at: at,
                last_record_id: None,
                sync_cursor: None,
            },
        );
        Ok(())
    }

    pub async fn get_cursors(&self, tenant: Uuid, user: Uuid, device: Uuid) -> Result<Vec<SyncCursor>, StoreError> {
        let tables = self.inner.lock().unwrap();
        Ok(tables
            .cursors
            .values()
            .filter(|c| c.tenant_id == tenant && c.user_id == user && c.device_id == device)
            .cloned()
            .collect())
    }
}

impl Store for FakeStore {
    type Tx = FakeTx;

    async fn begin_tx(&self) -> Result<FakeTx, StoreError> {
        let snapshot = self.inner.lock().unwrap().clone();
        Ok(FakeTx { store: self.clone(), snapshot: Some(snapshot) })
    }

    async fn get_cursors(&self, tenant: Uuid, user: Uuid, device: Uuid) -> Result<Vec<SyncCursor>, StoreError> {
        FakeStore::get_cursors(self, tenant, user, device).await
    }
}

/// A "transaction" over a [`FakeStore`]: holds a pre-begin snapshot of the
/// tables and restores it on drop unless [`StoreTx::commit`] consumed the
/// handle first, emulating a real `sqlx::Transaction`'s rollback-on-drop.
pub struct FakeTx {
    store: FakeStore,
    snapshot: Option<Tables>,
}

impl Drop for FakeTx {
    fn drop(&mut self) {
        if let Some(snapshot) = self.snapshot.take() {
            *self.store.inner.lock().unwrap() = snapshot;
        }
    }
}

impl StoreTx for FakeTx {
    async fn find_mood_log(&mut self, tenant: Uuid, id: Uuid) -> Result<Option<MoodLogRow>, StoreError> {
        self.store.find_mood_log(tenant, id).await
    }

    async fn insert_mood_log(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &MoodLogChange,
    ) -> Result<MoodLogRow, StoreError> {
        self.store.insert_mood_log(tenant, user, change).await
    }

    async fn update_mood_log_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &MoodLogChange,
        client_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.store.update_mood_log_if_newer(tenant, id, change, client_updated_at).await
    }

    async fn list_mood_logs_updated_since(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<MoodLogRow>, StoreError> {
        self.store.list_mood_logs_updated_since(tenant, user, since).await
    }

    async fn find_journal_entry(&mut self, tenant: Uuid, id: Uuid) -> Result<Option<JournalEntryRow>, StoreError> {
        self.store.find_journal_entry(tenant, id).await
    }

    async fn insert_journal_entry(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &JournalEntryChange,
    ) -> Result<JournalEntryRow, StoreError> {
        self.store.insert_journal_entry(tenant, user, change).await
    }

    async fn update_journal_entry_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &JournalEntryChange,
        client_updated_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        self.store.update_journal_entry_if_newer(tenant, id, change, client_updated_at).await
    }

    async fn list_journal_entries_updated_since(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        since: DateTime<Utc>,
    ) -> Result<Vec<JournalEntryRow>, StoreError> {
        self.store.list_journal_entries_updated_since(tenant, user, since).await
    }

    async fn find_check_in(&mut self, tenant: Uuid, id: Uuid) -> Result<Option<CheckInRow>, StoreError> {
        self.store.find_check_in(tenant, id).await
    }

    async fn insert_check_in(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &CheckInChange,
        allow_review_fields: bool,
    ) -> Result<CheckInRow, StoreError> {
        self.store.insert_check_in(tenant, user, change, allow_review_fields).await
    }

    async fn update_check_in_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &CheckInChange,
        client_updated_at: DateTime<Utc>,
        allow_review_fields: bool,
    ) -> Result<bool, StoreError> {
        self.store
            .update_check_in_if_newer(tenant, id, change, client_updated_at, allow_review_fields)
            .await
    }

    async fn list_check_ins_updated_since(
        &mut self,
        tenant: Uuid,
        scope: CheckInScope,
        since: DateTime<Utc>,
    ) -> Result<Vec<CheckInRow>, StoreError> {
        self.store.list_check_ins_updated_since(tenant, scope, since).await
    }

    async fn list_resources_updated_since(&mut self, tenant: Uuid, since: DateTime<Utc>) -> Result<Vec<Resource>, StoreError> {
        self.store.list_resources_updated_since(tenant, since).await
    }

    async fn upsert_cursor(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        device: Uuid,
        entity: CursorEntity,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.store.upsert_cursor(tenant, user, device, entity, at).await
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        self.snapshot = None;
        Ok(())
    }
}
