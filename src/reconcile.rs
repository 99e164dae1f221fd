//! Identity reconciliation (spec.md §4.2).
//!
//! The server accepts the client-provided `id` as the canonical server id;
//! there is no translation table. This module only decides "exists" vs
//! "new" by looking the id up within tenant scope — the decision that
//! makes a retried push idempotent.

use uuid::Uuid;

use crate::domain::{CheckInRow, JournalEntryRow, MoodLogRow};
use crate::store::{StoreError, StoreTx};

pub enum Reconciliation<Row> {
    Insert,
    Update(Row),
}

pub async fn reconcile_mood_log<S: StoreTx>(
    store: &mut S,
    tenant: Uuid,
    id: Uuid,
) -> Result<Reconciliation<MoodLogRow>, StoreError> {
    Ok(match store.find_mood_log(tenant, id).await? {
        Some(row) => Reconciliation::Update(row),
        None => Reconciliation::Insert,
    })
}

pub async fn reconcile_journal_entry<S: StoreTx>(
    store: &mut S,
    tenant: Uuid,
    id: Uuid,
) -> Result<Reconciliation<JournalEntryRow>, StoreError> {
    Ok(match store.find_journal_entry(tenant, id).await? {
        Some(row) => Reconciliation::Update(row),
        None => Reconciliation::Insert,
    })
}

pub async fn reconcile_check_in<S: StoreTx>(
    store: &mut S,
    tenant: Uuid,
    id: Uuid,
) -> Result<Reconciliation<CheckInRow>, StoreError> {
    Ok(match store.find_check_in(tenant, id).await? {
        Some(row) => Reconciliation::Update(row),
        None => Reconciliation::Insert,
    })
}
