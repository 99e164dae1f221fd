//! Sole gateway to the relational backing store (spec.md §4.1).
//!
//! Every operation takes an explicit tenant, and for user-owned entities an
//! explicit user or [`CheckInScope`]. There is deliberately no method that
//! can read or write without one — tenant isolation is a property of this
//! trait's shape, not of a database feature layered underneath it
//! (spec.md §9 "Tenant isolation as a choke point").

mod fake;
mod pg;

pub use fake::FakeStore;
pub use pg::PgStore;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    CheckInChange, CheckInRow, CursorEntity, JournalEntryChange, JournalEntryRow, MoodLogChange,
    MoodLogRow, Resource, SyncCursor,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("backing store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Who a check-in list/read operation is scoped to (spec.md §4.1
/// "Access control for check-ins").
#[derive(Debug, Clone, Copy)]
pub enum CheckInScope {
    /// Crew: only rows owned by this user.
    Own(Uuid),
    /// Admin / psychologist: every row in the tenant.
    Tenant,
}

/// Connection-level gateway: opens the transaction every sync call runs
/// in, plus the one read (`get_cursors`, for `GET /api/sync/status`) that
/// deliberately stands outside the push/pull/cursor-advance atomic unit.
pub trait Store: Clone + Send + Sync + 'static {
    /// The transaction-scoped handle returned by [`Store::begin_tx`]. All
    /// mutating and pull-time read operations live on [`StoreTx`], never
    /// here, so that a sync call cannot accidentally touch the backing
    /// store outside its own transaction.
    type Tx: StoreTx;

    fn begin_tx(&self) -> impl std::future::Future<Output = Result<Self::Tx, StoreError>> + Send;

    fn get_cursors(
        &self,
        tenant: Uuid,
        user: Uuid,
        device: Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<SyncCursor>, StoreError>> + Send;
}

/// The transaction-scoped half of the store: every push, pull, and
/// cursor-advance operation for a single sync call runs through one
/// `StoreTx`, so that [`StoreTx::commit`] is the single point at which the
/// whole batch becomes visible (spec.md §4.6, §5 "Transactionality").
/// Dropping a `StoreTx` without calling `commit` rolls the batch back.
pub trait StoreTx: Send {
    // -- mood logs ---------------------------------------------------
    fn find_mood_log(
        &mut self,
        tenant: Uuid,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<MoodLogRow>, StoreError>> + Send;

    fn insert_mood_log(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &MoodLogChange,
    ) -> impl std::future::Future<Output = Result<MoodLogRow, StoreError>> + Send;

    fn update_mood_log_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &MoodLogChange,
        client_updated_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    fn list_mood_logs_updated_since(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<MoodLogRow>, StoreError>> + Send;

    // -- journal entries ----------------------------------------------
    fn find_journal_entry(
        &mut self,
        tenant: Uuid,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<JournalEntryRow>, StoreError>> + Send;

    fn insert_journal_entry(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &JournalEntryChange,
    ) -> impl std::future::Future<Output = Result<JournalEntryRow, StoreError>> + Send;

    fn update_journal_entry_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &JournalEntryChange,
        client_updated_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    fn list_journal_entries_updated_since(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<JournalEntryRow>, StoreError>> + Send;

    // -- check-ins ------------------------------------------------------
    fn find_check_in(
        &mut self,
        tenant: Uuid,
        id: Uuid,
    ) -> impl std::future::Future<Output = Result<Option<CheckInRow>, StoreError>> + Send;

    fn insert_check_in(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        change: &CheckInChange,
        allow_review_fields: bool,
    ) -> impl std::future::Future<Output = Result<CheckInRow, StoreError>> + Send;

    fn update_check_in_if_newer(
        &mut self,
        tenant: Uuid,
        id: Uuid,
        change: &CheckInChange,
        client_updated_at: DateTime<Utc>,
        allow_review_fields: bool,
    ) -> impl std::future::Future<Output = Result<bool, StoreError>> + Send;

    fn list_check_ins_updated_since(
        &mut self,
        tenant: Uuid,
        scope: CheckInScope,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<CheckInRow>, StoreError>> + Send;

    // -- resources (pull-only) -----------------------------------------
    fn list_resources_updated_since(
        &mut self,
        tenant: Uuid,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Vec<Resource>, StoreError>> + Send;

    // -- cursors ---------------------------------------------------------
    fn upsert_cursor(
        &mut self,
        tenant: Uuid,
        user: Uuid,
        device: Uuid,
        entity: CursorEntity,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;

    /// Commits the transaction, making every push/cursor-advance in this
    /// call visible atomically. Dropping the handle instead rolls back.
    fn commit(self) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
