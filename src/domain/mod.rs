//! Shared entity envelope, entity-specific payloads, and caller identity.
//!
//! Every mutable entity (mood log, journal entry, check-in) shares the
//! envelope fields from `spec.md` §3; resources are read-only and pulled
//! but never pushed.

mod check_in;
mod envelope;
mod journal_entry;
mod mood_log;
mod resource;
pub mod validate;

pub use check_in::{CheckInChange, CheckInRow};
pub use envelope::{Envelope, EntityKind};
pub use journal_entry::{JournalEntryChange, JournalEntryRow};
pub use mood_log::{Mood, MoodLogChange, MoodLogRow};
pub use resource::{Resource, ResourceType};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The caller's identity and permission level, attached to the request by
/// the authentication collaborator. Out of scope for this crate's policy
/// (see `auth`), but every sync operation is a pure function of this tuple
/// plus the request body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerContext {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub role: Role,
}

/// Role of the authenticated caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Crew,
    Admin,
    Psychologist,
}

impl Role {
    /// Whether this role may read or review check-ins beyond its own.
    pub fn can_read_all_check_ins(self) -> bool {
        matches!(self, Role::Admin | Role::Psychologist)
    }

    /// Whether this role may set check-in review fields.
    pub fn can_review_check_ins(self) -> bool {
        matches!(self, Role::Psychologist)
    }
}

/// One per-{tenant, user, device, entity} replication checkpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncCursor {
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub device_id: Uuid,
    pub entity: CursorEntity,
    pub last_synced_at: DateTime<Utc>,
    pub last_record_id: Option<Uuid>,
    pub sync_cursor: Option<String>,
}

/// The four entities that carry a cursor (three mutable plus resources).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorEntity {
    MoodLog,
    JournalEntry,
    CheckIn,
    Resource,
}

impl CursorEntity {
    pub const ALL: [CursorEntity; 4] = [
        CursorEntity::MoodLog,
        CursorEntity::JournalEntry,
        CursorEntity::CheckIn,
        CursorEntity::Resource,
    ];
}

impl From<EntityKind> for CursorEntity {
    fn from(kind: EntityKind) -> Self {
        match kind {
            EntityKind::MoodLog => CursorEntity::MoodLog,
            EntityKind::JournalEntry => CursorEntity::JournalEntry,
            EntityKind::CheckIn => CursorEntity::CheckIn,
        }
    }
}
