use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fields shared by every mutable, user-owned entity (spec.md §3).
///
/// `tenant_id`, `user_id`, `created_at`, `client_created_at`, and `id` are
/// never taken from an inbound payload once a row exists; the merge engine
/// stamps them from the caller context or the first-insert payload only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub user_id: Uuid,
    pub client_created_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub synced_at: DateTime<Utc>,
    pub is_deleted: bool,
}

/// Which mutable entity table a pushed `Change` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    MoodLog,
    JournalEntry,
    CheckIn,
}

impl EntityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntityKind::MoodLog => "mood_log",
            EntityKind::JournalEntry => "journal_entry",
            EntityKind::CheckIn => "check_in",
        }
    }
}
