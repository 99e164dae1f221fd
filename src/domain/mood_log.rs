use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::Envelope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    Great,
    Good,
    Okay,
    Bad,
    Terrible,
}

/// Stored mood log row, as returned in `serverChanges.moodLogs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodLogRow {
    #[serde(flatten)]
    pub envelope: Envelope,
    /// Absent only for a row whose very first push was a tombstone
    /// (`isDeleted: true`) with no mood ever recorded.
    pub mood: Option<Mood>,
    pub intensity: Option<i16>,
    pub notes: Option<String>,
}

/// Inbound payload for a pushed mood log change. Fields the caller may not
/// set directly (`tenant_id`, `user_id`, `created_at`, `id` on update) are
/// simply absent from this type.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoodLogChange {
    pub id: Uuid,
    pub client_created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
    pub mood: Option<Mood>,
    pub intensity: Option<i16>,
    pub notes: Option<String>,
}
