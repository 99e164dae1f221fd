use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::Envelope;
use super::mood_log::Mood;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRow {
    #[serde(flatten)]
    pub envelope: Envelope,
    pub scheduled_for: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub mood: Option<Mood>,
    pub responses: Option<serde_json::Value>,
    pub needs_attention: bool,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}

/// Inbound payload for a pushed check-in change.
///
/// The review fields (`needs_attention`, `reviewed_by`, `reviewed_at`,
/// `review_notes`) are present on the wire for every role but the merge
/// engine only persists them when the caller's role is `psychologist`
/// (spec.md §4.3); other roles' values are silently dropped, never
/// rejected.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInChange {
    pub id: Uuid,
    pub client_created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
    pub scheduled_for: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub mood: Option<Mood>,
    pub responses: Option<serde_json::Value>,
    pub needs_attention: Option<bool>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub review_notes: Option<String>,
}
