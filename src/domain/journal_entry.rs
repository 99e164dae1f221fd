use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::envelope::Envelope;
use super::mood_log::Mood;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryRow {
    #[serde(flatten)]
    pub envelope: Envelope,
    pub title: Option<String>,
    pub content: String,
    pub mood: Option<Mood>,
    pub is_private: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryChange {
    pub id: Uuid,
    pub client_created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_deleted: bool,
    pub title: Option<String>,
    pub content: Option<String>,
    pub mood: Option<Mood>,
    pub is_private: Option<bool>,
}

/// Journal entry titles are capped at 500 chars (spec.md §3).
pub const MAX_TITLE_LEN: usize = 500;
