use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Article,
    Video,
    Exercise,
    Audio,
}

/// A content-library resource. Read-only to the sync engine: created by
/// administrative paths outside this crate, only ever read during pull.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: Uuid,
    /// `None` means global — visible to every tenant.
    pub tenant_id: Option<Uuid>,
    pub title: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub is_published: bool,
    pub offline_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
