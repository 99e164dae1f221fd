//! Per-change validation (spec.md §4.3 step 1, §7 "Per-change invalid").
//!
//! A failure here rejects only the offending change; the orchestrator
//! continues processing the rest of the batch. This is deliberately
//! distinct from envelope validation (spec.md §4.6), which is a
//! fail-fast, whole-request concern handled by the wire types in
//! `http::sync` deserializing successfully in the first place.
//!
//! This module only checks shape, not reconciliation: whether a field is
//! *required* depends on whether the change turns out to be an insert or
//! an update (an update may omit any field it doesn't intend to touch,
//! per the store's `COALESCE`-based patch semantics), and reconciliation
//! only happens once `merge` has looked the id up in the store. Required-
//! field checks that need that context live in `merge`, not here.

use thiserror::Error;

use super::check_in::CheckInChange;
use super::journal_entry::{JournalEntryChange, MAX_TITLE_LEN};
use super::mood_log::MoodLogChange;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("malformed change payload: {0}")]
    Malformed(String),
    #[error("intensity must be between 1 and 10")]
    IntensityOutOfRange,
    #[error("title exceeds {0} characters")]
    TitleTooLong(usize),
}

pub fn parse_mood_log(raw: &serde_json::Value) -> Result<MoodLogChange, ValidationError> {
    let change: MoodLogChange =
        serde_json::from_value(raw.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    if let Some(intensity) = change.intensity {
        if !(1..=10).contains(&intensity) {
            return Err(ValidationError::IntensityOutOfRange);
        }
    }
    Ok(change)
}

pub fn parse_journal_entry(raw: &serde_json::Value) -> Result<JournalEntryChange, ValidationError> {
    let change: JournalEntryChange =
        serde_json::from_value(raw.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    if let Some(title) = &change.title {
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(ValidationError::TitleTooLong(MAX_TITLE_LEN));
        }
    }
    Ok(change)
}

pub fn parse_check_in(raw: &serde_json::Value) -> Result<CheckInChange, ValidationError> {
    let change: CheckInChange =
        serde_json::from_value(raw.clone()).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    Ok(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn rejects_unknown_mood_variant() {
        let raw = json!({
            "id": "2b2a6e2a-6e9c-4e1a-9c0b-8f7a6c5d4e3b",
            "clientCreatedAt": "2024-01-01T10:00:00Z",
            "mood": "ecstatic",
        });
        assert!(matches!(
            parse_mood_log(&raw),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_intensity_out_of_range() {
        let raw = json!({
            "id": "2b2a6e2a-6e9c-4e1a-9c0b-8f7a6c5d4e3b",
            "clientCreatedAt": "2024-01-01T10:00:00Z",
            "mood": "good",
            "intensity": 11,
        });
        assert_eq!(parse_mood_log(&raw), Err(ValidationError::IntensityOutOfRange));
    }

    #[test]
    fn tombstone_mood_log_parses_with_no_mood_at_all() {
        let raw = json!({
            "id": "2b2a6e2a-6e9c-4e1a-9c0b-8f7a6c5d4e3b",
            "isDeleted": true,
        });
        assert!(parse_mood_log(&raw).is_ok());
    }

    #[test]
    fn journal_entry_with_no_content_still_parses_shape() {
        // Whether a missing `content` is fatal depends on insert vs.
        // update, which this layer cannot know; see `merge`.
        let raw = json!({
            "id": "2b2a6e2a-6e9c-4e1a-9c0b-8f7a6c5d4e3b",
            "clientCreatedAt": "2024-01-01T10:00:00Z",
        });
        assert!(parse_journal_entry(&raw).is_ok());
    }

    #[test]
    fn rejects_title_too_long() {
        let raw = json!({
            "id": "2b2a6e2a-6e9c-4e1a-9c0b-8f7a6c5d4e3b",
            "clientCreatedAt": "2024-01-01T10:00:00Z",
            "content": "hello",
            "title": "x".repeat(MAX_TITLE_LEN + 1),
        });
        assert_eq!(
            parse_journal_entry(&raw),
            Err(ValidationError::TitleTooLong(MAX_TITLE_LEN))
        );
    }

    #[test]
    fn check_in_with_no_scheduled_for_still_parses_shape() {
        let raw = json!({
            "id": "2b2a6e2a-6e9c-4e1a-9c0b-8f7a6c5d4e3b",
            "clientCreatedAt": "2024-01-01T10:00:00Z",
        });
        assert!(parse_check_in(&raw).is_ok());
    }
}
