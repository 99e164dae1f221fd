//! Per-`{tenant, user, device, entity}` replication checkpoints (spec.md
//! §4.5).
//!
//! The per-entity grain is a forward-compatibility hook: today every
//! entity advances to the same `server_now`, and the wire protocol only
//! ever exchanges one combined `lastSyncAt`. A future revision could
//! advance entities independently without touching the wire format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::CursorEntity;
use crate::store::{StoreError, StoreTx};

/// Upserts all four entity cursors to `server_now` under one
/// `{tenant, user, device}` key, at the tail of a successful sync.
pub async fn advance_cursors<S: StoreTx>(
    store: &mut S,
    tenant: Uuid,
    user: Uuid,
    device: Uuid,
    server_now: DateTime<Utc>,
) -> Result<(), StoreError> {
    for entity in CursorEntity::ALL {
        store.upsert_cursor(tenant, user, device, entity, server_now).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FakeStore, Store};
    use chrono::Utc;

    #[tokio::test]
    async fn advancing_writes_one_row_per_entity() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let device = Uuid::new_v4();
        let now = Utc::now();

        let mut tx = store.begin_tx().await.unwrap();
        advance_cursors(&mut tx, tenant, user, device, now).await.unwrap();
        tx.commit().await.unwrap();

        let cursors = store.get_cursors(tenant, user, device).await.unwrap();
        assert_eq!(cursors.len(), CursorEntity::ALL.len());
        for cursor in &cursors {
            assert_eq!(cursor.last_synced_at, now);
        }
    }

    #[tokio::test]
    async fn re_advancing_updates_in_place() {
        let store = FakeStore::new();
        let tenant = Uuid::new_v4();
        let user = Uuid::new_v4();
        let device = Uuid::new_v4();

        let mut tx = store.begin_tx().await.unwrap();
        advance_cursors(&mut tx, tenant, user, device, Utc::now()).await.unwrap();
        tx.commit().await.unwrap();
        let later = Utc::now() + chrono::Duration::minutes(5);
        let mut tx = store.begin_tx().await.unwrap();
        advance_cursors(&mut tx, tenant, user, device, later).await.unwrap();
        tx.commit().await.unwrap();

        let cursors = store.get_cursors(tenant, user, device).await.unwrap();
        assert_eq!(cursors.len(), CursorEntity::ALL.len());
        for cursor in &cursors {
            assert_eq!(cursor.last_synced_at, later);
        }
    }
}
