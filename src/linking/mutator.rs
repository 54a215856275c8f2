//! Foreign-key writes for auto-linking.

use chrono::Utc;

use crate::entity::{EntityType, ForeignKey, RecordPatch};
use crate::error::StoreError;
use crate::store::RecordStore;

/// Set `key` on a record to `target_id`, but only if it is currently unset.
///
/// On a successful write the record gets `linked_at = now` and the target
/// entity's `last_activity_at` is bumped. Returns `Ok(false)` when the record
/// already carries the key or its collection has no such key.
pub fn link_record(
    store: &dyn RecordStore,
    entity_type: EntityType,
    record_id: &str,
    key: ForeignKey,
    target_id: &str,
) -> Result<bool, StoreError> {
    if !entity_type.foreign_keys().contains(&key) {
        log::warn!(
            "Refusing to set {} on {} {}: not an owning key for that collection",
            key.column(),
            entity_type.as_str(),
            record_id
        );
        return Ok(false);
    }

    let record = store
        .get(entity_type, record_id)?
        .ok_or_else(|| StoreError::NotFound {
            entity_type: entity_type.as_str(),
            id: record_id.to_string(),
        })?;

    if record.foreign_key(key).is_some() {
        return Ok(false);
    }

    let now = Utc::now().to_rfc3339();
    store.update(entity_type, record_id, &RecordPatch::link(key, target_id, &now))?;

    if let Err(e) = touch_activity(store, key.target(), target_id, &now) {
        log::warn!(
            "Linked {} {} but could not bump activity on {} {}: {}",
            entity_type.as_str(),
            record_id,
            key.target().as_str(),
            target_id,
            e
        );
    }

    Ok(true)
}

/// Stamp `last_activity_at` on an entity.
pub fn touch_activity(
    store: &dyn RecordStore,
    entity_type: EntityType,
    id: &str,
    at: &str,
) -> Result<(), StoreError> {
    store.update(entity_type, id, &RecordPatch::activity(at))?;
    Ok(())
}
