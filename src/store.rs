//! Generic CRUD access to workspace collections.
//!
//! The linking services only ever talk to a `RecordStore`. `WorkspaceDb`
//! implements it over SQLite; `MemoryStore` keeps everything in process and
//! is used for dry runs and tests.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::entity::{EntityType, Record, RecordPatch};
use crate::error::StoreError;

/// CRUD over the `clients`, `projects`, `invoices` and `tasks` collections.
pub trait RecordStore {
    /// Every record in a collection, in storage order.
    fn get_all(&self, entity_type: EntityType) -> Result<Vec<Record>, StoreError>;

    fn get(&self, entity_type: EntityType, id: &str) -> Result<Option<Record>, StoreError>;

    /// Apply a patch and return the updated record.
    fn update(
        &self,
        entity_type: EntityType,
        id: &str,
        patch: &RecordPatch,
    ) -> Result<Record, StoreError>;

    /// Insert a new record. An empty id is replaced with a fresh UUID.
    fn create(&self, record: Record) -> Result<Record, StoreError>;
}

/// Assign a UUID when the caller left the id blank.
pub(crate) fn ensure_id(mut record: Record) -> Record {
    if record.id.trim().is_empty() {
        record.id = uuid::Uuid::new_v4().to_string();
    }
    record
}

/// In-process store. Collections keep insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<EntityType, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records, keeping their ids and timestamps.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut collections: HashMap<EntityType, Vec<Record>> = HashMap::new();
        for record in records {
            collections.entry(record.entity_type).or_default().push(record);
        }
        Self {
            collections: RwLock::new(collections),
        }
    }

    /// Copy every collection out of another store.
    pub fn snapshot_of(source: &dyn RecordStore) -> Result<Self, StoreError> {
        let mut records = Vec::new();
        for entity_type in EntityType::ALL {
            records.extend(source.get_all(entity_type)?);
        }
        Ok(Self::from_records(records))
    }

    #[cfg(test)]
    pub(crate) fn len(&self, entity_type: EntityType) -> usize {
        self.collections
            .read()
            .get(&entity_type)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl RecordStore for MemoryStore {
    fn get_all(&self, entity_type: EntityType) -> Result<Vec<Record>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(&entity_type)
            .cloned()
            .unwrap_or_default())
    }

    fn get(&self, entity_type: EntityType, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(&entity_type)
            .and_then(|records| records.iter().find(|r| r.id == id).cloned()))
    }

    fn update(
        &self,
        entity_type: EntityType,
        id: &str,
        patch: &RecordPatch,
    ) -> Result<Record, StoreError> {
        let mut guard = self.collections.write();
        let record = guard
            .get_mut(&entity_type)
            .and_then(|records| records.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::NotFound {
                entity_type: entity_type.as_str(),
                id: id.to_string(),
            })?;
        record.apply(patch);
        Ok(record.clone())
    }

    fn create(&self, record: Record) -> Result<Record, StoreError> {
        let record = ensure_id(record);
        let mut guard = self.collections.write();
        let records = guard.entry(record.entity_type).or_default();
        if records.iter().any(|r| r.id == record.id) {
            return Err(StoreError::Duplicate {
                entity_type: record.entity_type.as_str(),
                id: record.id,
            });
        }
        records.push(record.clone());
        Ok(record)
    }
}
