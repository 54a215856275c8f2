use rusqlite::params;

use super::*;
use crate::entity::{EntityType, Record, RecordPatch};
use crate::error::StoreError;
use crate::store::{ensure_id, RecordStore};

const RECORD_COLUMNS: &str = "id, name, title, label, company, description, notes, client,
    client_id, project_id, status, amount, due_date, created_at, updated_at,
    linked_at, last_activity_at";

impl WorkspaceDb {
    // =========================================================================
    // Records (all four collections share one column layout)
    // =========================================================================

    /// Helper: map a row to `Record`.
    pub(crate) fn map_record_row(
        row: &rusqlite::Row<'_>,
        entity_type: EntityType,
    ) -> rusqlite::Result<Record> {
        Ok(Record {
            id: row.get(0)?,
            entity_type,
            name: row.get(1)?,
            title: row.get(2)?,
            label: row.get(3)?,
            company: row.get(4)?,
            description: row.get(5)?,
            notes: row.get(6)?,
            client: row.get(7)?,
            client_id: row.get(8)?,
            project_id: row.get(9)?,
            status: row.get(10)?,
            amount: row.get(11)?,
            due_date: row.get(12)?,
            created_at: row.get(13)?,
            updated_at: row.get(14)?,
            linked_at: row.get(15)?,
            last_activity_at: row.get(16)?,
        })
    }

    /// Get a record by ID.
    pub fn get_record(&self, entity_type: EntityType, id: &str) -> Result<Option<Record>, DbError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE id = ?1",
            entity_type.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query_map(params![id], |row| Self::map_record_row(row, entity_type))?;
        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    /// Get all records of a collection in insertion order.
    pub fn get_records(&self, entity_type: EntityType) -> Result<Vec<Record>, DbError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} ORDER BY rowid",
            entity_type.table()
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| Self::map_record_row(row, entity_type))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Insert a new record.
    pub fn insert_record(&self, record: &Record) -> Result<(), DbError> {
        let sql = format!(
            "INSERT INTO {} ({RECORD_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            record.entity_type.table()
        );
        self.conn.execute(
            &sql,
            params![
                record.id,
                record.name,
                record.title,
                record.label,
                record.company,
                record.description,
                record.notes,
                record.client,
                record.client_id,
                record.project_id,
                record.status,
                record.amount,
                record.due_date,
                record.created_at,
                record.updated_at,
                record.linked_at,
                record.last_activity_at,
            ],
        )?;
        Ok(())
    }

    /// Write every column of an existing record back to its row.
    pub fn save_record(&self, record: &Record) -> Result<(), DbError> {
        let sql = format!(
            "UPDATE {} SET
                name = ?2, title = ?3, label = ?4, company = ?5, description = ?6,
                notes = ?7, client = ?8, client_id = ?9, project_id = ?10, status = ?11,
                amount = ?12, due_date = ?13, created_at = ?14, updated_at = ?15,
                linked_at = ?16, last_activity_at = ?17
             WHERE id = ?1",
            record.entity_type.table()
        );
        self.conn.execute(
            &sql,
            params![
                record.id,
                record.name,
                record.title,
                record.label,
                record.company,
                record.description,
                record.notes,
                record.client,
                record.client_id,
                record.project_id,
                record.status,
                record.amount,
                record.due_date,
                record.created_at,
                record.updated_at,
                record.linked_at,
                record.last_activity_at,
            ],
        )?;
        Ok(())
    }
}

impl RecordStore for WorkspaceDb {
    fn get_all(&self, entity_type: EntityType) -> Result<Vec<Record>, StoreError> {
        Ok(self.get_records(entity_type)?)
    }

    fn get(&self, entity_type: EntityType, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.get_record(entity_type, id)?)
    }

    fn update(
        &self,
        entity_type: EntityType,
        id: &str,
        patch: &RecordPatch,
    ) -> Result<Record, StoreError> {
        let mut record = self
            .get_record(entity_type, id)?
            .ok_or_else(|| StoreError::NotFound {
                entity_type: entity_type.as_str(),
                id: id.to_string(),
            })?;
        record.apply(patch);
        self.save_record(&record)?;
        Ok(record)
    }

    fn create(&self, record: Record) -> Result<Record, StoreError> {
        let record = ensure_id(record);
        if self.get_record(record.entity_type, &record.id)?.is_some() {
            return Err(StoreError::Duplicate {
                entity_type: record.entity_type.as_str(),
                id: record.id,
            });
        }
        self.insert_record(&record)?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ForeignKey;

    fn test_db() -> WorkspaceDb {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("records_test.db");
        std::mem::forget(dir);
        WorkspaceDb::open_at(path).expect("open test db")
    }

    fn invoice(id: &str, title: &str) -> Record {
        let mut r = Record::new(EntityType::Invoice, id);
        r.title = Some(title.to_string());
        r.amount = Some(450.0);
        r.due_date = Some("2026-02-28".to_string());
        r
    }

    #[test]
    fn test_insert_and_get_round_trip_fields() {
        let db = test_db();
        let mut record = invoice("i1", "February retainer");
        record.client = Some("Acme".to_string());
        db.insert_record(&record).expect("insert");

        let fetched = db
            .get_record(EntityType::Invoice, "i1")
            .expect("get")
            .expect("exists");
        assert_eq!(fetched, record);
        assert!(db.get_record(EntityType::Project, "i1").expect("get").is_none());
    }

    #[test]
    fn test_store_update_and_create() {
        let db = test_db();
        let store: &dyn RecordStore = &db;
        store.create(invoice("i1", "Retainer")).expect("create");
        assert!(matches!(
            store.create(invoice("i1", "Again")),
            Err(StoreError::Duplicate { .. })
        ));

        let patch = RecordPatch::link(ForeignKey::ProjectId, "p1", "2026-03-01T00:00:00Z");
        let updated = store.update(EntityType::Invoice, "i1", &patch).expect("update");
        assert_eq!(updated.project_id.as_deref(), Some("p1"));

        let stored = store.get(EntityType::Invoice, "i1").unwrap().unwrap();
        assert_eq!(stored.project_id.as_deref(), Some("p1"));
        assert_eq!(stored.title.as_deref(), Some("Retainer"));

        assert!(matches!(
            store.update(EntityType::Invoice, "missing", &patch),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_save_record_overwrites_columns() {
        let db = test_db();
        let mut record = invoice("i1", "Draft");
        db.insert_record(&record).unwrap();
        record.title = Some("Final".to_string());
        record.status = Some("sent".to_string());
        db.save_record(&record).unwrap();

        let stored = db.get_record(EntityType::Invoice, "i1").unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Final"));
        assert_eq!(stored.status.as_deref(), Some("sent"));
        assert_eq!(db.get_records(EntityType::Invoice).unwrap().len(), 1);
    }
}
