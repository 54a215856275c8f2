//! One-time import of a legacy workspace export.
//!
//! Older exports were dumped straight from browser storage and disagree on
//! field names (`clientId` vs `client_id`, `clientName` vs `client`,
//! `title` vs `name`, ...). Every variant is mapped here, once, onto the
//! canonical `Record`; nothing downstream has to know about them.
//!
//! Expected shape:
//!
//! ```json
//! { "clients": [...], "projects": [...], "invoices": [...], "tasks": [...] }
//! ```
//!
//! Collection keys may carry a `uba-` / `uba_` prefix. Unknown keys are
//! ignored.

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::entity::{EntityType, Record};
use crate::error::ImportError;
use crate::store::RecordStore;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub created: usize,
    /// Records whose id already existed in the store.
    pub skipped: usize,
}

pub fn import_file(store: &dyn RecordStore, path: &Path) -> Result<ImportReport, ImportError> {
    let content = fs::read_to_string(path)?;
    import_str(store, &content)
}

pub fn import_str(store: &dyn RecordStore, json: &str) -> Result<ImportReport, ImportError> {
    let value: Value = serde_json::from_str(json)?;
    import_value(store, &value)
}

/// Import every recognised collection. Clients go first so parents exist
/// before the records that point at them.
pub fn import_value(store: &dyn RecordStore, value: &Value) -> Result<ImportReport, ImportError> {
    let root = value
        .as_object()
        .ok_or_else(|| ImportError::Shape("top level must be an object".to_string()))?;

    let mut report = ImportReport::default();
    for entity_type in EntityType::ALL {
        let Some(items) = collection(root, entity_type) else {
            continue;
        };
        let items = items.as_array().ok_or_else(|| {
            ImportError::Shape(format!("`{}` must be an array", entity_type.table()))
        })?;

        for (index, item) in items.iter().enumerate() {
            let record = parse_record(entity_type, item).map_err(|e| match e {
                ImportError::Shape(msg) => {
                    ImportError::Shape(format!("{}[{}]: {}", entity_type.table(), index, msg))
                }
                other => other,
            })?;

            if !record.id.is_empty() && store.get(entity_type, &record.id)?.is_some() {
                log::debug!("Skipping existing {} {}", entity_type.as_str(), record.id);
                report.skipped += 1;
                continue;
            }
            store.create(record)?;
            report.created += 1;
        }
    }

    log::info!(
        "Imported {} records ({} already present)",
        report.created,
        report.skipped
    );
    Ok(report)
}

fn collection<'v>(root: &'v Map<String, Value>, entity_type: EntityType) -> Option<&'v Value> {
    root.iter()
        .find(|(key, _)| {
            let key = key
                .strip_prefix("uba-")
                .or_else(|| key.strip_prefix("uba_"))
                .unwrap_or(key);
            EntityType::from_str_lossy(key) == Some(entity_type)
        })
        .map(|(_, v)| v)
}

/// Map one exported object onto a canonical record. A missing id is left
/// blank so the store assigns one.
pub fn parse_record(entity_type: EntityType, value: &Value) -> Result<Record, ImportError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ImportError::Shape("record must be an object".to_string()))?;

    let now = Utc::now().to_rfc3339();
    let created_at = text(obj, &["createdAt", "created_at", "dateCreated"]).unwrap_or(now);
    let updated_at = text(obj, &["updatedAt", "updated_at", "lastModified"])
        .unwrap_or_else(|| created_at.clone());

    // `client` is sometimes the name and sometimes an embedded `{id, name}`.
    let (embedded_client_id, embedded_client_name) = match obj.get("client") {
        Some(Value::Object(inner)) => (text(inner, &["id"]), text(inner, &["name"])),
        _ => (None, None),
    };

    let id = text(obj, &["id", "_id", "uuid"]).unwrap_or_default();
    let mut record = Record::new(entity_type, id);
    record.name = match entity_type {
        EntityType::Client => text(obj, &["name", "clientName"]),
        EntityType::Project => text(obj, &["name", "projectName"]),
        _ => text(obj, &["name"]),
    };
    record.title = text(obj, &["title", "subject"]);
    record.label = text(obj, &["label"]);
    record.company = text(obj, &["company", "companyName", "organization"]);
    record.description = text(obj, &["description", "details"]);
    record.notes = text(obj, &["notes", "note"]);
    record.client_id =
        text(obj, &["clientId", "client_id", "clientID"]).or(embedded_client_id);
    record.project_id = text(obj, &["projectId", "project_id", "projectID"]);
    record.status = text(obj, &["status", "state"]);
    record.amount = number(obj, &["amount", "total", "value"]);
    record.due_date = text(obj, &["dueDate", "due_date", "due"]);
    record.linked_at = text(obj, &["linkedAt", "linked_at"]);
    record.last_activity_at = text(obj, &["lastActivityAt", "lastActivity", "last_activity_at"]);
    record.created_at = created_at;
    record.updated_at = updated_at;

    // On projects, invoices and tasks a name-like client field is the free
    // text client reference.
    if entity_type != EntityType::Client {
        record.client = text(obj, &["clientName", "client_name"])
            .or(embedded_client_name)
            .or_else(|| text(obj, &["client"]));
    }

    Ok(record)
}

/// First non-blank string (or number, stringified) under any of `keys`.
fn text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First numeric value under any of `keys`. Numeric strings such as
/// `"1,250.00"` are accepted.
fn number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse::<f64>().ok(),
        _ => None,
    })
}
