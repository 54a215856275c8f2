//! Workspace record abstraction.
//!
//! Clients own projects and invoices; projects own tasks and, optionally,
//! invoices. All four collections share the canonical `Record` shape so the
//! linking layer can read any of them through one store interface. Fields
//! that a collection does not use simply stay `None`.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// The collection a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Client,
    Project,
    Invoice,
    Task,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::Client,
        EntityType::Project,
        EntityType::Invoice,
        EntityType::Task,
    ];

    /// String label used in reports and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Client => "client",
            EntityType::Project => "project",
            EntityType::Invoice => "invoice",
            EntityType::Task => "task",
        }
    }

    /// SQL table / storage collection name.
    pub fn table(&self) -> &'static str {
        match self {
            EntityType::Client => "clients",
            EntityType::Project => "projects",
            EntityType::Invoice => "invoices",
            EntityType::Task => "tasks",
        }
    }

    /// Parse a singular label or a plural collection name.
    pub fn from_str_lossy(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "client" | "clients" => Some(EntityType::Client),
            "project" | "projects" => Some(EntityType::Project),
            "invoice" | "invoices" => Some(EntityType::Invoice),
            "task" | "tasks" => Some(EntityType::Task),
            _ => None,
        }
    }

    /// Owning foreign keys a record of this type may carry.
    pub fn foreign_keys(&self) -> &'static [ForeignKey] {
        match self {
            EntityType::Client => &[],
            EntityType::Project => &[ForeignKey::ClientId],
            EntityType::Invoice => &[ForeignKey::ClientId, ForeignKey::ProjectId],
            EntityType::Task => &[ForeignKey::ProjectId],
        }
    }
}

/// An owning relationship column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ForeignKey {
    ClientId,
    ProjectId,
}

impl ForeignKey {
    pub fn column(&self) -> &'static str {
        match self {
            ForeignKey::ClientId => "client_id",
            ForeignKey::ProjectId => "project_id",
        }
    }

    /// The collection the key points into.
    pub fn target(&self) -> EntityType {
        match self {
            ForeignKey::ClientId => EntityType::Client,
            ForeignKey::ProjectId => EntityType::Project,
        }
    }
}

/// Free-text fields the normalizer can read from a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Title,
    Name,
    Label,
    Company,
    Description,
    Notes,
    /// Client name typed directly on a project or invoice.
    Client,
}

/// A row from any of the `clients`, `projects`, `invoices` or `tasks` tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    pub entity_type: EntityType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Calendar date (YYYY-MM-DD) for invoices and tasks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    /// UTC timestamp of the last auto-link write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linked_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_activity_at: Option<String>,
}

impl Record {
    /// Empty record stamped with the current time.
    pub fn new(entity_type: EntityType, id: impl Into<String>) -> Self {
        let now = Utc::now().to_rfc3339();
        Self {
            id: id.into(),
            entity_type,
            name: None,
            title: None,
            label: None,
            company: None,
            description: None,
            notes: None,
            client: None,
            client_id: None,
            project_id: None,
            status: None,
            amount: None,
            due_date: None,
            created_at: now.clone(),
            updated_at: now,
            linked_at: None,
            last_activity_at: None,
        }
    }

    pub fn text(&self, field: TextField) -> Option<&str> {
        let value = match field {
            TextField::Title => &self.title,
            TextField::Name => &self.name,
            TextField::Label => &self.label,
            TextField::Company => &self.company,
            TextField::Description => &self.description,
            TextField::Notes => &self.notes,
            TextField::Client => &self.client,
        };
        value.as_deref()
    }

    pub fn foreign_key(&self, key: ForeignKey) -> Option<&str> {
        let value = match key {
            ForeignKey::ClientId => &self.client_id,
            ForeignKey::ProjectId => &self.project_id,
        };
        value.as_deref().filter(|v| !v.trim().is_empty())
    }

    /// Best human-facing label: name, then title, then label, then the id.
    pub fn display_name(&self) -> &str {
        [&self.name, &self.title, &self.label]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.trim().is_empty())
            .unwrap_or(&self.id)
    }

    /// Status compared case-insensitively; `None` when unset.
    pub fn status_is(&self, status: &str) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case(status))
    }

    /// Merge a patch into this record. Unset patch fields leave values alone.
    pub fn apply(&mut self, patch: &RecordPatch) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if let Some(v) = value {
                *slot = Some(v.clone());
            }
        }
        set(&mut self.name, &patch.name);
        set(&mut self.title, &patch.title);
        set(&mut self.label, &patch.label);
        set(&mut self.company, &patch.company);
        set(&mut self.description, &patch.description);
        set(&mut self.notes, &patch.notes);
        set(&mut self.client, &patch.client);
        set(&mut self.client_id, &patch.client_id);
        set(&mut self.project_id, &patch.project_id);
        set(&mut self.status, &patch.status);
        set(&mut self.amount, &patch.amount);
        set(&mut self.due_date, &patch.due_date);
        set(&mut self.linked_at, &patch.linked_at);
        set(&mut self.last_activity_at, &patch.last_activity_at);
        self.updated_at = Utc::now().to_rfc3339();
    }
}

/// Partial update for a record. `None` means "leave unchanged".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub name: Option<String>,
    pub title: Option<String>,
    pub label: Option<String>,
    pub company: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub client: Option<String>,
    pub client_id: Option<String>,
    pub project_id: Option<String>,
    pub status: Option<String>,
    pub amount: Option<f64>,
    pub due_date: Option<String>,
    pub linked_at: Option<String>,
    pub last_activity_at: Option<String>,
}

impl RecordPatch {
    /// Set one owning foreign key and stamp `linked_at`.
    pub fn link(key: ForeignKey, target_id: &str, linked_at: &str) -> Self {
        let mut patch = Self {
            linked_at: Some(linked_at.to_string()),
            ..Default::default()
        };
        match key {
            ForeignKey::ClientId => patch.client_id = Some(target_id.to_string()),
            ForeignKey::ProjectId => patch.project_id = Some(target_id.to_string()),
        }
        patch
    }

    /// Bump the activity timestamp only.
    pub fn activity(at: &str) -> Self {
        Self {
            last_activity_at: Some(at.to_string()),
            ..Default::default()
        }
    }
}
