//! One full repair pass: optional legacy import, client linking, project
//! linking, and an optional orphan report. Used by the
//! `repair_record_linking` binary.

use std::path::PathBuf;

use serde::Serialize;

use crate::db::CollectionCounts;
use crate::entity::EntityType;
use crate::error::ImportError;
use crate::import::{import_file, ImportReport};
use crate::linking::{load_records, Threshold};
use crate::project_linking::{ProjectLinkReport, ProjectLinking};
use crate::relationships::{AutoLinkReport, ClientRelationships, OrphanedRecords};
use crate::store::RecordStore;
use crate::types::LinkingConfig;

#[derive(Debug, Clone, Default)]
pub struct RepairOptions {
    pub import: Option<PathBuf>,
    /// Overrides `linking.autoLinkThreshold` when set.
    pub threshold: Option<Threshold>,
    pub orphans: bool,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairReport {
    pub dry_run: bool,
    pub threshold: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imported: Option<ImportReport>,
    pub clients: AutoLinkReport,
    pub projects: ProjectLinkReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub orphans: Option<OrphanedRecords>,
    /// Record counts after the pass.
    pub totals: CollectionCounts,
}

fn collection_counts(store: &dyn RecordStore) -> CollectionCounts {
    let count = |entity_type| load_records(Some(store), entity_type).len();
    CollectionCounts {
        clients: count(EntityType::Client),
        projects: count(EntityType::Project),
        invoices: count(EntityType::Invoice),
        tasks: count(EntityType::Task),
    }
}

/// Run every pass against `store`. Client links are made before project
/// links; the two never write the same key. Only an import failure aborts.
pub fn run_repair(
    store: &dyn RecordStore,
    config: &LinkingConfig,
    options: &RepairOptions,
) -> Result<RepairReport, ImportError> {
    let threshold = options
        .threshold
        .unwrap_or_else(|| Threshold::new(config.auto_link_threshold));

    let imported = match &options.import {
        Some(path) => {
            log::info!("Importing legacy export from {}", path.display());
            Some(import_file(store, path)?)
        }
        None => None,
    };

    let relationships = ClientRelationships::new(Some(store), config.clone());
    let clients = relationships.auto_link_records(threshold);
    let projects = ProjectLinking::new(Some(store), config.clone()).auto_link_all(threshold);
    let orphans = options
        .orphans
        .then(|| relationships.find_orphaned_records());

    Ok(RepairReport {
        dry_run: options.dry_run,
        threshold: threshold.value(),
        imported,
        clients,
        projects,
        orphans,
        totals: collection_counts(store),
    })
}
