//! Task and invoice to project auto-linking.

use serde::Serialize;

use crate::entity::{EntityType, ForeignKey, Record};
use crate::linking::{
    self, load_records, normalize_text, scorer, LinkResult, MatchCandidate, Threshold,
};
use crate::store::RecordStore;
use crate::types::LinkingConfig;

/// Per-collection results of `ProjectLinking::auto_link_all`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectLinkReport {
    pub tasks: LinkResult,
    pub invoices: LinkResult,
}

pub struct ProjectLinking<'a> {
    store: Option<&'a dyn RecordStore>,
    config: LinkingConfig,
}

impl<'a> ProjectLinking<'a> {
    pub fn new(store: Option<&'a dyn RecordStore>, config: LinkingConfig) -> Self {
        Self { store, config }
    }

    fn candidates(&self) -> Vec<scorer::PreparedCandidate> {
        scorer::prepare_candidates(&load_records(self.store, EntityType::Project))
    }

    /// Best project for a record at the configured auto-link threshold.
    pub fn find_best_project(&self, record: &Record) -> Option<MatchCandidate> {
        let haystack = normalize_text(record, &self.config.text_fields);
        scorer::find_best_match(
            &haystack,
            &self.candidates(),
            Threshold::new(self.config.auto_link_threshold).value(),
        )
    }

    /// Ranked projects for a record, same floor and cap as client suggestions.
    pub fn suggest_project_matches(&self, record: &Record) -> Vec<MatchCandidate> {
        let haystack = normalize_text(record, &self.config.text_fields);
        scorer::rank_candidates(&haystack, &self.candidates())
            .into_iter()
            .filter(|m| m.score >= self.config.suggestion_floor)
            .take(self.config.suggestion_limit())
            .collect()
    }

    /// Link every record in `collection` that has no `project_id`. Only
    /// collections that carry a project key (tasks, invoices) are accepted;
    /// anything else yields an empty result.
    pub fn auto_link_to_projects(
        &self,
        collection: EntityType,
        threshold: Threshold,
    ) -> LinkResult {
        if !collection.foreign_keys().contains(&ForeignKey::ProjectId) {
            log::warn!(
                "{} records cannot be linked to projects",
                collection.as_str()
            );
            return LinkResult::default();
        }
        let Some(store) = self.store else {
            return LinkResult::default();
        };

        let result = linking::link_pass(
            store,
            collection,
            ForeignKey::ProjectId,
            &self.candidates(),
            threshold,
            &self.config,
        );
        log::info!(
            "Project auto-link ({}): {} linked, {} suggestions",
            collection.table(),
            result.linked_count,
            result.suggestions.len()
        );
        result
    }

    /// Tasks first, then invoices.
    pub fn auto_link_all(&self, threshold: Threshold) -> ProjectLinkReport {
        ProjectLinkReport {
            tasks: self.auto_link_to_projects(EntityType::Task, threshold),
            invoices: self.auto_link_to_projects(EntityType::Invoice, threshold),
        }
    }
}
