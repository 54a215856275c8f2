//! Fuzzy record linking.
//!
//! Records that lack an owning foreign key (a project or invoice without a
//! client, a task or invoice without a project) are scored against every
//! candidate entity. The best candidate is auto-linked when it reaches the
//! threshold, kept as a suggestion when it clears the suggestion floor, and
//! otherwise ignored. Existing links are never overwritten.

pub mod mutator;
pub mod normalize;
pub mod policy;
pub mod scorer;

use serde::Serialize;

use crate::entity::{EntityType, ForeignKey, Record};
use crate::store::RecordStore;
use crate::types::LinkingConfig;

pub use normalize::normalize_text;
pub use policy::{decide, LinkDecision, Threshold};
pub use scorer::{Confidence, MatchCandidate, PreparedCandidate};

/// A below-threshold match surfaced for manual review.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkSuggestion {
    pub record_id: String,
    pub record_type: EntityType,
    pub record_name: String,
    pub candidate: MatchCandidate,
}

/// Outcome of one batch pass over a collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResult {
    pub linked_count: usize,
    pub suggestions: Vec<LinkSuggestion>,
}

/// Read a collection, treating a missing store or a read error as empty.
pub(crate) fn load_records(
    store: Option<&dyn RecordStore>,
    entity_type: EntityType,
) -> Vec<Record> {
    let Some(store) = store else {
        return Vec::new();
    };
    match store.get_all(entity_type) {
        Ok(records) => records,
        Err(e) => {
            log::warn!("Failed to load {}: {}", entity_type.table(), e);
            Vec::new()
        }
    }
}

/// Link every record in `entity_type` that lacks `key` to its best candidate.
pub(crate) fn link_pass(
    store: &dyn RecordStore,
    entity_type: EntityType,
    key: ForeignKey,
    candidates: &[PreparedCandidate],
    threshold: Threshold,
    config: &LinkingConfig,
) -> LinkResult {
    let mut result = LinkResult::default();
    if candidates.is_empty() {
        return result;
    }

    let records = load_records(Some(store), entity_type);
    for record in records.iter().filter(|r| r.foreign_key(key).is_none()) {
        let haystack = normalize_text(record, &config.text_fields);
        let best = scorer::best_candidate(&haystack, candidates);
        log::debug!(
            "{} {}: best {} candidate {:?}",
            entity_type.as_str(),
            record.id,
            key.target().as_str(),
            best.as_ref().map(|m| (&m.entity_id, m.score))
        );

        match decide(best, threshold, config.suggestion_floor) {
            LinkDecision::AutoLink(candidate) => {
                let target = &candidate.entity_id;
                match mutator::link_record(store, entity_type, &record.id, key, target) {
                    Ok(true) => {
                        log::info!(
                            "Auto-linked {} {} to {} {} (score {:.2})",
                            entity_type.as_str(),
                            record.id,
                            candidate.entity_type.as_str(),
                            candidate.entity_id,
                            candidate.score
                        );
                        result.linked_count += 1;
                    }
                    Ok(false) => {}
                    Err(e) => log::warn!(
                        "Failed to link {} {}: {}",
                        entity_type.as_str(),
                        record.id,
                        e
                    ),
                }
            }
            LinkDecision::Suggest(candidate) => result.suggestions.push(LinkSuggestion {
                record_id: record.id.clone(),
                record_type: entity_type,
                record_name: record.display_name().to_string(),
                candidate,
            }),
            LinkDecision::Ignore => {}
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn named(entity_type: EntityType, id: &str, name: &str) -> Record {
        let mut r = Record::new(entity_type, id);
        r.name = Some(name.to_string());
        r
    }

    #[test]
    fn test_link_pass_links_and_suggests() {
        let mut strong = Record::new(EntityType::Task, "t1");
        strong.title = Some("Brand Refresh: homepage hero".to_string());
        let mut weak = Record::new(EntityType::Task, "t2");
        weak.title = Some("Refresh the hero banner copy".to_string());
        let mut done = Record::new(EntityType::Task, "t3");
        done.title = Some("Brand Refresh kickoff".to_string());
        done.project_id = Some("p-old".to_string());

        let project = named(EntityType::Project, "p1", "Brand Refresh");
        let store = MemoryStore::from_records(vec![project.clone(), strong, weak, done]);
        let candidates = scorer::prepare_candidates(&[project]);

        let result = link_pass(
            &store,
            EntityType::Task,
            ForeignKey::ProjectId,
            &candidates,
            Threshold::DEFAULT,
            &LinkingConfig::default(),
        );

        assert_eq!(result.linked_count, 1);
        assert_eq!(result.suggestions.len(), 1);
        assert_eq!(result.suggestions[0].record_id, "t2");
        assert_eq!(result.suggestions[0].candidate.entity_id, "p1");

        let t1 = store.get(EntityType::Task, "t1").unwrap().unwrap();
        assert_eq!(t1.project_id.as_deref(), Some("p1"));
        let t3 = store.get(EntityType::Task, "t3").unwrap().unwrap();
        assert_eq!(t3.project_id.as_deref(), Some("p-old"));
    }

    #[test]
    fn test_link_pass_without_candidates_is_empty() {
        let store = MemoryStore::from_records(vec![Record::new(EntityType::Task, "t1")]);
        let result = link_pass(
            &store,
            EntityType::Task,
            ForeignKey::ProjectId,
            &[],
            Threshold::DEFAULT,
            &LinkingConfig::default(),
        );
        assert_eq!(result, LinkResult::default());
    }

    #[test]
    fn test_load_records_without_store() {
        assert!(load_records(None, EntityType::Client).is_empty());
    }
}
