//! Client relationships: per-client rollups, orphan detection, client match
//! suggestions and the batch client auto-link pass.
//!
//! Every read goes through an optional `RecordStore`. A missing store or a
//! failed read is logged and treated as "no data", so these calls never fail.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::{EntityType, ForeignKey, Record};
use crate::helpers::resolve_client_name;
use crate::linking::{
    self, load_records, normalize_text, scorer, LinkResult, LinkSuggestion, MatchCandidate,
    Threshold,
};
use crate::store::RecordStore;
use crate::types::LinkingConfig;
use crate::util::{parse_date, parse_timestamp};

/// Days since last activity that still count as highly engaged.
const HIGH_ENGAGEMENT_DAYS: i64 = 14;

/// Days since last activity that still count as moderately engaged.
const MEDIUM_ENGAGEMENT_DAYS: i64 = 45;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientSummary {
    pub client: Record,
    pub projects: Vec<Record>,
    pub invoices: Vec<Record>,
    pub metrics: ClientMetrics,
    pub engagement: Engagement,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientMetrics {
    pub total_projects: usize,
    pub active_projects: usize,
    pub completed_projects: usize,
    /// Sum over invoices that are neither drafts nor cancelled.
    pub total_invoiced: f64,
    pub total_paid: f64,
    pub outstanding: f64,
    pub overdue_invoices: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementLevel {
    High,
    Medium,
    Low,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Engagement {
    pub level: EngagementLevel,
    pub last_activity: Option<String>,
}

/// Projects and invoices with no resolvable client.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrphanedRecords {
    pub projects: Vec<Record>,
    pub invoices: Vec<Record>,
}

/// Counts from a client auto-link pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoLinkReport {
    pub projects: usize,
    pub invoices: usize,
    pub suggestions: Vec<LinkSuggestion>,
}

pub struct ClientRelationships<'a> {
    store: Option<&'a dyn RecordStore>,
    config: LinkingConfig,
}

impl<'a> ClientRelationships<'a> {
    pub fn new(store: Option<&'a dyn RecordStore>, config: LinkingConfig) -> Self {
        Self { store, config }
    }

    /// Client record plus its projects, invoices, money rollups and an
    /// engagement level. `None` when the client does not exist.
    pub fn get_client_summary(&self, client_id: &str) -> Option<ClientSummary> {
        self.get_client_summary_at(client_id, Utc::now())
    }

    pub fn get_client_summary_at(
        &self,
        client_id: &str,
        now: DateTime<Utc>,
    ) -> Option<ClientSummary> {
        let store = self.store?;
        let client = match store.get(EntityType::Client, client_id) {
            Ok(Some(client)) => client,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Failed to load client {}: {}", client_id, e);
                return None;
            }
        };

        let clients = load_records(self.store, EntityType::Client);
        let projects: Vec<Record> = load_records(self.store, EntityType::Project)
            .into_iter()
            .filter(|p| belongs_to_client(p, &client, &clients))
            .collect();
        let project_ids: HashSet<&str> = projects.iter().map(|p| p.id.as_str()).collect();

        let invoices: Vec<Record> = load_records(self.store, EntityType::Invoice)
            .into_iter()
            .filter(|i| {
                belongs_to_client(i, &client, &clients)
                    || (i.foreign_key(ForeignKey::ClientId).is_none()
                        && i
                            .foreign_key(ForeignKey::ProjectId)
                            .is_some_and(|pid| project_ids.contains(pid)))
            })
            .collect();

        let metrics = compute_metrics(&projects, &invoices, now);
        let engagement = compute_engagement(&client, &projects, &invoices, now);

        Some(ClientSummary {
            client,
            projects,
            invoices,
            metrics,
            engagement,
        })
    }

    /// Projects and invoices whose `client_id` does not resolve to an
    /// existing client and whose free-text client name resolves to no
    /// single client.
    pub fn find_orphaned_records(&self) -> OrphanedRecords {
        let clients = load_records(self.store, EntityType::Client);
        let client_ids: HashSet<&str> = clients.iter().map(|c| c.id.as_str()).collect();

        let is_orphan = |record: &Record| {
            let linked = record
                .foreign_key(ForeignKey::ClientId)
                .is_some_and(|id| client_ids.contains(id));
            let named = record
                .client
                .as_deref()
                .and_then(|name| resolve_client_name(name, &clients))
                .is_some();
            !linked && !named
        };

        OrphanedRecords {
            projects: load_records(self.store, EntityType::Project)
                .into_iter()
                .filter(|r| is_orphan(r))
                .collect(),
            invoices: load_records(self.store, EntityType::Invoice)
                .into_iter()
                .filter(|r| is_orphan(r))
                .collect(),
        }
    }

    /// Up to `max_suggestions` clients for a record, best first. Only
    /// candidates at or above the suggestion floor are returned.
    /// `entity_type` names the record's collection; collections without a
    /// client key get nothing.
    pub fn suggest_client_matches(
        &self,
        record: &Record,
        entity_type: EntityType,
    ) -> Vec<MatchCandidate> {
        if !entity_type.foreign_keys().contains(&ForeignKey::ClientId) {
            return Vec::new();
        }
        let clients = load_records(self.store, EntityType::Client);
        let candidates = scorer::prepare_candidates(&clients);
        let haystack = normalize_text(record, &self.config.text_fields);

        scorer::rank_candidates(&haystack, &candidates)
            .into_iter()
            .filter(|m| m.score >= self.config.suggestion_floor)
            .take(self.config.suggestion_limit())
            .collect()
    }

    /// Link unlinked projects and invoices to clients. Records that already
    /// have a `client_id` are never touched.
    pub fn auto_link_records(&self, threshold: Threshold) -> AutoLinkReport {
        let Some(store) = self.store else {
            return AutoLinkReport::default();
        };
        let clients = load_records(self.store, EntityType::Client);
        if clients.is_empty() {
            return AutoLinkReport::default();
        }
        let candidates = scorer::prepare_candidates(&clients);

        let projects: LinkResult = linking::link_pass(
            store,
            EntityType::Project,
            ForeignKey::ClientId,
            &candidates,
            threshold,
            &self.config,
        );
        let invoices: LinkResult = linking::link_pass(
            store,
            EntityType::Invoice,
            ForeignKey::ClientId,
            &candidates,
            threshold,
            &self.config,
        );

        log::info!(
            "Client auto-link: {} projects, {} invoices linked, {} suggestions",
            projects.linked_count,
            invoices.linked_count,
            projects.suggestions.len() + invoices.suggestions.len()
        );

        let mut suggestions = projects.suggestions;
        suggestions.extend(invoices.suggestions);
        AutoLinkReport {
            projects: projects.linked_count,
            invoices: invoices.linked_count,
            suggestions,
        }
    }
}

/// Explicit `client_id`, or no `client_id` and a free-text name that
/// resolves to this client and no other.
fn belongs_to_client(record: &Record, client: &Record, clients: &[Record]) -> bool {
    match record.foreign_key(ForeignKey::ClientId) {
        Some(id) => id == client.id,
        None => record
            .client
            .as_deref()
            .and_then(|name| resolve_client_name(name, clients))
            .is_some_and(|resolved| resolved.id == client.id),
    }
}

fn is_active_project(project: &Record) -> bool {
    ["active", "in_progress", "in-progress"]
        .iter()
        .any(|s| project.status_is(s))
}

fn is_completed_project(project: &Record) -> bool {
    project.status_is("completed") || project.status_is("done")
}

fn is_billable(invoice: &Record) -> bool {
    !["draft", "cancelled", "canceled", "void"]
        .iter()
        .any(|s| invoice.status_is(s))
}

fn compute_metrics(projects: &[Record], invoices: &[Record], now: DateTime<Utc>) -> ClientMetrics {
    let today = now.date_naive();
    let mut metrics = ClientMetrics {
        total_projects: projects.len(),
        active_projects: projects.iter().filter(|p| is_active_project(p)).count(),
        completed_projects: projects.iter().filter(|p| is_completed_project(p)).count(),
        ..Default::default()
    };

    for invoice in invoices.iter().filter(|i| is_billable(i)) {
        let amount = invoice.amount.unwrap_or(0.0);
        metrics.total_invoiced += amount;
        if invoice.status_is("paid") {
            metrics.total_paid += amount;
            continue;
        }
        metrics.outstanding += amount;
        let past_due = invoice
            .due_date
            .as_deref()
            .and_then(parse_date)
            .is_some_and(|due| due < today);
        if invoice.status_is("overdue") || past_due {
            metrics.overdue_invoices += 1;
        }
    }

    metrics
}

fn compute_engagement(
    client: &Record,
    projects: &[Record],
    invoices: &[Record],
    now: DateTime<Utc>,
) -> Engagement {
    let last = std::iter::once(client)
        .chain(projects)
        .chain(invoices)
        .flat_map(|r| [r.last_activity_at.as_deref(), Some(r.updated_at.as_str())])
        .flatten()
        .filter_map(parse_timestamp)
        .max();

    let Some(last) = last else {
        return Engagement {
            level: EngagementLevel::Inactive,
            last_activity: None,
        };
    };

    let days = (now - last).num_days();
    let level = if days <= HIGH_ENGAGEMENT_DAYS {
        EngagementLevel::High
    } else if days <= MEDIUM_ENGAGEMENT_DAYS {
        EngagementLevel::Medium
    } else {
        EngagementLevel::Low
    };

    Engagement {
        level,
        last_activity: Some(last.to_rfc3339()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const OLD: &str = "2025-01-01T00:00:00+00:00";

    fn now() -> DateTime<Utc> {
        parse_timestamp("2026-03-15T12:00:00Z").unwrap()
    }

    fn record(entity_type: EntityType, id: &str) -> Record {
        let mut r = Record::new(entity_type, id);
        r.created_at = OLD.to_string();
        r.updated_at = OLD.to_string();
        r
    }

    fn client(id: &str, name: &str) -> Record {
        let mut r = record(EntityType::Client, id);
        r.name = Some(name.to_string());
        r
    }

    fn project(id: &str, name: &str, client_id: Option<&str>, status: &str) -> Record {
        let mut r = record(EntityType::Project, id);
        r.name = Some(name.to_string());
        r.client_id = client_id.map(String::from);
        r.status = Some(status.to_string());
        r
    }

    fn invoice(id: &str, title: &str, amount: f64, status: &str, due: &str) -> Record {
        let mut r = record(EntityType::Invoice, id);
        r.title = Some(title.to_string());
        r.amount = Some(amount);
        r.status = Some(status.to_string());
        r.due_date = Some(due.to_string());
        r
    }

    fn service(store: &MemoryStore) -> ClientRelationships<'_> {
        ClientRelationships::new(Some(store), LinkingConfig::default())
    }

    #[test]
    fn test_summary_collects_linked_and_named_records() {
        let mut named_project = project("p2", "Spring catalogue", None, "completed");
        named_project.client = Some("ACME corp".to_string());
        let mut paid = invoice("i1", "Jan retainer", 1000.0, "paid", "2026-01-31");
        paid.client_id = Some("c1".to_string());
        let mut overdue = invoice("i2", "Feb retainer", 400.0, "sent", "2026-02-28");
        overdue.client_id = Some("c1".to_string());
        let mut via_project = invoice("i3", "Catalogue print run", 250.0, "sent", "2026-04-30");
        via_project.project_id = Some("p2".to_string());
        let mut draft = invoice("i4", "Draft", 999.0, "draft", "2026-01-01");
        draft.client_id = Some("c1".to_string());
        let other = invoice("i5", "Globex work", 50.0, "sent", "2026-01-01");

        let store = MemoryStore::from_records(vec![
            client("c1", "Acme Corp"),
            client("c2", "Globex"),
            project("p1", "Website", Some("c1"), "active"),
            named_project,
            project("p3", "Globex intranet", Some("c2"), "active"),
            paid,
            overdue,
            via_project,
            draft,
            other,
        ]);

        let summary = service(&store)
            .get_client_summary_at("c1", now())
            .expect("client exists");
        let project_ids: Vec<&str> = summary.projects.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(project_ids, vec!["p1", "p2"]);
        let invoice_ids: Vec<&str> = summary.invoices.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(invoice_ids, vec!["i1", "i2", "i3", "i4"]);

        let m = &summary.metrics;
        assert_eq!(m.total_projects, 2);
        assert_eq!(m.active_projects, 1);
        assert_eq!(m.completed_projects, 1);
        assert_eq!(m.total_invoiced, 1650.0);
        assert_eq!(m.total_paid, 1000.0);
        assert_eq!(m.outstanding, 650.0);
        assert_eq!(m.overdue_invoices, 1);
        assert_eq!(summary.engagement.level, EngagementLevel::Low);
    }

    #[test]
    fn test_engagement_levels() {
        let mut recent = client("c1", "Acme");
        recent.last_activity_at = Some("2026-03-10T00:00:00Z".to_string());
        let mut medium = client("c2", "Globex");
        medium.last_activity_at = Some("2026-02-10T00:00:00Z".to_string());
        let mut unknown = client("c3", "Initech");
        unknown.updated_at = "not a date".to_string();
        let store = MemoryStore::from_records(vec![recent, medium, unknown]);
        let svc = service(&store);

        let level = |id: &str| svc.get_client_summary_at(id, now()).unwrap().engagement.level;
        assert_eq!(level("c1"), EngagementLevel::High);
        assert_eq!(level("c2"), EngagementLevel::Medium);
        assert_eq!(level("c3"), EngagementLevel::Inactive);
    }

    #[test]
    fn test_summary_missing_client_or_store() {
        let store = MemoryStore::new();
        assert!(service(&store).get_client_summary("nope").is_none());
        let detached = ClientRelationships::new(None, LinkingConfig::default());
        assert!(detached.get_client_summary("c1").is_none());
    }

    #[test]
    fn test_find_orphaned_records() {
        let mut named = project("p2", "Named", None, "active");
        named.client = Some("Acme Corp.".to_string());
        let mut dangling = invoice("i1", "Dangling", 10.0, "sent", "2026-01-01");
        dangling.client_id = Some("deleted-client".to_string());
        let mut linked = invoice("i2", "Linked", 10.0, "sent", "2026-01-01");
        linked.client_id = Some("c1".to_string());

        let store = MemoryStore::from_records(vec![
            client("c1", "Acme Corp"),
            project("p1", "Linked", Some("c1"), "active"),
            named,
            project("p3", "Nobody's", None, "active"),
            dangling,
            linked,
        ]);

        let orphans = service(&store).find_orphaned_records();
        let project_ids: Vec<&str> = orphans.projects.iter().map(|p| p.id.as_str()).collect();
        let invoice_ids: Vec<&str> = orphans.invoices.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(project_ids, vec!["p3"]);
        assert_eq!(invoice_ids, vec!["i1"]);
    }

    #[test]
    fn test_named_records_count_for_one_client_only() {
        let mut named = project("p1", "Clinic signage", None, "active");
        named.client = Some("Smith Dental".to_string());
        let mut bill = invoice("i1", "Signage", 500.0, "sent", "2026-04-30");
        bill.client = Some("Smith Dental".to_string());
        let store = MemoryStore::from_records(vec![
            client("c1", "Smith Design"),
            client("c2", "Smith Dental"),
            named,
            bill,
        ]);
        let svc = service(&store);

        let dental = svc.get_client_summary_at("c2", now()).unwrap();
        assert_eq!(dental.metrics.total_projects, 1);
        assert_eq!(dental.metrics.outstanding, 500.0);
        let design = svc.get_client_summary_at("c1", now()).unwrap();
        assert_eq!(design.metrics.total_projects, 0);
        assert!(design.invoices.is_empty());
        assert_eq!(design.metrics.outstanding, 0.0);
    }

    #[test]
    fn test_ambiguous_name_is_orphaned() {
        let mut ambiguous = project("p1", "Shared name", None, "active");
        ambiguous.client = Some("Acme Corp".to_string());
        let mut twin = client("c2", "Globex");
        twin.company = Some("Acme Corp".to_string());
        let store = MemoryStore::from_records(vec![client("c1", "Acme Corp"), twin, ambiguous]);
        let svc = service(&store);

        let orphans = svc.find_orphaned_records();
        assert_eq!(orphans.projects.len(), 1);
        assert!(svc.get_client_summary_at("c1", now()).unwrap().projects.is_empty());
        assert!(svc.get_client_summary_at("c2", now()).unwrap().projects.is_empty());
    }

    #[test]
    fn test_suggest_client_matches_top_three_descending() {
        let store = MemoryStore::from_records(vec![
            client("c1", "Acme"),
            client("c2", "Acme Corp"),
            client("c3", "Acme Corp Holdings"),
            client("c4", "Acme Corp Holdings International"),
            client("c5", "Globex"),
        ]);
        let mut inv = record(EntityType::Invoice, "i1");
        inv.title = Some("Acme Corp Holdings International - Q1 retainer".to_string());

        let matches = service(&store).suggest_client_matches(&inv, EntityType::Invoice);
        assert_eq!(matches.len(), 3);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(matches[0].entity_id, "c4");
        assert!(matches.iter().all(|m| m.entity_id != "c5"));
    }

    #[test]
    fn test_suggest_for_clients_is_empty() {
        let store = MemoryStore::from_records(vec![client("c1", "Acme")]);
        let other = client("c2", "Acme");
        assert!(service(&store)
            .suggest_client_matches(&other, EntityType::Client)
            .is_empty());
    }

    #[test]
    fn test_auto_link_records_never_overwrites() {
        let mut unlinked = project("p1", "TechCorp Solutions onboarding", None, "active");
        unlinked.description = Some("Kickoff and discovery".to_string());
        let already = project("p2", "TechCorp Solutions audit", Some("c-other"), "active");
        let title = "Invoice for TechCorp Solutions monthly retainer";
        let inv = invoice("i1", title, 500.0, "sent", "2026-04-01");
        let store = MemoryStore::from_records(vec![
            client("c1", "TechCorp Solutions"),
            unlinked,
            already,
            inv,
        ]);

        let report = service(&store).auto_link_records(Threshold::DEFAULT);
        assert_eq!(report.projects, 1);
        assert_eq!(report.invoices, 1);

        let p2 = store.get(EntityType::Project, "p2").unwrap().unwrap();
        assert_eq!(p2.client_id.as_deref(), Some("c-other"));
        let p1 = store.get(EntityType::Project, "p1").unwrap().unwrap();
        assert_eq!(p1.client_id.as_deref(), Some("c1"));

        let again = service(&store).auto_link_records(Threshold::DEFAULT);
        assert_eq!((again.projects, again.invoices), (0, 0));
    }

    #[test]
    fn test_auto_link_without_clients_or_store() {
        let store = MemoryStore::from_records(vec![project("p1", "Anything", None, "active")]);
        assert_eq!(
            service(&store).auto_link_records(Threshold::DEFAULT),
            AutoLinkReport::default()
        );
        let detached = ClientRelationships::new(None, LinkingConfig::default());
        assert_eq!(
            detached.auto_link_records(Threshold::DEFAULT),
            AutoLinkReport::default()
        );
    }
}
