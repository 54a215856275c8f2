//! Record linking for the UBA business workspace.
//!
//! Projects, invoices and tasks are often created without the foreign key
//! that ties them to a client or project. This crate scores them against the
//! existing clients and projects, writes links it is confident about, and
//! reports the rest as suggestions or orphans.

pub mod db;
pub mod entity;
pub mod error;
pub mod helpers;
pub mod import;
pub mod linking;
mod migrations;
pub mod project_linking;
pub mod relationships;
pub mod repair;
pub mod state;
pub mod store;
pub mod types;
pub mod util;

pub use entity::{EntityType, ForeignKey, Record, RecordPatch, TextField};
pub use error::{ImportError, StoreError};
pub use linking::{Confidence, LinkResult, LinkSuggestion, MatchCandidate, Threshold};
pub use project_linking::{ProjectLinkReport, ProjectLinking};
pub use relationships::{
    AutoLinkReport, ClientMetrics, ClientRelationships, ClientSummary, Engagement,
    EngagementLevel, OrphanedRecords,
};
pub use store::{MemoryStore, RecordStore};
