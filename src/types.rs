use serde::{Deserialize, Serialize};

use crate::entity::TextField;

/// Fields read by the text normalizer when none are configured.
pub const DEFAULT_TEXT_FIELDS: [TextField; 6] = [
    TextField::Title,
    TextField::Name,
    TextField::Label,
    TextField::Description,
    TextField::Notes,
    TextField::Client,
];

/// Hard cap on suggestions returned per record.
pub const MAX_SUGGESTIONS: usize = 3;

/// Top-level configuration, stored at `~/.uba/config.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_workspace")]
    pub workspace: String,
    /// Explicit database file. Defaults to `~/.uba/<workspace>.db`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default)]
    pub linking: LinkingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            database_path: None,
            linking: LinkingConfig::default(),
        }
    }
}

fn default_workspace() -> String {
    "default".to_string()
}

/// Tuning for the record matcher. All scores are on the 0–1 scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkingConfig {
    /// Best-candidate score at or above which a record is auto-linked.
    #[serde(default = "default_auto_link_threshold")]
    pub auto_link_threshold: f64,
    /// Scores below the auto-link threshold but at or above this floor are
    /// kept as suggestions for manual review.
    #[serde(default = "default_suggestion_floor")]
    pub suggestion_floor: f64,
    #[serde(default = "default_max_suggestions")]
    pub max_suggestions: usize,
    #[serde(default = "default_text_fields")]
    pub text_fields: Vec<TextField>,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            auto_link_threshold: default_auto_link_threshold(),
            suggestion_floor: default_suggestion_floor(),
            max_suggestions: default_max_suggestions(),
            text_fields: default_text_fields(),
        }
    }
}

impl LinkingConfig {
    /// `max_suggestions`, never above [`MAX_SUGGESTIONS`].
    pub fn suggestion_limit(&self) -> usize {
        self.max_suggestions.min(MAX_SUGGESTIONS)
    }
}

fn default_auto_link_threshold() -> f64 {
    0.6
}

fn default_suggestion_floor() -> f64 {
    0.3
}

fn default_max_suggestions() -> usize {
    MAX_SUGGESTIONS
}

fn default_text_fields() -> Vec<TextField> {
    DEFAULT_TEXT_FIELDS.to_vec()
}
