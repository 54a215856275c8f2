//! Configuration loading and the composition root that owns the workspace
//! store. Services borrow from `AppState`; nothing is global.

use std::fs;
use std::path::{Path, PathBuf};

use crate::db::WorkspaceDb;
use crate::project_linking::ProjectLinking;
use crate::relationships::ClientRelationships;
use crate::store::RecordStore;
use crate::types::{Config, MAX_SUGGESTIONS};

/// Owns the loaded config and the (optional) workspace database.
pub struct AppState {
    pub config: Config,
    pub db: Option<WorkspaceDb>,
}

impl AppState {
    /// Open the database the config points at. A database that fails to
    /// open is logged and left out; linking then degrades to empty results.
    pub fn with_config(config: Config) -> Self {
        let db = match database_path(&config).and_then(|path| {
            WorkspaceDb::open_at(path).map_err(|e| e.to_string())
        }) {
            Ok(db) => Some(db),
            Err(e) => {
                log::warn!("Failed to open workspace database: {e}. Linking disabled.");
                None
            }
        };
        Self { config, db }
    }

    pub fn from_parts(config: Config, db: Option<WorkspaceDb>) -> Self {
        Self { config, db }
    }

    pub fn store(&self) -> Option<&dyn RecordStore> {
        self.db.as_ref().map(|db| db as &dyn RecordStore)
    }

    pub fn relationships(&self) -> ClientRelationships<'_> {
        ClientRelationships::new(self.store(), self.config.linking.clone())
    }

    pub fn project_linking(&self) -> ProjectLinking<'_> {
        ProjectLinking::new(self.store(), self.config.linking.clone())
    }
}

/// Get the canonical config file path (~/.uba/config.json)
pub fn config_path() -> Result<PathBuf, String> {
    let home = dirs::home_dir().ok_or("Could not find home directory")?;
    Ok(home.join(".uba").join("config.json"))
}

/// Resolve the database file for a config: explicit `databasePath`, else
/// `~/.uba/<workspace>.db`.
pub fn database_path(config: &Config) -> Result<PathBuf, String> {
    match config.database_path.as_deref().map(str::trim) {
        Some(path) if !path.is_empty() => Ok(PathBuf::from(path)),
        _ => WorkspaceDb::db_path(&config.workspace).map_err(|e| e.to_string()),
    }
}

/// Load configuration from ~/.uba/config.json
pub fn load_config() -> Result<Config, String> {
    load_config_from(&config_path()?)
}

/// Load configuration from an explicit file.
pub fn load_config_from(path: &Path) -> Result<Config, String> {
    if !path.exists() {
        return Err(format!(
            "Config file not found at {}. Create it with: {{ \"workspace\": \"my-business\" }}",
            path.display()
        ));
    }

    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read config: {}", e))?;

    let config: Config =
        serde_json::from_str(&content).map_err(|e| format!("Failed to parse config: {}", e))?;

    validate_config(&config)?;
    Ok(config)
}

/// Load the config, falling back to defaults when it is missing or invalid.
pub fn load_config_or_default() -> Config {
    match load_config() {
        Ok(config) => config,
        Err(e) => {
            log::info!("Using default config: {}", e);
            Config::default()
        }
    }
}

fn validate_config(config: &Config) -> Result<(), String> {
    let linking = &config.linking;
    for (label, value) in [
        ("autoLinkThreshold", linking.auto_link_threshold),
        ("suggestionFloor", linking.suggestion_floor),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(format!("{label} must be between 0 and 1, got {value}"));
        }
    }
    if linking.suggestion_floor > linking.auto_link_threshold {
        return Err(format!(
            "suggestionFloor ({}) must not exceed autoLinkThreshold ({})",
            linking.suggestion_floor, linking.auto_link_threshold
        ));
    }
    if !(1..=MAX_SUGGESTIONS).contains(&linking.max_suggestions) {
        return Err(format!(
            "maxSuggestions must be between 1 and {MAX_SUGGESTIONS}, got {}",
            linking.max_suggestions
        ));
    }
    Ok(())
}
