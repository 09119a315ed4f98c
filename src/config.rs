//! Board settings loaded from TOML.
//!
//! Every section and field is optional; missing values fall back to the
//! compiled defaults. A missing file is not an error for
//! [`Settings::load_or_default`], but is for [`Settings::load`].

use crate::{
    domain::{BoardConfig, Lane, SortField, SortOrder, ViewQuery},
    error::{BoardError, Result},
};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Default capacity of the sync event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// `[sync]` section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncSettings {
    /// Re-fetch the canonical list after every confirmed move, even when the
    /// backend already answered with the full list
    pub refetch_after_move: bool,
    /// Best-effort refresh after create/update/delete
    pub refresh_after_write: bool,
    pub event_capacity: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            refetch_after_move: true,
            refresh_after_write: true,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// `[view]` section: the display sort a board opens with
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewSettings {
    pub sort: SortField,
    pub order: SortOrder,
}

impl ViewSettings {
    pub fn default_query(&self) -> ViewQuery {
        ViewQuery::default().sorted_by(self.sort, self.order)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub board: BoardConfig,
    pub sync: SyncSettings,
    pub view: ViewSettings,
}

impl Settings {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Loads settings from `path`; the file must exist
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "loading board settings");
        let contents = fs::read_to_string(path).await?;
        Self::from_toml_str(&contents)
    }

    /// Loads settings from `path`, using defaults when the file is absent
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match Self::load(path).await {
            Err(BoardError::IoError(err)) if err.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "settings file not found, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sync.event_capacity == 0 {
            return Err(BoardError::ConfigError(
                "sync.event_capacity must be greater than zero".to_string(),
            ));
        }

        let mut seen: Vec<Lane> = Vec::new();
        for col in &self.board.columns {
            if seen.contains(&col.lane) {
                return Err(BoardError::ConfigError(format!(
                    "lane {} is configured more than once",
                    col.lane.as_str()
                )));
            }
            if col.name.trim().is_empty() {
                return Err(BoardError::ConfigError(format!(
                    "column for lane {} has an empty name",
                    col.lane.as_str()
                )));
            }
            seen.push(col.lane);
        }
        Ok(())
    }
}
