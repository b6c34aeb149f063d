//! Engine configuration.
//!
//! Every field has a default, so an empty JSON object (or no file at all) is
//! a valid configuration.

use std::path::Path;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// How therapist exceptions interact with absences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExceptionPolicy {
    /// Exceptions are stored but do not influence availability.
    #[default]
    Ignore,
    /// An absence does not block a slot that an exception for the same day
    /// covers entirely.
    Relieve,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Time zone used to resolve "today" and stored instants.
    pub timezone: Tz,
    /// Calendar days scanned by the suggestion search when no end date is
    /// given.
    pub max_search_days: u32,
    /// Date-keyed absences older than this many months are pruned whenever a
    /// therapist's absences are rewritten.
    pub absence_retention_months: u32,
    pub exception_policy: ExceptionPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timezone: chrono_tz::Europe::Berlin,
            max_search_days: 60,
            absence_retention_months: 1,
            exception_policy: ExceptionPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(content)
            .map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.max_search_days == 0 {
            return Err(EngineError::Config(
                "max_search_days must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
