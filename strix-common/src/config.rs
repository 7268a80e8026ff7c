//! Settings loading for the dispatch core
//!
//! Queue topology and task limits are deployment-level settings, loaded once
//! at startup. Resolution priority order:
//! 1. Explicit path handed in by the caller (highest priority)
//! 2. `STRIX_CONFIG` environment variable
//! 3. Platform config directory (`<config>/strix/config.toml`)
//! 4. Compiled defaults (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Queue the worker pool consumes when a plugin does not name a valid one
pub const DEFAULT_QUEUE: &str = "default";

/// Soft time limit (seconds) applied when a plugin declares none
pub const DEFAULT_SOFT_TIME_LIMIT: u64 = 60;

/// Soft time limit (seconds) for stage-transition tasks; these only flip a
/// status and must never occupy a worker for long
pub const TRANSITION_SOFT_TIME_LIMIT: u64 = 10;

/// Queue topology known to the worker pool
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    /// Queue used whenever a plugin's declared queue is absent from `queues`
    pub default_queue: String,
    /// Queues the worker pool actually consumes
    pub queues: Vec<String>,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            default_queue: DEFAULT_QUEUE.to_string(),
            queues: vec![DEFAULT_QUEUE.to_string(), "long".to_string()],
        }
    }
}

impl QueueSettings {
    /// Whether `queue` is one the worker pool consumes
    pub fn is_valid(&self, queue: &str) -> bool {
        self.queues.iter().any(|q| q == queue)
    }
}

/// Time limits applied to built task descriptors
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskSettings {
    /// Applied when a plugin declares no soft time limit
    pub default_soft_time_limit: u64,
    /// Fixed limit for stage-transition descriptors
    pub transition_soft_time_limit: u64,
}

impl Default for TaskSettings {
    fn default() -> Self {
        Self {
            default_soft_time_limit: DEFAULT_SOFT_TIME_LIMIT,
            transition_soft_time_limit: TRANSITION_SOFT_TIME_LIMIT,
        }
    }
}

/// Engine-wide settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSettings {
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub task: TaskSettings,
}

impl EngineSettings {
    /// Load settings following the priority order in the module docs
    ///
    /// A missing file is not an error: the compiled defaults apply, with a
    /// warning. A file that exists but does not parse is an error.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        // Priority 1: explicit path
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        // Priority 2: environment variable
        if let Ok(path) = std::env::var("STRIX_CONFIG") {
            return Self::from_file(Path::new(&path));
        }

        // Priority 3: platform config directory
        if let Some(path) = default_config_path() {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        // Priority 4: compiled defaults
        tracing::warn!("No settings file found, using compiled defaults");
        Ok(Self::default())
    }

    /// Parse a TOML settings file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: EngineSettings = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.queue.queues.is_empty() {
            return Err(Error::Config("queue.queues must not be empty".to_string()));
        }
        if !self.queue.is_valid(&self.queue.default_queue) {
            return Err(Error::Config(format!(
                "default queue `{}` is not in queue.queues",
                self.queue.default_queue
            )));
        }
        Ok(())
    }
}

/// Default settings file location for the platform
fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("strix").join("config.toml"))
}
