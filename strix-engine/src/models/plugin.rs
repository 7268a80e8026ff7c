//! Plugin configurations

use super::parameter::Parameter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Category a plugin belongs to
///
/// One tagged enum instead of per-category config types; category-specific
/// behavior keys off the variant. Analyzers, connectors and visualizers each
/// form a pipeline stage; pivots run opportunistically between stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PluginKind {
    Analyzer,
    Connector,
    Visualizer,
    Pivot,
}

impl PluginKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PluginKind::Analyzer => "analyzer",
            PluginKind::Connector => "connector",
            PluginKind::Visualizer => "visualizer",
            PluginKind::Pivot => "pivot",
        }
    }
}

impl std::fmt::Display for PluginKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validate a plugin name at registration time
///
/// Names are identifiers: nonempty, at most 100 chars, ASCII alphanumeric
/// plus underscore.
pub fn validate_plugin_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 100
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A configured, loadable unit of work, identified by name
///
/// Queue and soft time limit are plain fields computed at load time; a config
/// change replaces the whole struct in the registry rather than invalidating
/// caches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Unique name, primary identity
    pub name: String,
    pub kind: PluginKind,
    #[serde(default)]
    pub description: String,
    /// Key into the handler registry naming the compiled-in execution unit
    pub entry_point: String,
    /// Disabled platform-wide
    #[serde(default)]
    pub disabled: bool,
    /// Organizations for which this plugin is individually disabled
    #[serde(default)]
    pub disabled_in_organizations: HashSet<Uuid>,
    /// Destination queue for built task descriptors
    pub queue: String,
    /// Soft time limit in seconds, enforced by the worker pool
    pub soft_time_limit: u64,
    pub parameters: Vec<Parameter>,
}

impl PluginConfig {
    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.required)
    }

    pub fn secret_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| p.is_secret)
    }

    /// Non-secret parameters, the ones a frontend may display
    pub fn visible_parameters(&self) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(|p| !p.is_secret)
    }

    pub fn is_disabled_for_org(&self, org: Uuid) -> bool {
        self.disabled_in_organizations.contains(&org)
    }
}
