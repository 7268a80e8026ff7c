//! Plugin configuration registry
//!
//! Plugin definitions are registered at startup from a declarative TOML
//! manifest and held in memory (read-frequently, write-rarely). Each entry is
//! validated independently: a bad entry rejects that plugin and leaves its
//! siblings untouched.
//!
//! Validation policy, deliberately asymmetric:
//! - an entry point missing from the handler registry REJECTS the plugin;
//! - a queue missing from the configured queue set only logs a warning and
//!   falls back to the default queue.

use crate::directory::Directory;
use crate::error::{EngineError, RejectReason};
use crate::handlers::HandlerRegistry;
use crate::models::{validate_plugin_name, Parameter, PluginConfig, PluginKind};
use crate::resolver::ParameterResolver;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// One plugin definition as written in the manifest
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub kind: PluginKind,
    pub entry_point: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub disabled: bool,
    /// Absent means "use the default queue"
    pub queue: Option<String>,
    /// Absent means the settings' default soft time limit
    pub soft_time_limit: Option<u64>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Deployment manifest: the full plugin catalogue
#[derive(Debug, Clone, Deserialize)]
pub struct PluginManifest {
    #[serde(default)]
    pub plugins: Vec<ManifestEntry>,
}

impl PluginManifest {
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        toml::from_str(toml_str).map_err(|e| {
            EngineError::Common(strix_common::Error::Config(format!(
                "plugin manifest: {e}"
            )))
        })
    }
}

/// Holds plugin definitions and answers runnability questions
pub struct PluginConfigRegistry {
    plugins: RwLock<HashMap<String, PluginConfig>>,
    handlers: HandlerRegistry,
    resolver: ParameterResolver,
    directory: Arc<dyn Directory>,
    settings: strix_common::config::EngineSettings,
}

impl PluginConfigRegistry {
    pub fn new(
        handlers: HandlerRegistry,
        resolver: ParameterResolver,
        directory: Arc<dyn Directory>,
        settings: strix_common::config::EngineSettings,
    ) -> Self {
        Self {
            plugins: RwLock::new(HashMap::new()),
            handlers,
            resolver,
            directory,
            settings,
        }
    }

    /// Register every entry of a manifest
    ///
    /// Returns how many plugins were accepted. Rejected entries are logged
    /// and skipped; they never abort the rest of the manifest.
    pub fn load_manifest(&self, manifest: &PluginManifest) -> usize {
        let mut accepted = 0;
        for entry in &manifest.plugins {
            match self.register(entry.clone()) {
                Ok(()) => accepted += 1,
                Err(e) => {
                    tracing::error!(plugin = %entry.name, error = %e, "Plugin registration rejected");
                }
            }
        }
        tracing::info!(
            accepted,
            total = manifest.plugins.len(),
            "Plugin manifest loaded"
        );
        accepted
    }

    /// Validate and register one plugin definition
    pub fn register(&self, entry: ManifestEntry) -> Result<(), EngineError> {
        if !validate_plugin_name(&entry.name) {
            return Err(EngineError::InvalidPluginName(entry.name));
        }
        if !self.handlers.contains(&entry.entry_point) {
            return Err(EngineError::EntryPointNotFound(entry.entry_point));
        }

        let mut seen = HashSet::new();
        for parameter in &entry.parameters {
            if !seen.insert(parameter.name.as_str()) {
                return Err(EngineError::DuplicateParameter {
                    plugin: entry.name,
                    parameter: parameter.name.clone(),
                });
            }
        }

        let queues = &self.settings.queue;
        let queue = match entry.queue {
            Some(queue) if queues.is_valid(&queue) => queue,
            Some(queue) => {
                tracing::warn!(
                    plugin = %entry.name,
                    queue = %queue,
                    fallback = %queues.default_queue,
                    "Plugin declares an unknown queue, falling back to the default"
                );
                queues.default_queue.clone()
            }
            None => queues.default_queue.clone(),
        };

        let config = PluginConfig {
            name: entry.name,
            kind: entry.kind,
            description: entry.description,
            entry_point: entry.entry_point,
            disabled: entry.disabled,
            disabled_in_organizations: HashSet::new(),
            queue,
            soft_time_limit: entry
                .soft_time_limit
                .unwrap_or(self.settings.task.default_soft_time_limit),
            parameters: entry.parameters,
        };

        tracing::debug!(plugin = %config.name, kind = %config.kind, "Plugin registered");
        self.plugins
            .write()
            .expect("registry lock poisoned")
            .insert(config.name.clone(), config);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<PluginConfig> {
        self.plugins
            .read()
            .expect("registry lock poisoned")
            .get(name)
            .cloned()
    }

    /// All plugins of one category, ordered by name
    pub fn of_kind(&self, kind: PluginKind) -> Vec<PluginConfig> {
        let mut plugins: Vec<PluginConfig> = self
            .plugins
            .read()
            .expect("registry lock poisoned")
            .values()
            .filter(|p| p.kind == kind)
            .cloned()
            .collect();
        plugins.sort_by(|a, b| a.name.cmp(&b.name));
        plugins
    }

    /// Why this plugin would be refused for this user, if it would be
    ///
    /// `None` means runnable. Checks, in order: the global disabled flag,
    /// the per-organization disable set, then every required parameter for a
    /// stored value (runtime overrides are per-job and deliberately not
    /// consulted here).
    pub async fn reject_reason(
        &self,
        plugin: &PluginConfig,
        user: Option<Uuid>,
    ) -> Result<Option<RejectReason>, EngineError> {
        if plugin.disabled {
            return Ok(Some(RejectReason::Disabled));
        }

        if let Some(user) = user {
            if let Some(membership) = self.directory.membership(user) {
                if plugin.is_disabled_for_org(membership.organization) {
                    return Ok(Some(RejectReason::DisabledForOrganization(
                        membership.organization,
                    )));
                }
            }
        }

        for parameter in plugin.required_parameters() {
            if !self.resolver.has_stored_value(plugin, parameter, user).await? {
                return Ok(Some(RejectReason::MissingParameter(parameter.name.clone())));
            }
        }

        Ok(None)
    }

    /// Whether the plugin may run for this user right now
    ///
    /// An unknown plugin name is simply not runnable. A missing required
    /// parameter is a normal "no", not an error.
    pub async fn is_runnable(&self, name: &str, user: Option<Uuid>) -> Result<bool, EngineError> {
        let Some(plugin) = self.get(name) else {
            return Ok(false);
        };
        Ok(self.reject_reason(&plugin, user).await?.is_none())
    }

    /// The plugins of one category that are runnable for this user
    pub async fn runnable(
        &self,
        kind: PluginKind,
        user: Option<Uuid>,
    ) -> Result<Vec<PluginConfig>, EngineError> {
        let mut result = Vec::new();
        for plugin in self.of_kind(kind) {
            if self.reject_reason(&plugin, user).await?.is_none() {
                result.push(plugin);
            }
        }
        Ok(result)
    }

    /// Administrative toggle of the global disabled flag
    pub fn set_disabled(&self, name: &str, disabled: bool) -> Result<(), EngineError> {
        let mut plugins = self.plugins.write().expect("registry lock poisoned");
        let plugin = plugins
            .get_mut(name)
            .ok_or_else(|| EngineError::PluginNotFound(name.to_string()))?;
        plugin.disabled = disabled;
        tracing::info!(plugin = %name, disabled, "Plugin disabled flag changed");
        Ok(())
    }

    /// Administrative per-organization disable/enable
    pub fn set_disabled_for_org(
        &self,
        name: &str,
        org: Uuid,
        disabled: bool,
    ) -> Result<(), EngineError> {
        let mut plugins = self.plugins.write().expect("registry lock poisoned");
        let plugin = plugins
            .get_mut(name)
            .ok_or_else(|| EngineError::PluginNotFound(name.to_string()))?;
        if disabled {
            plugin.disabled_in_organizations.insert(org);
        } else {
            plugin.disabled_in_organizations.remove(&org);
        }
        tracing::info!(plugin = %name, organization = %org, disabled, "Per-organization disable changed");
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.plugins.read().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
