//! Parameter precedence
//!
//! For each `(parameter, job)` pair, strict precedence with first match wins:
//! 1. runtime override supplied with the job
//! 2. value stored by the requesting user
//! 3. value shared by the user's organization
//! 4. system default value
//! 5. `ParameterNotConfigured`
//!
//! Each tier lookup is an independent, idempotent query: a value appearing
//! or disappearing between tiers is tolerated, and each parameter is
//! resolved exactly once per `read_params` call.

use crate::directory::Directory;
use crate::error::EngineError;
use crate::models::{Job, Parameter, PluginConfig};
use crate::store::ParameterStore;
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

/// Applies the precedence algorithm per parameter per job
#[derive(Clone)]
pub struct ParameterResolver {
    store: ParameterStore,
    directory: Arc<dyn Directory>,
}

impl ParameterResolver {
    pub fn new(store: ParameterStore, directory: Arc<dyn Directory>) -> Self {
        Self { store, directory }
    }

    /// Resolve one parameter for one job
    pub async fn resolve(
        &self,
        plugin: &PluginConfig,
        parameter: &Parameter,
        job: &Job,
    ) -> Result<serde_json::Value, EngineError> {
        // Tier 1: runtime override, used verbatim with no store lookup
        if let Some(value) = job.runtime_value(&plugin.name, &parameter.name) {
            tracing::debug!(
                plugin = %plugin.name,
                parameter = %parameter.name,
                "Resolved from runtime configuration"
            );
            return Ok(value.clone());
        }

        match self.stored_value(plugin, parameter, job.user).await? {
            Some(value) => Ok(value),
            None => Err(EngineError::ParameterNotConfigured {
                plugin: plugin.name.clone(),
                parameter: parameter.name.clone(),
            }),
        }
    }

    /// Tiers 2-4: the stored candidates, without runtime overrides
    ///
    /// Runnability checks use this directly: a plugin is configured for a
    /// user based on what the store holds, independent of any one job.
    pub async fn stored_value(
        &self,
        plugin: &PluginConfig,
        parameter: &Parameter,
        user: Option<Uuid>,
    ) -> Result<Option<serde_json::Value>, EngineError> {
        // Tier 2: the user's own value
        if let Some(user) = user {
            if let Some(value) = self
                .store
                .user_value(user, &plugin.name, &parameter.name)
                .await?
            {
                tracing::debug!(
                    plugin = %plugin.name,
                    parameter = %parameter.name,
                    "Resolved from value owned by the user"
                );
                return Ok(Some(value));
            }

            // Tier 3: the organization's shared value
            if let Some(membership) = self.directory.membership(user) {
                if let Some(value) = self
                    .store
                    .org_value(membership.organization, &plugin.name, &parameter.name)
                    .await?
                {
                    tracing::debug!(
                        plugin = %plugin.name,
                        parameter = %parameter.name,
                        organization = %membership.organization,
                        "Resolved from value owned by the organization"
                    );
                    return Ok(Some(value));
                }
            }
        }

        // Tier 4: system default
        if let Some(value) = self
            .store
            .default_value(&plugin.name, &parameter.name)
            .await?
        {
            tracing::debug!(
                plugin = %plugin.name,
                parameter = %parameter.name,
                "Resolved from default value"
            );
            return Ok(Some(value));
        }

        Ok(None)
    }

    /// Whether any stored tier can supply this parameter for this user
    pub async fn has_stored_value(
        &self,
        plugin: &PluginConfig,
        parameter: &Parameter,
        user: Option<Uuid>,
    ) -> Result<bool, EngineError> {
        Ok(self.stored_value(plugin, parameter, user).await?.is_some())
    }

    /// Resolve every declared parameter of a plugin for a job
    ///
    /// A required parameter that fails resolution propagates
    /// [`EngineError::ParameterNotConfigured`]; optional parameters that fail
    /// are omitted from the result.
    pub async fn read_params(
        &self,
        plugin: &PluginConfig,
        job: &Job,
    ) -> Result<BTreeMap<String, serde_json::Value>, EngineError> {
        let mut resolved = BTreeMap::new();
        for parameter in &plugin.parameters {
            match self.resolve(plugin, parameter, job).await {
                Ok(value) => {
                    resolved.insert(parameter.name.clone(), value);
                }
                Err(EngineError::ParameterNotConfigured { .. }) if !parameter.required => {
                    tracing::debug!(
                        plugin = %plugin.name,
                        parameter = %parameter.name,
                        "Optional parameter not configured, omitted"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Ok(resolved)
    }
}
