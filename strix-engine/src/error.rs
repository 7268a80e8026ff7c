//! Error types for the dispatch engine

use thiserror::Error;
use uuid::Uuid;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Structured reason a plugin was refused for a job
///
/// Carried inside [`EngineError::PluginNotRunnable`] and surfaced verbatim to
/// the job submitter, so the frontend can say which plugin and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The plugin is disabled platform-wide
    Disabled,
    /// The plugin is disabled for the caller's organization
    DisabledForOrganization(Uuid),
    /// A required parameter has no resolvable value for the caller
    MissingParameter(String),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::Disabled => write!(f, "disabled"),
            RejectReason::DisabledForOrganization(org) => {
                write!(f, "disabled for organization {org}")
            }
            RejectReason::MissingParameter(name) => {
                write!(f, "required parameter `{name}` has no configured value")
            }
        }
    }
}

/// Engine error taxonomy
#[derive(Error, Debug)]
pub enum EngineError {
    /// No candidate value found through any precedence tier. Propagated only
    /// when the parameter is required; optional parameters are simply omitted.
    #[error("no value configured for parameter `{parameter}` of plugin `{plugin}`")]
    ParameterNotConfigured { plugin: String, parameter: String },

    /// Plugin refused for this job; never retried automatically
    #[error("plugin `{plugin}` is not runnable: {reason}")]
    PluginNotRunnable {
        plugin: String,
        reason: RejectReason,
    },

    /// Entry point missing from the handler registry; rejects that single
    /// plugin at registration, other plugins are unaffected
    #[error("entry point `{0}` is not registered")]
    EntryPointNotFound(String),

    /// Plugin name failed validation at registration
    #[error("invalid plugin name `{0}`")]
    InvalidPluginName(String),

    /// A plugin declared the same parameter twice
    #[error("plugin `{plugin}` declares parameter `{parameter}` more than once")]
    DuplicateParameter { plugin: String, parameter: String },

    /// Unknown plugin name at lookup time
    #[error("no plugin registered under `{0}`")]
    PluginNotFound(String),

    /// Unknown job id
    #[error("no job found with id {0}")]
    JobNotFound(Uuid),

    /// Status machine violation (backwards or out-of-order move)
    #[error("invalid job status transition {from} -> {to}")]
    InvalidTransition {
        from: strix_common::events::JobStatus,
        to: strix_common::events::JobStatus,
    },

    /// The worker-pool collaborator refused a descriptor
    #[error("task submission failed: {0}")]
    Submit(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Common(#[from] strix_common::Error),
}
