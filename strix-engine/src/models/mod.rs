//! Data model for the dispatch engine

mod job;
mod parameter;
mod plugin;
mod report;
mod task;

pub use job::{Job, RuntimeConfiguration};
pub use parameter::{ParamKind, Parameter, ParameterValue, ValueScope};
pub use plugin::{validate_plugin_name, PluginConfig, PluginKind};
pub use report::TaskReport;
pub use task::{TaskArgs, TaskDescriptor};

// Status enums are shared with the services through strix-common
pub use strix_common::events::{JobStatus, ReportStatus};
