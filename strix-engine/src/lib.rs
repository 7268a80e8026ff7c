//! # Strix Engine
//!
//! Plugin configuration and execution-dispatch core for the Strix threat
//! intelligence platform. The engine decides which configuration value each
//! plugin parameter receives for a given job and user, whether a plugin is
//! currently runnable, and builds the task descriptors handed to the
//! distributed worker pool.
//!
//! The engine is a library: no HTTP surface, no CLI. The web application
//! submits jobs through [`coordinator::JobPipelineCoordinator`]; worker
//! processes execute descriptors and feed terminal reports back in.
//!
//! # Module map
//! - [`models`] — plugins, parameters, jobs, task descriptors, reports
//! - [`store`] — scoped parameter values (user / organization / default)
//! - [`registry`] — plugin definitions, manifest loading, runnability
//! - [`resolver`] — parameter precedence algorithm
//! - [`dispatch`] — task signature building
//! - [`coordinator`] — per-job stage sequencing
//! - [`submit`], [`directory`], [`handlers`] — seams to external collaborators

pub mod coordinator;
pub mod db;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod resolver;
pub mod store;
pub mod submit;

pub use error::{EngineError, RejectReason};
pub use models::{Job, Parameter, PluginConfig, PluginKind, TaskDescriptor};
