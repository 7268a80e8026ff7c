//! Database plumbing: schema initialization and row mapping
//!
//! The engine treats sqlite as a plain relational store; no transaction
//! semantics beyond single-row atomicity are relied on.

pub mod init;
pub mod jobs;
pub mod reports;

pub use init::{init_database, init_memory};
