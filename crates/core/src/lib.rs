//! gitfleet core - pure domain logic with no process or filesystem access.
//!
//! Repository identity and URL parsing, branch metadata parsing, status and
//! result models, branch lifecycle policy, and the ports (traits) through
//! which adapters run git and the GitHub CLI.

pub mod app;
pub mod domain;
pub mod error;
pub mod ports;

// Re-exports for ergonomics
pub use domain::*;
pub use error::*;
