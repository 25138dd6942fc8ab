//! # API Shared
//!
//! Shared definitions for the DRC analyser APIs.
//!
//! Contains:
//! - Request and response bodies (`messages` module), re-exported at the crate root
//! - Shared services like `HealthService`
//!
//! Used by `api-rest` and the `drc` CLI.

pub mod health;
pub mod messages;

pub use health::HealthService;
pub use messages::*;
