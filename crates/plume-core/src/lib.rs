//! # Plume Core
//!
//! Core types shared by every Plume crate: the unified error taxonomy,
//! result aliases and tracing initialisation.

pub mod error;
pub mod result;
pub mod telemetry;

pub use error::*;
pub use result::*;
pub use telemetry::*;

// Re-export shaku for dependency injection
pub use shaku::Interface;
