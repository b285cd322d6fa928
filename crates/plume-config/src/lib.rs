//! # Plume Config
//!
//! Configuration management for Plume.
//! Supports layered configuration from files, `.env` and environment
//! variables, with fail-fast validation and runtime reload.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
