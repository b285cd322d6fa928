//! Authenticated encryption of token strings.
//!
//! AES-256-GCM, 96-bit random IV per call, no associated data. Not
//! configurable.

mod payload;
mod service;

pub use payload::*;
pub use service::*;
