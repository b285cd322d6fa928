//! Process-wide symmetric key provisioning.

mod provider;

pub use provider::*;
