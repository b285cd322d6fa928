//! Result type alias for Plume.

use crate::PlumeError;

/// A specialized `Result` type for Plume operations.
pub type PlumeResult<T> = Result<T, PlumeError>;
