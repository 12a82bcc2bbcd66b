//! Result type alias shared across the workspace.
//!
//! Defaults the error type to `AlertError`, so functions can simply return `Result<T>`.
use crate::error::AlertError;

/// Workspace-wide `Result` alias with `AlertError` as the default error.
pub type Result<T, E = AlertError> = std::result::Result<T, E>;
