//! Error types for recon operations.
//!
//! This module defines [`ReconError`], the primary error type used throughout
//! the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - `CommandUnavailable` is the benign case: a probe source (binary or file)
//!   does not exist on this host. Plugins treat it as "does not apply" and
//!   simply leave their attributes absent.
//! - Everything else raised inside a plugin body is contained at the plugin
//!   boundary by the scheduler; it never aborts the collection run.
//! - Use `anyhow::Error` (via `ReconError::Other`) for unexpected errors.

use thiserror::Error;

/// Core error type for recon operations.
#[derive(Debug, Error)]
pub enum ReconError {
    /// A probe binary or file does not exist on this host. Non-fatal:
    /// the plugin leaves its attributes absent.
    #[error("Command or file unavailable: {command}")]
    CommandUnavailable { command: String },

    /// An external command ran but exited non-zero.
    #[error("Command failed with exit code {code:?}: {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// An external command exceeded its deadline and was killed.
    #[error("Command timed out: {command}")]
    CommandTimedOut { command: String },

    /// Unexpected error inside a plugin body.
    #[error("Plugin '{plugin}' failed: {message}")]
    PluginFailed { plugin: String, message: String },

    /// Plugin dependency cycle detected; no safe execution order exists
    /// for the named plugins.
    #[error("Dependency cycle detected: {cycle}")]
    DependencyCycle { cycle: String },

    /// A plugin wrote outside its declared provides namespaces.
    #[error("Plugin '{plugin}' wrote outside its provides set: {path}")]
    ProvidesViolation { plugin: String, path: String },

    /// A plugin definition was malformed and rejected at load time.
    #[error("Invalid plugin '{plugin}': {message}")]
    InvalidPlugin { plugin: String, message: String },

    /// An attribute path could not be parsed.
    #[error("Invalid attribute path: '{path}'")]
    InvalidPath { path: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReconError {
    /// Whether this error is the benign "source does not exist" case.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, ReconError::CommandUnavailable { .. })
    }
}

/// Result type alias for recon operations.
pub type Result<T> = std::result::Result<T, ReconError>;
