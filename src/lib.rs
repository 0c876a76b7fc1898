//! recon - Host fact gathering with dependency-aware detection plugins.
//!
//! recon discovers properties of the host it runs on — operating system
//! identity, virtualization role, kernel and hostname facts — by running a
//! set of independent detection plugins. Each plugin inspects a file or an
//! external command's output and records findings into a shared
//! hierarchical attribute tree; a dependency-aware scheduler guarantees
//! that a plugin reading another's attributes runs after its provider.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`engine`] - Dependency resolution, scheduling, and the collection run
//! - [`error`] - Error types and result aliases
//! - [`output`] - JSON rendering and attribute lookups over snapshots
//! - [`plugin`] - The plugin definition interface and per-run registry
//! - [`plugins`] - Built-in detection plugins
//! - [`shell`] - External command execution and platform identification
//! - [`tree`] - The hierarchical attribute store
//!
//! # Example
//!
//! ```
//! use recon::engine::Collector;
//! use recon::plugin::{Plugin, PluginRegistry};
//! use recon::shell::{Platform, ScriptedRunner};
//!
//! let mut registry = PluginRegistry::new();
//! registry.load(
//!     Plugin::builder("greeter")
//!         .provides("greeter")
//!         .body(|ctx| ctx.set("greeter.hello", "world"))
//!         .build(),
//! );
//!
//! let runner = ScriptedRunner::new();
//! let report = Collector::new(registry, &runner)
//!     .with_platform(Platform::Linux)
//!     .run();
//! assert!(report.is_complete());
//! ```

pub mod cli;
pub mod engine;
pub mod error;
pub mod output;
pub mod plugin;
pub mod plugins;
pub mod shell;
pub mod tree;

pub use error::{ReconError, Result};
