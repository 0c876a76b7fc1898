//! Built-in detection plugins.
//!
//! Each module defines one plugin through the same [`Plugin`] builder
//! interface external plugins use. The roster covers platform identity
//! (`hostname`, `kernel`, `lsb`, `platform`) and the virtualization
//! classifier; `platform` depends on `lsb` attributes, giving the
//! dependency resolver a real edge to order.

pub mod hostname;
pub mod kernel;
pub mod lsb;
pub mod platform;
pub mod virtualization;

use crate::plugin::PluginRegistry;

/// A registry pre-loaded with every built-in plugin.
///
/// Built fresh per collection run; a malformed definition would land in
/// the registry's rejected list rather than aborting the others.
pub fn builtin_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();
    registry.load(hostname::plugin());
    registry.load(kernel::plugin());
    registry.load(lsb::plugin());
    registry.load(platform::plugin());
    registry.load(virtualization::plugin());
    registry
}
