//! Plugin system for casper7
//!
//! Plugins are external executables. Each one is asked for its version, commands,
//! jobs and listeners, then invoked once per trigger as a fresh process.

pub mod cache;
pub mod handle;
pub mod manifest;
pub mod registry;

pub use cache::{CapabilityCache, UNKNOWN_VERSION};
pub use handle::{Plugin, PluginDefinition, PluginHandle};
pub use manifest::{ArgumentSpec, ArgumentType, CommandSpec, JobSpec, ListenerSpec};
pub use registry::{LoadedPlugin, PluginRegistry, PluginSource};
