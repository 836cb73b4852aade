//! Infrastructure layer - External concerns
//! 
//! This layer contains:
//! - Config: Configuration loading
//! - Plugins: Plugin processes and their capabilities
//! - Scheduler: Cron triggers for plugin jobs
//! - Adapters: Host integrations (console)

pub mod config;
pub mod plugins;
pub mod scheduler;
pub mod adapters;
