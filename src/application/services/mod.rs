//! Application services - Plugin capabilities wired to the host

pub mod command_catalog;
pub mod event_translator;
pub mod job_bridge;

pub use command_catalog::{CommandCatalog, CommandGroup, ADMIN_REFUSAL, EMPTY_REPLY};
pub use event_translator::EventTranslator;
pub use job_bridge::{JobBridge, JobRecord};
