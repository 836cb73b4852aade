//! Application layer - Use cases and business logic
//! 
//! This layer contains:
//! - Services: Command catalog, job bridge, action translation
//! - Messaging: Console input parsing, listener fan-out
//! - Session: The host session owning every registered capability
//! - Errors: Domain-specific errors

pub mod errors;
pub mod services;
pub mod messaging;
pub mod session;

pub use session::HostSession;
