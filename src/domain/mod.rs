//! Domain layer - Core business objects with no process or platform dependencies
//!
//! This layer contains:
//! - Entities: Invocation context, actions, messages, host command schemas
//! - Traits: Abstractions for the chat platform (Host)

pub mod entities;
pub mod traits;
