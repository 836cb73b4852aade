//! Domain entities - Core business objects with no external dependencies

pub mod action;
pub mod command;
pub mod context;
pub mod message;

pub use action::Action;
pub use command::{Command, CommandInvocation, CommandOption, OptionKind};
pub use context::InvocationContext;
pub use message::GuildMessage;
