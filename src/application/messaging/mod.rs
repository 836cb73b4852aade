//! Message handling - console input parsing and listener fan-out

pub mod listener_bus;
pub mod parser;

pub use listener_bus::{ListenerBus, ListenerRecord};
pub use parser::{Inbound, MessageParser, ParsedCommand};
