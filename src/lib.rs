//! casper7 - a chat bot whose features come from external plugin executables

pub mod domain;
pub mod application;
pub mod infrastructure;
