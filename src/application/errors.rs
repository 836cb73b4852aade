//! Application layer errors

use std::time::Duration;
use thiserror::Error;

/// General bot errors
#[derive(Error, Debug)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of a single plugin process invocation
#[derive(Error, Debug)]
pub enum PluginError {
    #[error("Command \"{command}\" could not be started: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command \"{command}\" failed: {status}")]
    Exit {
        command: String,
        status: std::process::ExitStatus,
    },

    #[error("Command \"{command}\" timed out after {after:?}")]
    Timeout { command: String, after: Duration },

    #[error("Command \"{command}\" has no executable")]
    EmptyCommandLine { command: String },

    #[error("Invocation pool closed")]
    PoolClosed,
}

/// Malformed output from a plugin
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid JSON from {verb}: {source}")]
    Json {
        verb: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid version line: {0:?}")]
    Version(String),
}

/// Plugin or bot configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid argument type '{kind}' for argument '{argument}' of command '{command}'")]
    InvalidArgumentType {
        command: String,
        argument: String,
        kind: String,
    },

    #[error("Invalid command definition: {0}")]
    InvalidCommand(String),

    #[error("Argument '{argument}' declared twice in command '{command}'")]
    DuplicateArgument { command: String, argument: String },

    #[error("Plugin '{0}' is already registered")]
    DuplicatePlugin(String),

    #[error("Command '{0}' is already registered")]
    DuplicateCommand(String),

    #[error("Job '{0}' is already scheduled")]
    DuplicateJob(String),

    #[error("Invalid schedule '{schedule}' for job '{job}': {reason}")]
    InvalidSchedule {
        job: String,
        schedule: String,
        reason: String,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Host action API errors
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Request rejected: {0}")]
    Rejected(String),
}

/// Command execution errors
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("Command not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(#[from] PluginError),
}

pub type PluginResult<T> = Result<T, PluginError>;
