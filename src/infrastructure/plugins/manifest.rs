//! Plugin capability metadata - the records returned by `--commands`, `--jobs` and `--listeners`

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;

use crate::application::errors::{ConfigError, ProtocolError};
use crate::domain::entities::OptionKind;

/// Argument types a plugin may declare
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgumentType {
    String,
    Int,
    Bool,
    User,
    Channel,
    Role,
    Mentionable,
    Float,
}

impl ArgumentType {
    pub const ALL: [ArgumentType; 8] = [
        ArgumentType::String,
        ArgumentType::Int,
        ArgumentType::Bool,
        ArgumentType::User,
        ArgumentType::Channel,
        ArgumentType::Role,
        ArgumentType::Mentionable,
        ArgumentType::Float,
    ];

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == token)
    }

    pub fn as_str(&self) -> &str {
        match self {
            ArgumentType::String => "string",
            ArgumentType::Int => "int",
            ArgumentType::Bool => "bool",
            ArgumentType::User => "user",
            ArgumentType::Channel => "channel",
            ArgumentType::Role => "role",
            ArgumentType::Mentionable => "mentionable",
            ArgumentType::Float => "float",
        }
    }

    pub fn option_kind(&self) -> OptionKind {
        match self {
            ArgumentType::String => OptionKind::String,
            ArgumentType::Int => OptionKind::Integer,
            ArgumentType::Bool => OptionKind::Boolean,
            ArgumentType::User => OptionKind::User,
            ArgumentType::Channel => OptionKind::Channel,
            ArgumentType::Role => OptionKind::Role,
            ArgumentType::Mentionable => OptionKind::Mentionable,
            ArgumentType::Float => OptionKind::Number,
        }
    }

    /// JSON value for a declared default; falls back to the raw string when it does not parse
    pub fn coerce_default(&self, default: &str) -> Value {
        self.option_kind()
            .parse_value(default)
            .unwrap_or_else(|| Value::String(default.to_string()))
    }
}

/// One argument of a plugin command
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentSpec {
    pub name: String,
    pub description: String,
    pub kind: ArgumentType,
    pub optional: bool,
    pub default: Option<String>,
}

/// A command declared by a plugin
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    pub name: String,
    pub description: String,
    pub admin: bool,
    pub args: Vec<ArgumentSpec>,
}

/// A job that runs on a cron schedule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobSpec {
    pub name: String,
    pub schedule: String,
}

/// A listener triggered by every guild message
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenerSpec {
    pub name: String,
}

#[derive(Deserialize)]
struct RawArgument {
    name: String,
    description: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    optional: bool,
    default: Option<Value>,
}

#[derive(Deserialize)]
struct RawCommand {
    name: String,
    description: String,
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    args: Vec<RawArgument>,
}

impl CommandSpec {
    /// Validate one untrusted command record
    pub fn from_value(value: Value) -> Result<Self, ConfigError> {
        let raw: RawCommand =
            serde_json::from_value(value).map_err(|e| ConfigError::InvalidCommand(e.to_string()))?;

        if raw.name.trim().is_empty() {
            return Err(ConfigError::InvalidCommand("empty command name".to_string()));
        }

        let mut seen = HashSet::new();
        let mut args = Vec::with_capacity(raw.args.len());

        for arg in raw.args {
            if !seen.insert(arg.name.clone()) {
                return Err(ConfigError::DuplicateArgument {
                    command: raw.name,
                    argument: arg.name,
                });
            }

            let kind = match arg.kind.as_deref() {
                None => ArgumentType::String,
                Some(token) => ArgumentType::parse(token).ok_or_else(|| ConfigError::InvalidArgumentType {
                    command: raw.name.clone(),
                    argument: arg.name.clone(),
                    kind: token.to_string(),
                })?,
            };

            let default = match arg.default {
                None | Some(Value::Null) => None,
                Some(Value::String(s)) => Some(s),
                Some(other @ (Value::Number(_) | Value::Bool(_))) => Some(other.to_string()),
                Some(other) => {
                    return Err(ConfigError::InvalidCommand(format!(
                        "default for argument '{}' of command '{}' must be a scalar, got {}",
                        arg.name, raw.name, other
                    )))
                }
            };

            args.push(ArgumentSpec {
                name: arg.name,
                description: arg.description,
                kind,
                optional: arg.optional,
                default,
            });
        }

        Ok(Self {
            name: raw.name,
            description: raw.description,
            admin: raw.admin,
            args,
        })
    }
}

/// Split a metadata reply into its JSON records
pub fn parse_records(verb: &str, raw: &str) -> Result<Vec<Value>, ProtocolError> {
    serde_json::from_str(raw).map_err(|source| ProtocolError::Json {
        verb: verb.to_string(),
        source,
    })
}

/// Split a `--version` reply into `(name, version)`
pub fn split_version(version: &str) -> Result<(&str, &str), ProtocolError> {
    let version = version.trim();
    let mut parts = version.splitn(2, char::is_whitespace);

    match (parts.next(), parts.next()) {
        (Some(name), Some(rest)) if !name.is_empty() && !rest.trim().is_empty() => Ok((name, rest.trim())),
        _ => Err(ProtocolError::Version(version.to_string())),
    }
}
