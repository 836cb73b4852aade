use serde_json::{Map, Number, Value};

/// Host-side option kinds a slash command parameter can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionKind {
    String,
    Integer,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Number,
}

impl OptionKind {
    pub fn as_str(&self) -> &str {
        match self {
            OptionKind::String => "string",
            OptionKind::Integer => "integer",
            OptionKind::Boolean => "boolean",
            OptionKind::User => "user",
            OptionKind::Channel => "channel",
            OptionKind::Role => "role",
            OptionKind::Mentionable => "mentionable",
            OptionKind::Number => "number",
        }
    }

    /// Convert a textual option value into the JSON value a plugin receives.
    ///
    /// Users, channels, roles and mentionables resolve to their id; mention
    /// syntax such as `<@123>` or `<#123>` is accepted.
    pub fn parse_value(&self, raw: &str) -> Option<Value> {
        let raw = raw.trim();
        match self {
            OptionKind::String => Some(Value::String(raw.to_string())),
            OptionKind::Integer => raw.parse::<i64>().ok().map(Value::from),
            OptionKind::Boolean => raw.parse::<bool>().ok().map(Value::Bool),
            OptionKind::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            OptionKind::User | OptionKind::Channel | OptionKind::Role | OptionKind::Mentionable => raw
                .trim_start_matches(['<', '@', '#', '&', '!'])
                .trim_end_matches('>')
                .parse::<u64>()
                .ok()
                .map(Value::from),
        }
    }
}

/// A parameter of a host command
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOption {
    pub name: String,
    pub description: String,
    pub kind: OptionKind,
    pub required: bool,
    pub default: Option<String>,
}

/// Host command schema, as handed to the platform's command registration
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: String,
    pub description: String,
    pub group: Option<String>,
    pub options: Vec<CommandOption>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            group: None,
            options: Vec::new(),
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn in_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn with_option(mut self, option: CommandOption) -> Self {
        self.options.push(option);
        self
    }

    pub fn option(&self, name: &str) -> Option<&CommandOption> {
        self.options.iter().find(|o| o.name == name)
    }
}

/// A host command call, as delivered by the platform
#[derive(Debug, Clone, Default)]
pub struct CommandInvocation {
    pub name: String,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub user_id: u64,
    pub options: Map<String, Value>,
}

impl CommandInvocation {
    pub fn new(name: impl Into<String>, guild_id: Option<u64>, channel_id: u64, user_id: u64) -> Self {
        Self {
            name: name.into(),
            guild_id,
            channel_id,
            user_id,
            options: Map::new(),
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}
