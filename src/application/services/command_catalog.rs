//! Command catalog - host commands built from plugin command declarations

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::application::errors::{CommandError, ConfigError};
use crate::domain::entities::{Command, CommandInvocation, CommandOption, InvocationContext};
use crate::domain::traits::Host;
use crate::infrastructure::plugins::manifest::split_version;
use crate::infrastructure::plugins::{CommandSpec, LoadedPlugin};

pub const ADMIN_REFUSAL: &str = "**You must be an admin to use this command!** :police_officer:";
pub const EMPTY_REPLY: &str = "*No response was returned, but the command succeeded.*";
const ADMIN_SUFFIX: &str = " (Admin only!)";

/// Commands contributed by one plugin
#[derive(Debug, Clone, PartialEq)]
pub struct CommandGroup {
    pub name: String,
    pub version: String,
    pub execute: String,
    pub commands: Vec<String>,
}

impl CommandGroup {
    pub fn description(&self) -> String {
        format!("{} {}", self.name, self.version)
    }
}

/// One registered plugin command
struct CatalogEntry {
    plugin: Arc<LoadedPlugin>,
    spec: CommandSpec,
    schema: Command,
}

/// Service for registering and dispatching plugin commands
pub struct CommandCatalog {
    entries: HashMap<String, Arc<CatalogEntry>>,
    groups: Vec<CommandGroup>,
    reserved: HashSet<String>,
}

impl CommandCatalog {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            groups: Vec::new(),
            reserved: HashSet::new(),
        }
    }

    /// Keep a name for a built-in host command
    pub fn reserve(&mut self, name: impl Into<String>) {
        self.reserved.insert(name.into());
    }

    /// Host schema for one plugin command
    pub fn schema_for(spec: &CommandSpec, group: &str) -> Command {
        let mut description = spec.description.clone();
        if spec.admin {
            description.push_str(ADMIN_SUFFIX);
        }

        spec.args.iter().fold(
            Command::new(&spec.name).with_description(description).in_group(group),
            |command, arg| {
                command.with_option(CommandOption {
                    name: arg.name.clone(),
                    description: arg.description.clone(),
                    kind: arg.kind.option_kind(),
                    required: !arg.optional,
                    default: arg.default.clone(),
                })
            },
        )
    }

    /// Register every command of a plugin under a group named after the plugin
    pub async fn register(&mut self, plugin: Arc<LoadedPlugin>) -> Result<&CommandGroup, ConfigError> {
        let version = plugin.capabilities().version().await;
        let (name, version) = split_version(&version).map_err(|e| ConfigError::Parse(e.to_string()))?;

        if self.groups.iter().any(|g| g.name == name) {
            return Err(ConfigError::DuplicatePlugin(name.to_string()));
        }

        let mut group = CommandGroup {
            name: name.to_string(),
            version: version.to_string(),
            execute: plugin.definition().execute.clone(),
            commands: Vec::new(),
        };

        for spec in plugin.capabilities().commands().await.iter() {
            if self.reserved.contains(&spec.name) || self.entries.contains_key(&spec.name) {
                tracing::error!(plugin = %group.name, "{}", ConfigError::DuplicateCommand(spec.name.clone()));
                continue;
            }

            let entry = CatalogEntry {
                plugin: plugin.clone(),
                spec: spec.clone(),
                schema: Self::schema_for(spec, &group.name),
            };

            tracing::info!(plugin = %group.name, command = %spec.name, "Registered command");
            self.entries.insert(spec.name.clone(), Arc::new(entry));
            group.commands.push(spec.name.clone());
        }

        self.groups.push(group);
        Ok(&self.groups[self.groups.len() - 1])
    }

    /// Run a plugin command and produce its reply
    pub async fn invoke(&self, host: &dyn Host, invocation: CommandInvocation) -> Result<String, CommandError> {
        let entry = self
            .entries
            .get(&invocation.name)
            .cloned()
            .ok_or_else(|| CommandError::NotFound(invocation.name.clone()))?;

        if entry.spec.admin && !is_admin(host, &invocation).await {
            tracing::info!(command = %entry.spec.name, user = invocation.user_id, "Refused non-admin");
            return Ok(ADMIN_REFUSAL.to_string());
        }

        let mut options = invocation.options;
        for arg in &entry.spec.args {
            if options.contains_key(&arg.name) {
                continue;
            }
            match (&arg.default, arg.optional) {
                (Some(default), _) => {
                    options.insert(arg.name.clone(), arg.kind.coerce_default(default));
                }
                (None, true) => {}
                (None, false) => {
                    return Err(CommandError::InvalidArgs(format!(
                        "missing required argument '{}'",
                        arg.name
                    )))
                }
            }
        }

        let ctx = InvocationContext::new(invocation.guild_id, invocation.channel_id, invocation.user_id)
            .with_options(options);

        let reply = entry.plugin.handle().invoke(&entry.spec.name, Some(&ctx)).await?;
        if reply.is_empty() {
            return Ok(EMPTY_REPLY.to_string());
        }
        Ok(reply)
    }

    pub fn schema(&self, name: &str) -> Option<&Command> {
        self.entries.get(name).map(|e| &e.schema)
    }

    pub fn groups(&self) -> &[CommandGroup] {
        &self.groups
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for CommandCatalog {
    fn default() -> Self {
        Self::new()
    }
}

/// Admin check through the host; a missing guild or a failed lookup counts as "no"
pub async fn is_admin(host: &dyn Host, invocation: &CommandInvocation) -> bool {
    let Some(guild_id) = invocation.guild_id else {
        return false;
    };

    match host.is_admin(guild_id, invocation.user_id).await {
        Ok(admin) => admin,
        Err(e) => {
            tracing::warn!(user = invocation.user_id, "Admin check failed: {}", e);
            false
        }
    }
}
