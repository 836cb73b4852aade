//! Plugin handle - one-shot process invocation of an external plugin
//!
//! Protocol version 1 puts the verb first, followed by the context flags:
//!
//! ```text
//! <plugin-cmd> <verb> [--guild G] --channel C --user U [--message M] [-- <json-options>]
//! ```

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Semaphore;

use crate::application::errors::{PluginError, PluginResult};
use crate::domain::entities::InvocationContext;

pub const VERSION_VERB: &str = "--version";
pub const COMMANDS_VERB: &str = "--commands";
pub const JOBS_VERB: &str = "--jobs";
pub const LISTENERS_VERB: &str = "--listeners";

/// Request/response seam to a plugin
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The command line this plugin is reached through
    fn endpoint(&self) -> &str;

    /// Run `verb` and return the trimmed standard output; empty means "no response"
    async fn invoke(&self, verb: &str, ctx: Option<&InvocationContext>) -> PluginResult<String>;
}

/// Immutable description of a discovered plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PluginDefinition {
    pub execute: String,
}

impl PluginDefinition {
    pub fn new(execute: impl Into<String>) -> Self {
        Self {
            execute: execute.into().trim().to_string(),
        }
    }

    /// Stable key used to address this plugin's jobs
    pub fn slug(&self) -> String {
        self.execute.to_lowercase().replace(' ', "-")
    }

    pub fn argv(&self) -> Vec<String> {
        self.execute.split_whitespace().map(str::to_string).collect()
    }
}

/// Build the protocol arguments for one invocation
pub fn build_args(verb: &str, ctx: Option<&InvocationContext>) -> Vec<String> {
    let mut args = vec![verb.to_string()];
    if let Some(ctx) = ctx {
        args.extend(ctx.to_args());
    }
    args
}

/// Process-backed plugin
pub struct PluginHandle {
    definition: PluginDefinition,
    timeout: Duration,
    pool: Arc<Semaphore>,
}

impl PluginHandle {
    pub fn new(definition: PluginDefinition, timeout: Duration, pool: Arc<Semaphore>) -> Self {
        Self {
            definition,
            timeout,
            pool,
        }
    }

    pub fn definition(&self) -> &PluginDefinition {
        &self.definition
    }
}

#[async_trait]
impl Plugin for PluginHandle {
    fn endpoint(&self) -> &str {
        &self.definition.execute
    }

    async fn invoke(&self, verb: &str, ctx: Option<&InvocationContext>) -> PluginResult<String> {
        let mut argv = self.definition.argv();
        argv.extend(build_args(verb, ctx));
        let command_line = argv.join(" ");

        let Some((program, args)) = argv.split_first() else {
            return Err(PluginError::EmptyCommandLine { command: command_line });
        };

        let _permit = self.pool.acquire().await.map_err(|_| PluginError::PoolClosed)?;

        tracing::debug!(plugin = %self.definition.execute, "Invoking: {}", command_line);

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| {
                tracing::error!("Command \"{}\" failed: {}", command_line, source);
                PluginError::Spawn {
                    command: command_line.clone(),
                    source,
                }
            })?;

        // Dropping the pending future on timeout kills the child.
        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(PluginError::Spawn {
                    command: command_line,
                    source,
                })
            }
            Err(_) => {
                tracing::warn!("Command \"{}\" timed out after {:?}", command_line, self.timeout);
                return Err(PluginError::Timeout {
                    command: command_line,
                    after: self.timeout,
                });
            }
        };

        if !output.status.success() {
            tracing::warn!("Command \"{}\" failed: {}", command_line, output.status);
            return Err(PluginError::Exit {
                command: command_line,
                status: output.status,
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_leads() {
        assert_eq!(build_args("--version", None), vec!["--version"]);

        let ctx = InvocationContext::new(Some(1), 2, 3);
        assert_eq!(
            build_args("echo", Some(&ctx)),
            vec!["echo", "--guild", "1", "--channel", "2", "--user", "3"]
        );
    }

    #[test]
    fn test_slug() {
        let def = PluginDefinition::new("  Python -m Casper7_Echo ");
        assert_eq!(def.execute, "Python -m Casper7_Echo");
        assert_eq!(def.slug(), "python--m-casper7_echo");
        assert_eq!(def.argv(), vec!["Python", "-m", "Casper7_Echo"]);
    }
}
