//! Host session - every plugin capability wired to one host for the life of the process

use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::task::TaskTracker;

use crate::application::errors::{BotError, CommandError};
use crate::application::messaging::ListenerBus;
use crate::application::services::command_catalog::is_admin;
use crate::application::services::{CommandCatalog, EventTranslator, JobBridge, ADMIN_REFUSAL};
use crate::domain::entities::{Command, CommandInvocation, CommandOption, GuildMessage, OptionKind};
use crate::domain::traits::Host;
use crate::infrastructure::config::Config;
use crate::infrastructure::plugins::PluginRegistry;
use crate::infrastructure::scheduler::CronScheduler;

pub const INVOKE_JOB: &str = "invoke-job";
pub const JOB_ID_OPTION: &str = "job-id";
pub const NOT_IMPLEMENTED: &str = "This command has not yet been implemented!";
pub const JOB_RESCHEDULED: &str = "Job rescheduled successfully!";

pub struct HostSession {
    host: Arc<dyn Host>,
    registry: PluginRegistry,
    catalog: CommandCatalog,
    jobs: JobBridge,
    listeners: Arc<ListenerBus>,
    scheduler: Arc<CronScheduler>,
    tracker: TaskTracker,
}

impl HostSession {
    /// Discover plugins from the config and register them against `host`
    pub async fn start(config: &Config, host: Arc<dyn Host>) -> Result<Self, BotError> {
        let pool = Arc::new(Semaphore::new(config.plugins.pool_size()));
        let registry = PluginRegistry::discover(&config.plugins.source(), config.plugins.timeout(), pool)?;

        if let Some(guild) = config.testing_guild {
            tracing::info!("Registering commands in testing guild {}", guild);
        }

        Ok(Self::with_registry(registry, host).await)
    }

    /// Register every plugin of `registry`. A plugin that fails to register keeps the others running.
    pub async fn with_registry(registry: PluginRegistry, host: Arc<dyn Host>) -> Self {
        let translator = EventTranslator::new();
        let scheduler = Arc::new(CronScheduler::new());

        let mut catalog = CommandCatalog::new();
        catalog.reserve(INVOKE_JOB);
        let mut jobs = JobBridge::new(scheduler.clone(), host.clone(), translator);
        let mut listeners = ListenerBus::new(translator);

        for plugin in registry.iter() {
            let execute = &plugin.definition().execute;

            match catalog.register(plugin.clone()).await {
                Ok(group) => tracing::info!(
                    plugin = %execute,
                    "Registered {} with {} commands",
                    group.description(),
                    group.commands.len()
                ),
                Err(e) => tracing::error!(plugin = %execute, "Failed to register commands: {}", e),
            }

            let scheduled = jobs.schedule_all(plugin.clone()).await;
            let listening = listeners.register_all(plugin.clone()).await;
            tracing::debug!(plugin = %execute, scheduled, listening, "Registered jobs and listeners");
        }

        scheduler.start();

        Self {
            host,
            registry,
            catalog,
            jobs,
            listeners: Arc::new(listeners),
            scheduler,
            tracker: TaskTracker::new(),
        }
    }

    /// Schema of the built-in job trigger command
    pub fn invoke_job_schema() -> Command {
        Command::new(INVOKE_JOB)
            .with_description("Manually execute a plugin job")
            .with_option(CommandOption {
                name: JOB_ID_OPTION.to_string(),
                description: "The job to invoke".to_string(),
                kind: OptionKind::String,
                required: true,
                default: None,
            })
    }

    /// Schema for a command name, built-ins included
    pub fn schema(&self, name: &str) -> Option<Command> {
        if name == INVOKE_JOB {
            return Some(Self::invoke_job_schema());
        }
        self.catalog.schema(name).cloned()
    }

    /// Run a host command and produce the reply to show the user
    pub async fn handle_command(&self, invocation: CommandInvocation) -> String {
        if invocation.name == INVOKE_JOB {
            return self.invoke_job(&invocation).await;
        }

        let name = invocation.name.clone();
        match self.catalog.invoke(self.host.as_ref(), invocation).await {
            Ok(reply) => reply,
            Err(CommandError::NotFound(_)) => {
                tracing::warn!(command = %name, "Unknown command");
                NOT_IMPLEMENTED.to_string()
            }
            Err(e) => {
                tracing::error!(command = %name, "Command failed: {}", e);
                format!("Command failed: {}", e)
            }
        }
    }

    async fn invoke_job(&self, invocation: &CommandInvocation) -> String {
        if !is_admin(self.host.as_ref(), invocation).await {
            return ADMIN_REFUSAL.to_string();
        }

        let id = invocation
            .options
            .get(JOB_ID_OPTION)
            .and_then(|v| v.as_str())
            .unwrap_or_default();

        match self.jobs.invoke_now(id) {
            Ok(()) => JOB_RESCHEDULED.to_string(),
            Err(known) => {
                let list: Vec<String> = known.iter().map(|id| format!(" - {}", id)).collect();
                format!("Job not found. Available jobs:\n{}", list.join("\n"))
            }
        }
    }

    /// Run a host command on the session's tracker and post the reply to the invoking channel
    pub fn spawn_command(self: &Arc<Self>, invocation: CommandInvocation) {
        let session = self.clone();
        self.tracker.spawn(async move {
            let channel_id = invocation.channel_id;
            let reply = session.handle_command(invocation).await;
            if let Err(e) = session.host.create_message(channel_id, &reply).await {
                tracing::error!(channel = channel_id, "Failed to deliver reply: {}", e);
            }
        });
    }

    /// Fan a guild message out to every listener without blocking the caller
    pub fn handle_message(&self, message: GuildMessage) {
        let listeners = self.listeners.clone();
        let host = self.host.clone();
        self.tracker.spawn(async move {
            listeners.dispatch(host.as_ref(), &message).await;
        });
    }

    /// Stop the scheduler and wait for in-flight commands and listener runs
    pub async fn shutdown(&self) {
        self.scheduler.shutdown().await;
        self.tracker.close();
        self.tracker.wait().await;
        tracing::info!("Session stopped");
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn catalog(&self) -> &CommandCatalog {
        &self.catalog
    }

    pub fn jobs(&self) -> &JobBridge {
        &self.jobs
    }

    pub fn listeners(&self) -> &ListenerBus {
        &self.listeners
    }
}
