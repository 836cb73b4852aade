use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::Semaphore;

use casper7::application::errors::BotError;
use casper7::application::messaging::{Inbound, MessageParser};
use casper7::application::HostSession;
use casper7::domain::entities::GuildMessage;
use casper7::infrastructure::adapters::ConsoleAdapter;
use casper7::infrastructure::config::Config;
use casper7::infrastructure::plugins::{LoadedPlugin, PluginRegistry};

#[derive(Parser)]
#[command(name = "casper7")]
#[command(about = "A chat bot driven by plugin executables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "casper7.yaml")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot on the console host
    Run,
    /// List discovered plugins and their commands
    Plugins,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run => load_config(&cli.config).and_then(|config| block_on(run_bot(config))),
        Commands::Plugins => load_config(&cli.config).and_then(|config| block_on(print_plugins(config))),
        Commands::Version => {
            println!("casper7 v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::InitConfig => init_config(),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn block_on<F>(future: F) -> Result<(), BotError>
where
    F: std::future::Future<Output = Result<(), BotError>>,
{
    tokio::runtime::Runtime::new()?.block_on(future)
}

fn load_config(path: &str) -> Result<Config, BotError> {
    let config = if std::path::Path::new(path).exists() {
        Config::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config: {}, using defaults", e);
            Config::default()
        })
    } else {
        tracing::info!("No config at {}, using defaults", path);
        Config::default()
    };

    Ok(config.load_env()?)
}

async fn run_bot(config: Config) -> Result<(), BotError> {
    tracing::info!("Starting casper7: {}", config.bot.name);

    let console = Arc::new(ConsoleAdapter::from_config(&config));
    let session = Arc::new(HostSession::start(&config, console.clone()).await?);

    if !session.registry().is_empty() {
        println!("Loaded plugins:");
        for plugin in session.registry().iter() {
            print_plugin(plugin).await;
        }
    }

    let guild_id = config.console.guild_id;
    let channel_id = config.console.channel_id;
    let user_id = config.console.user_id;

    println!("casper7 console: /command key=value ... runs a command, anything else is a message. Ctrl-D quits.");

    let parser = MessageParser::default();
    let mut lines = console.lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            break;
        };

        match parser.parse(&line) {
            Ok(Inbound::Empty) => {}
            Ok(Inbound::Message(text)) => {
                let message = GuildMessage::new(console.next_message_id(), channel_id, user_id, text).in_guild(guild_id);
                session.handle_message(message);
            }
            Ok(Inbound::Command(parsed)) => {
                let schema = session.schema(&parsed.name);
                match parsed.into_invocation(schema.as_ref(), Some(guild_id), channel_id, user_id) {
                    Ok(invocation) => session.spawn_command(invocation),
                    Err(e) => console.reply(&format!("Command failed: {}", e)),
                }
            }
            Err(e) => console.reply(&format!("Command failed: {}", e)),
        }
    }

    tracing::info!("Shutting down");
    session.shutdown().await;
    Ok(())
}

async fn print_plugins(config: Config) -> Result<(), BotError> {
    let pool = Arc::new(Semaphore::new(config.plugins.pool_size()));
    let registry = PluginRegistry::discover(&config.plugins.source(), config.plugins.timeout(), pool)?;

    if registry.is_empty() {
        println!("No plugins found.");
        return Ok(());
    }

    for plugin in registry.iter() {
        print_plugin(plugin).await;
    }
    Ok(())
}

async fn print_plugin(plugin: &LoadedPlugin) {
    let capabilities = plugin.capabilities();
    let definition = plugin.definition();

    println!("{} ({})", capabilities.version().await, definition.slug());
    println!("  execute: {}", definition.execute);

    for command in capabilities.commands().await.iter() {
        let admin = if command.admin { " [admin]" } else { "" };
        println!("  /{}{} - {}", command.name, admin, command.description);

        for arg in &command.args {
            let optional = if arg.optional { ", optional" } else { "" };
            let default = arg
                .default
                .as_ref()
                .map(|d| format!(", default {}", d))
                .unwrap_or_default();
            println!("      {} ({}{}{}) - {}", arg.name, arg.kind.as_str(), optional, default, arg.description);
        }
    }

    for job in capabilities.jobs().await.iter() {
        println!("  job {} [{}]", job.name, job.schedule);
    }
    for listener in capabilities.listeners().await.iter() {
        println!("  listener {}", listener.name);
    }
}

fn init_config() -> Result<(), BotError> {
    println!("{}", Config::default().to_yaml()?);
    Ok(())
}
