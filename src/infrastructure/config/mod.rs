//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use crate::application::errors::ConfigError;
use crate::infrastructure::plugins::PluginSource;

/// Bot configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    pub bot: BotConfig,
    #[serde(default)]
    pub plugins: PluginConfig,
    #[serde(default)]
    pub console: ConsoleConfig,
    /// User ids the console host treats as administrators
    #[serde(default)]
    pub admins: Vec<u64>,
    pub testing_guild: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct BotConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PluginConfig {
    /// One plugin command line per line
    pub file: Option<PathBuf>,
    /// Command lines appended after the file's
    pub execute: Vec<String>,
    pub timeout_seconds: u64,
    pub max_concurrent_invocations: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    pub guild_id: u64,
    pub channel_id: u64,
    pub user_id: u64,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("plugins.txt")),
            execute: Vec::new(),
            timeout_seconds: 30,
            max_concurrent_invocations: 8,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            guild_id: 1,
            channel_id: 1,
            user_id: 1,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig {
                name: "casper7".to_string(),
            },
            plugins: PluginConfig::default(),
            console: ConsoleConfig::default(),
            admins: vec![1],
            testing_guild: None,
        }
    }
}

impl PluginConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.max(1))
    }

    /// Pool size; zero would deadlock every invocation
    pub fn pool_size(&self) -> usize {
        self.max_concurrent_invocations.max(1)
    }

    pub fn source(&self) -> PluginSource {
        PluginSource {
            file: self.file.clone(),
            execute: self.execute.clone(),
        }
    }
}

impl Config {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path)
            .map_err(|e| ConfigError::Parse(format!("Failed to read config: {}", e)))?;

        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Apply environment overrides on top of this config
    pub fn load_env(mut self) -> Result<Self, ConfigError> {
        if let Ok(file) = std::env::var("CASPER7_PLUGINS_FILE") {
            self.plugins.file = Some(PathBuf::from(file));
        }

        if let Ok(guild) = std::env::var("CASPER7_TESTING_GUILD") {
            let guild = guild
                .trim()
                .parse()
                .map_err(|e| ConfigError::Parse(format!("CASPER7_TESTING_GUILD: {}", e)))?;
            self.testing_guild = Some(guild);
        }

        if let Ok(admins) = std::env::var("CASPER7_ADMINS") {
            self.admins = parse_id_list(&admins)?;
        }

        Ok(self)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::Parse(format!("Failed to write config: {}", e)))
    }
}

/// Comma separated ids
fn parse_id_list(raw: &str) -> Result<Vec<u64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse()
                .map_err(|e| ConfigError::Parse(format!("Invalid user id '{}': {}", id, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = Config::parse("bot:\n  name: casper7\n").unwrap();

        assert_eq!(config.plugins.timeout(), Duration::from_secs(30));
        assert_eq!(config.plugins.pool_size(), 8);
        assert_eq!(config.plugins.file, Some(PathBuf::from("plugins.txt")));
        assert!(config.admins.is_empty());
        assert_eq!(config.testing_guild, None);
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
bot:
  name: casper7
plugins:
  file: /etc/casper7/plugins.txt
  execute:
    - casper7-plugin-meatball-day
  timeout-seconds: 5
  max-concurrent-invocations: 0
console:
  guild-id: 10
  channel-id: 20
  user-id: 30
admins: [30]
testing-guild: 10
"#;
        let config = Config::parse(yaml).unwrap();
        let source = config.plugins.source();

        assert_eq!(source.execute, vec!["casper7-plugin-meatball-day"]);
        assert_eq!(config.plugins.timeout(), Duration::from_secs(5));
        assert_eq!(config.plugins.pool_size(), 1);
        assert_eq!(config.console.channel_id, 20);
        assert_eq!(config.admins, vec![30]);
        assert_eq!(config.testing_guild, Some(10));
    }

    #[test]
    fn test_default_config_round_trips_through_yaml() {
        let yaml = Config::default().to_yaml().unwrap();
        let config = Config::parse(&yaml).unwrap();
        assert_eq!(config.bot.name, "casper7");
        assert_eq!(config.admins, vec![1]);
    }

    #[test]
    fn test_id_list() {
        assert_eq!(parse_id_list("1, 2,,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_id_list("1,meatball").is_err());
    }
}
