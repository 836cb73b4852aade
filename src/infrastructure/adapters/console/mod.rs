//! Console adapter for development/testing

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use crate::application::errors::HostError;
use crate::domain::traits::{Host, HostInfo};
use crate::infrastructure::config::Config;

/// Console host for local development. Actions are printed instead of performed.
pub struct ConsoleAdapter {
    info: HostInfo,
    admins: HashSet<u64>,
    next_message_id: AtomicU64,
}

impl ConsoleAdapter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            info: HostInfo {
                id: "console".to_string(),
                name: name.into(),
            },
            admins: HashSet::new(),
            next_message_id: AtomicU64::new(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.bot.name).with_admins(config.admins.iter().copied())
    }

    pub fn with_admins(mut self, admins: impl IntoIterator<Item = u64>) -> Self {
        self.admins.extend(admins);
        self
    }

    /// Allocate an id for an inbound or outbound message
    pub fn next_message_id(&self) -> u64 {
        self.next_message_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Line reader over stdin
    pub fn lines(&self) -> Lines<BufReader<Stdin>> {
        BufReader::new(tokio::io::stdin()).lines()
    }

    pub fn reply(&self, text: &str) {
        println!("[BOT] {}", text);
    }
}

impl Default for ConsoleAdapter {
    fn default() -> Self {
        Self::new("casper7")
    }
}

#[async_trait]
impl Host for ConsoleAdapter {
    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<(), HostError> {
        println!("[BOT] (guild {}) gave role {} to user {}", guild_id, role_id, user_id);
        Ok(())
    }

    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<(), HostError> {
        println!("[BOT] (guild {}) took role {} from user {}", guild_id, role_id, user_id);
        Ok(())
    }

    async fn create_message(&self, channel_id: u64, text: &str) -> Result<u64, HostError> {
        let id = self.next_message_id();
        println!("[BOT] #{} {}", channel_id, text);
        Ok(id)
    }

    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), HostError> {
        println!("[BOT] #{} reacted {} to message {}", channel_id, emoji, message_id);
        Ok(())
    }

    async fn is_admin(&self, _guild_id: u64, user_id: u64) -> Result<bool, HostError> {
        Ok(self.admins.contains(&user_id))
    }

    fn host_info(&self) -> HostInfo {
        self.info.clone()
    }
}
