use async_trait::async_trait;
use crate::application::errors::HostError;

/// Host trait - the chat platform's action API and permission check
#[async_trait]
pub trait Host: Send + Sync {
    /// Grant a role to a guild member
    async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<(), HostError>;

    /// Revoke a role from a guild member
    async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<(), HostError>;

    /// Post a message in a channel, returning the new message id
    async fn create_message(&self, channel_id: u64, text: &str) -> Result<u64, HostError>;

    /// React to a message
    async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), HostError>;

    /// Whether the user holds an administrator permission in the guild
    async fn is_admin(&self, guild_id: u64, user_id: u64) -> Result<bool, HostError>;

    /// Host information
    fn host_info(&self) -> HostInfo;
}

/// Host information
#[derive(Debug, Clone)]
pub struct HostInfo {
    pub id: String,
    pub name: String,
}
