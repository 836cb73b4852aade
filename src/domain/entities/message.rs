/// An inbound message posted in a guild channel
#[derive(Debug, Clone)]
pub struct GuildMessage {
    pub id: u64,
    pub guild_id: Option<u64>,
    pub channel_id: u64,
    pub author_id: u64,
    pub content: String,
}

impl GuildMessage {
    pub fn new(id: u64, channel_id: u64, author_id: u64, content: impl Into<String>) -> Self {
        Self {
            id,
            guild_id: None,
            channel_id,
            author_id,
            content: content.into(),
        }
    }

    pub fn in_guild(mut self, guild_id: u64) -> Self {
        self.guild_id = Some(guild_id);
        self
    }

    /// Short preview for logs
    pub fn preview(&self) -> String {
        self.content.chars().take(50).collect()
    }
}
