use serde::{Deserialize, Deserializer};

/// A host-side side effect requested by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    AddRole {
        #[serde(deserialize_with = "snowflake")]
        guild_id: u64,
        #[serde(deserialize_with = "snowflake")]
        user_id: u64,
        #[serde(deserialize_with = "snowflake")]
        role_id: u64,
    },
    RemoveRole {
        #[serde(deserialize_with = "snowflake")]
        guild_id: u64,
        #[serde(deserialize_with = "snowflake")]
        user_id: u64,
        #[serde(deserialize_with = "snowflake")]
        role_id: u64,
    },
    #[serde(rename = "message")]
    PostMessage {
        #[serde(deserialize_with = "snowflake")]
        channel_id: u64,
        text: String,
    },
    AddReaction {
        #[serde(deserialize_with = "snowflake")]
        channel_id: u64,
        #[serde(deserialize_with = "snowflake")]
        message_id: u64,
        emoji: String,
    },
    /// Any tag this host does not know about
    #[serde(other)]
    Unknown,
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::AddRole { .. } => "add_role",
            Action::RemoveRole { .. } => "remove_role",
            Action::PostMessage { .. } => "message",
            Action::AddReaction { .. } => "add_reaction",
            Action::Unknown => "unknown",
        }
    }
}

/// Ids arrive as JSON numbers or as decimal strings
fn snowflake<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(id) => Ok(id),
        Raw::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}
