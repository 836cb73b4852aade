//! Event translator - applies plugin-requested actions to the host

use crate::application::errors::{BotError, HostError, ProtocolError};
use crate::domain::entities::{Action, InvocationContext};
use crate::domain::traits::Host;
use crate::infrastructure::plugins::Plugin;

/// Decodes plugin action lists and executes them against the host action API
#[derive(Debug, Default, Clone, Copy)]
pub struct EventTranslator;

impl EventTranslator {
    pub fn new() -> Self {
        Self
    }

    /// Parse a job or listener reply. A batch with any malformed known action is rejected whole.
    pub fn decode(&self, verb: &str, raw: &str) -> Result<Vec<Action>, ProtocolError> {
        serde_json::from_str(raw).map_err(|source| ProtocolError::Json {
            verb: verb.to_string(),
            source,
        })
    }

    /// Invoke `verb` and apply whatever actions the plugin answers with
    pub async fn invoke_and_apply(
        &self,
        host: &dyn Host,
        plugin: &dyn Plugin,
        verb: &str,
        ctx: Option<&InvocationContext>,
    ) -> Result<usize, BotError> {
        let raw = plugin.invoke(verb, ctx).await?;
        if raw.is_empty() {
            return Ok(0);
        }

        let actions = self.decode(verb, &raw)?;
        Ok(self.apply(host, &actions).await)
    }

    /// Apply actions in order, returning how many succeeded. Failures don't stop the batch.
    pub async fn apply(&self, host: &dyn Host, actions: &[Action]) -> usize {
        let mut applied = 0;

        for action in actions {
            match self.apply_one(host, action).await {
                Ok(true) => applied += 1,
                Ok(false) => tracing::debug!("Skipping unknown action"),
                Err(e) => tracing::error!(action = action.as_str(), "Failed to apply action: {}", e),
            }
        }

        applied
    }

    async fn apply_one(&self, host: &dyn Host, action: &Action) -> Result<bool, HostError> {
        match action {
            Action::AddRole { guild_id, user_id, role_id } => {
                host.add_role(*guild_id, *user_id, *role_id).await?;
            }
            Action::RemoveRole { guild_id, user_id, role_id } => {
                host.remove_role(*guild_id, *user_id, *role_id).await?;
            }
            Action::PostMessage { channel_id, text } => {
                host.create_message(*channel_id, text).await?;
            }
            Action::AddReaction { channel_id, message_id, emoji } => {
                host.add_reaction(*channel_id, *message_id, emoji).await?;
            }
            Action::Unknown => return Ok(false),
        }
        Ok(true)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::traits::HostInfo;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Host that records every call
    #[derive(Default)]
    pub(crate) struct RecordingHost {
        pub calls: Mutex<Vec<String>>,
        pub admins: HashSet<u64>,
        pub fail_messages: bool,
    }

    impl RecordingHost {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    #[async_trait]
    impl Host for RecordingHost {
        async fn add_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<(), HostError> {
            self.record(format!("add_role {guild_id} {user_id} {role_id}"));
            Ok(())
        }

        async fn remove_role(&self, guild_id: u64, user_id: u64, role_id: u64) -> Result<(), HostError> {
            self.record(format!("remove_role {guild_id} {user_id} {role_id}"));
            Ok(())
        }

        async fn create_message(&self, channel_id: u64, text: &str) -> Result<u64, HostError> {
            if self.fail_messages {
                return Err(HostError::Rejected("missing access".to_string()));
            }
            self.record(format!("message {channel_id} {text}"));
            Ok(1)
        }

        async fn add_reaction(&self, channel_id: u64, message_id: u64, emoji: &str) -> Result<(), HostError> {
            self.record(format!("add_reaction {channel_id} {message_id} {emoji}"));
            Ok(())
        }

        async fn is_admin(&self, _guild_id: u64, user_id: u64) -> Result<bool, HostError> {
            Ok(self.admins.contains(&user_id))
        }

        fn host_info(&self) -> HostInfo {
            HostInfo {
                id: "recording".to_string(),
                name: "recording".to_string(),
            }
        }
    }

    #[tokio::test]
    async fn test_unknown_actions_are_skipped() {
        let host = RecordingHost::default();
        let translator = EventTranslator::new();

        let actions = translator
            .decode(
                "job",
                r#"[{"type":"message","channel_id":5,"text":"hi"},{"type":"unknown"}]"#,
            )
            .unwrap();
        let applied = translator.apply(&host, &actions).await;

        assert_eq!(applied, 1);
        assert_eq!(host.calls(), vec!["message 5 hi"]);
    }

    #[tokio::test]
    async fn test_failed_action_does_not_abort_batch() {
        let host = RecordingHost {
            fail_messages: true,
            ..Default::default()
        };
        let translator = EventTranslator::new();
        let actions = vec![
            Action::PostMessage { channel_id: 1, text: "lost".to_string() },
            Action::AddRole { guild_id: 1, user_id: 2, role_id: 3 },
            Action::AddReaction { channel_id: 1, message_id: 4, emoji: "🍝".to_string() },
            Action::RemoveRole { guild_id: 1, user_id: 2, role_id: 3 },
        ];

        let applied = translator.apply(&host, &actions).await;

        assert_eq!(applied, 3);
        assert_eq!(
            host.calls(),
            vec!["add_role 1 2 3", "add_reaction 1 4 🍝", "remove_role 1 2 3"]
        );
    }

    #[test]
    fn test_malformed_batch_is_rejected() {
        let translator = EventTranslator::new();
        assert!(translator.decode("job", r#"[{"type":"add_role","guild_id":1}]"#).is_err());
        assert!(translator.decode("job", "meatball!").is_err());
    }
}
