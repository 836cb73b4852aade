//! Listener bus - fans every guild message out to plugin listeners

use std::sync::Arc;

use crate::application::services::EventTranslator;
use crate::domain::entities::{GuildMessage, InvocationContext};
use crate::domain::traits::Host;
use crate::infrastructure::plugins::{ListenerSpec, LoadedPlugin};

/// One registered plugin listener
pub struct ListenerRecord {
    pub plugin: Arc<LoadedPlugin>,
    pub spec: ListenerSpec,
}

impl ListenerRecord {
    fn context(&self, message: &GuildMessage) -> InvocationContext {
        InvocationContext::new(message.guild_id, message.channel_id, message.author_id)
            .with_message(message.id)
            .with_option("message", message.content.clone())
    }
}

/// Message dispatcher - runs listeners in registration order
pub struct ListenerBus {
    listeners: Vec<Arc<ListenerRecord>>,
    translator: EventTranslator,
}

impl ListenerBus {
    pub fn new(translator: EventTranslator) -> Self {
        Self {
            listeners: Vec::new(),
            translator,
        }
    }

    pub fn register(&mut self, plugin: Arc<LoadedPlugin>, spec: ListenerSpec) {
        tracing::info!(plugin = %plugin.definition().execute, "Registering message listener {}", spec.name);
        self.listeners.push(Arc::new(ListenerRecord { plugin, spec }));
    }

    /// Register every listener a plugin declares
    pub async fn register_all(&mut self, plugin: Arc<LoadedPlugin>) -> usize {
        let listeners = plugin.capabilities().listeners().await;
        for spec in listeners.iter() {
            self.register(plugin.clone(), spec.clone());
        }
        listeners.len()
    }

    /// Run every listener for one message. Returns how many listeners succeeded.
    pub async fn dispatch(&self, host: &dyn Host, message: &GuildMessage) -> usize {
        tracing::debug!("[{}] {}", message.channel_id, message.preview());

        let mut succeeded = 0;
        for listener in &self.listeners {
            let ctx = listener.context(message);
            let result = self
                .translator
                .invoke_and_apply(host, listener.plugin.handle().as_ref(), &listener.spec.name, Some(&ctx))
                .await;

            match result {
                Ok(_) => succeeded += 1,
                Err(e) => tracing::warn!(
                    plugin = %listener.plugin.definition().execute,
                    listener = %listener.spec.name,
                    "Listener failed: {}",
                    e
                ),
            }
        }
        succeeded
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::event_translator::tests::RecordingHost;
    use crate::infrastructure::plugins::cache::tests::FakePlugin;
    use crate::infrastructure::plugins::PluginDefinition;
    use serde_json::json;

    #[tokio::test]
    async fn test_listeners_run_in_order_and_isolate_failures() {
        let fake = Arc::new(
            FakePlugin::new()
                .reply("--listeners", r#"[{"name":"wordle"},{"name":"broken"},{"name":"garbled"},{"name":"quiet"}]"#)
                .reply("wordle", r#"[{"type":"add_reaction","channel_id":2,"message_id":9,"emoji":"🟩"}]"#)
                .fail("broken")
                .reply("garbled", "not json"),
        );
        let plugin = Arc::new(LoadedPlugin::new(PluginDefinition::new("wordle-plugin"), fake.clone()));
        let host = RecordingHost::default();

        let mut bus = ListenerBus::new(EventTranslator::new());
        assert_eq!(bus.register_all(plugin).await, 4);

        let message = GuildMessage::new(9, 2, 3, "Wordle 123 3/6").in_guild(1);
        let succeeded = bus.dispatch(&host, &message).await;

        assert_eq!(succeeded, 2);
        assert_eq!(host.calls(), vec!["add_reaction 2 9 🟩"]);

        let calls = fake.calls.lock().unwrap();
        let verbs: Vec<&str> = calls.iter().map(|(v, _)| v.as_str()).collect();
        assert_eq!(verbs, vec!["--listeners", "wordle", "broken", "garbled", "quiet"]);

        let ctx = calls[1].1.as_ref().unwrap();
        assert_eq!((ctx.guild_id, ctx.channel_id, ctx.user_id, ctx.message_id), (Some(1), 2, 3, Some(9)));
        assert_eq!(ctx.options["message"], json!("Wordle 123 3/6"));
    }
}
