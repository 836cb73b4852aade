//! Capability cache - memoized plugin metadata
//!
//! Each of the four metadata queries is run at most once per plugin. Concurrent
//! first callers wait on the same computation; failures degrade to empty values
//! and are only logged.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::sync::OnceCell;

use super::handle::{Plugin, COMMANDS_VERB, JOBS_VERB, LISTENERS_VERB, VERSION_VERB};
use super::manifest::{parse_records, CommandSpec, JobSpec, ListenerSpec};

pub const UNKNOWN_VERSION: &str = "Unknown n/a";

pub struct CapabilityCache {
    plugin: Arc<dyn Plugin>,
    version: OnceCell<Arc<str>>,
    commands: OnceCell<Arc<[CommandSpec]>>,
    jobs: OnceCell<Arc<[JobSpec]>>,
    listeners: OnceCell<Arc<[ListenerSpec]>>,
}

impl CapabilityCache {
    pub fn new(plugin: Arc<dyn Plugin>) -> Self {
        Self {
            plugin,
            version: OnceCell::new(),
            commands: OnceCell::new(),
            jobs: OnceCell::new(),
            listeners: OnceCell::new(),
        }
    }

    /// `"<name> <version>"`, or `"Unknown n/a"` when the plugin can't say
    pub async fn version(&self) -> Arc<str> {
        self.version
            .get_or_init(|| async {
                match self.plugin.invoke(VERSION_VERB, None).await {
                    Ok(version) if !version.is_empty() => Arc::from(version.as_str()),
                    Ok(_) => {
                        tracing::warn!(
                            "Executable '{}' did not return version information",
                            self.plugin.endpoint()
                        );
                        Arc::from(UNKNOWN_VERSION)
                    }
                    Err(e) => {
                        tracing::warn!("Couldn't get version for '{}' ({})", self.plugin.endpoint(), e);
                        Arc::from(UNKNOWN_VERSION)
                    }
                }
            })
            .await
            .clone()
    }

    pub async fn commands(&self) -> Arc<[CommandSpec]> {
        self.commands
            .get_or_init(|| async {
                let Some(records) = self.fetch_records(COMMANDS_VERB, "commands").await else {
                    return Arc::from(Vec::new());
                };

                let mut commands = Vec::with_capacity(records.len());
                for record in records {
                    match CommandSpec::from_value(record) {
                        Ok(command) => commands.push(command),
                        Err(e) => tracing::error!(
                            plugin = %self.plugin.endpoint(),
                            "Rejected command definition: {}",
                            e
                        ),
                    }
                }
                Arc::from(commands)
            })
            .await
            .clone()
    }

    pub async fn jobs(&self) -> Arc<[JobSpec]> {
        self.jobs
            .get_or_init(|| self.fetch_typed(JOBS_VERB, "jobs"))
            .await
            .clone()
    }

    pub async fn listeners(&self) -> Arc<[ListenerSpec]> {
        self.listeners
            .get_or_init(|| self.fetch_typed(LISTENERS_VERB, "listeners"))
            .await
            .clone()
    }

    async fn fetch_typed<T: DeserializeOwned>(&self, verb: &str, category: &str) -> Arc<[T]> {
        let Some(records) = self.fetch_records(verb, category).await else {
            return Arc::from(Vec::new());
        };

        let mut parsed = Vec::with_capacity(records.len());
        for record in records {
            match serde_json::from_value(record) {
                Ok(item) => parsed.push(item),
                Err(e) => tracing::error!(
                    plugin = %self.plugin.endpoint(),
                    "Rejected {} definition: {}",
                    category,
                    e
                ),
            }
        }
        Arc::from(parsed)
    }

    async fn fetch_records(&self, verb: &str, category: &str) -> Option<Vec<serde_json::Value>> {
        let raw = match self.plugin.invoke(verb, None).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Couldn't get {} for '{}' ({})", category, self.plugin.endpoint(), e);
                return None;
            }
        };

        if raw.is_empty() {
            tracing::info!("Plugin '{}' did not return any {}.", self.plugin.endpoint(), category);
            return None;
        }

        match parse_records(verb, &raw) {
            Ok(records) => Some(records),
            Err(e) => {
                tracing::error!(plugin = %self.plugin.endpoint(), "{}", e);
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::application::errors::{PluginError, PluginResult};
    use crate::domain::entities::InvocationContext;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Scripted plugin that records every call
    pub(crate) struct FakePlugin {
        pub replies: HashMap<String, Result<String, ()>>,
        pub calls: Mutex<Vec<(String, Option<InvocationContext>)>>,
        pub delay: Duration,
        pub delays: HashMap<String, Duration>,
    }

    impl FakePlugin {
        pub fn new() -> Self {
            Self {
                replies: HashMap::new(),
                calls: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
                delays: HashMap::new(),
            }
        }

        pub fn reply(mut self, verb: &str, output: &str) -> Self {
            self.replies.insert(verb.to_string(), Ok(output.to_string()));
            self
        }

        pub fn fail(mut self, verb: &str) -> Self {
            self.replies.insert(verb.to_string(), Err(()));
            self
        }

        /// Delay one verb only
        pub fn slow(mut self, verb: &str, delay: Duration) -> Self {
            self.delays.insert(verb.to_string(), delay);
            self
        }

        pub fn calls_to(&self, verb: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|(v, _)| v == verb).count()
        }
    }

    #[async_trait]
    impl Plugin for FakePlugin {
        fn endpoint(&self) -> &str {
            "fake-plugin"
        }

        async fn invoke(&self, verb: &str, ctx: Option<&InvocationContext>) -> PluginResult<String> {
            self.calls.lock().unwrap().push((verb.to_string(), ctx.cloned()));
            let delay = self.delays.get(verb).copied().unwrap_or(self.delay);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match self.replies.get(verb) {
                Some(Ok(output)) => Ok(output.clone()),
                Some(Err(())) => Err(PluginError::Spawn {
                    command: format!("fake-plugin {verb}"),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "scripted failure"),
                }),
                None => Ok(String::new()),
            }
        }
    }

    #[tokio::test]
    async fn test_commands_are_fetched_once() {
        let fake = Arc::new(FakePlugin::new().reply(
            "--commands",
            r#"[{"name":"echo","description":"Echo","args":[{"name":"message","description":"Text"}]}]"#,
        ));
        let cache = CapabilityCache::new(fake.clone());

        let first = cache.commands().await;
        let second = cache.commands().await;

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first[0].name, "echo");
        assert_eq!(fake.calls_to("--commands"), 1);
    }

    #[tokio::test]
    async fn test_concurrent_first_access_spawns_once() {
        let mut fake = FakePlugin::new().reply("--jobs", r#"[{"name":"tick","schedule":"* * * * *"}]"#);
        fake.delay = Duration::from_millis(50);
        let fake = Arc::new(fake);
        let cache = Arc::new(CapabilityCache::new(fake.clone()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move { cache.jobs().await }));
        }

        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap());
        }

        assert_eq!(fake.calls_to("--jobs"), 1);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[tokio::test]
    async fn test_concurrent_first_commands_access_invokes_once() {
        let fake = Arc::new(
            FakePlugin::new()
                .reply("--commands", r#"[{"name":"roll","description":"Roll a die"}]"#)
                .slow("--commands", Duration::from_millis(50)),
        );
        let cache = Arc::new(CapabilityCache::new(fake.clone()));

        let (a, b, c) = tokio::join!(cache.commands(), cache.commands(), cache.commands());

        assert_eq!(fake.calls_to("--commands"), 1);
        assert!(Arc::ptr_eq(&a, &b) && Arc::ptr_eq(&b, &c));
        assert_eq!(a[0].name, "roll");
    }

    #[tokio::test]
    async fn test_failures_degrade() {
        let fake = Arc::new(
            FakePlugin::new()
                .fail("--version")
                .fail("--commands")
                .reply("--jobs", "not json")
                .reply("--listeners", ""),
        );
        let cache = CapabilityCache::new(fake.clone());

        assert_eq!(&*cache.version().await, UNKNOWN_VERSION);
        assert!(cache.commands().await.is_empty());
        assert!(cache.jobs().await.is_empty());
        assert!(cache.listeners().await.is_empty());

        // Failures are memoized too.
        cache.commands().await;
        assert_eq!(fake.calls_to("--commands"), 1);
    }

    #[tokio::test]
    async fn test_invalid_command_is_dropped_alone() {
        let fake = Arc::new(FakePlugin::new().reply(
            "--commands",
            r#"[
                {"name":"good","description":"ok"},
                {"name":"bad","description":"no","args":[{"name":"x","description":"x","type":"tuple"}]}
            ]"#,
        ));
        let cache = CapabilityCache::new(fake);

        let commands = cache.commands().await;
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].name, "good");
    }
}
