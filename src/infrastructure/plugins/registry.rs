//! Plugin registry - Discovers plugin command lines and owns the loaded plugins

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use super::cache::CapabilityCache;
use super::handle::{Plugin, PluginDefinition, PluginHandle};
use crate::application::errors::ConfigError;

/// A discovered plugin: its definition, invocation handle and metadata cache
pub struct LoadedPlugin {
    definition: PluginDefinition,
    handle: Arc<dyn Plugin>,
    capabilities: CapabilityCache,
}

impl LoadedPlugin {
    pub fn new(definition: PluginDefinition, handle: Arc<dyn Plugin>) -> Self {
        Self {
            capabilities: CapabilityCache::new(handle.clone()),
            definition,
            handle,
        }
    }

    pub fn definition(&self) -> &PluginDefinition {
        &self.definition
    }

    pub fn handle(&self) -> &Arc<dyn Plugin> {
        &self.handle
    }

    pub fn capabilities(&self) -> &CapabilityCache {
        &self.capabilities
    }
}

/// Where plugin command lines come from
#[derive(Debug, Clone, Default)]
pub struct PluginSource {
    /// File with one command line per line
    pub file: Option<PathBuf>,
    /// Extra command lines, appended after the file's
    pub execute: Vec<String>,
}

impl PluginSource {
    /// Read all command lines; a missing file contributes none
    pub fn read(&self) -> Result<Vec<PluginDefinition>, ConfigError> {
        let mut lines = Vec::new();

        if let Some(path) = &self.file {
            lines.extend(read_plugins_file(path)?);
        }
        lines.extend(self.execute.iter().cloned());

        let mut seen = HashSet::new();
        Ok(lines
            .into_iter()
            .map(PluginDefinition::new)
            .filter(|def| !def.execute.is_empty() && !def.execute.starts_with('#'))
            .filter(|def| seen.insert(def.execute.clone()))
            .collect())
    }
}

fn read_plugins_file(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        tracing::info!(
            "Plugins file {} does not exist, so no plugins will be loaded.",
            path.display()
        );
        return Ok(Vec::new());
    }

    tracing::info!("Loading plugins from {}", path.display());
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Parse(format!("Failed to read plugins file {}: {}", path.display(), e)))?;

    Ok(content.lines().map(str::to_string).collect())
}

/// Registry owning every loaded plugin for the life of the process
pub struct PluginRegistry {
    plugins: Vec<Arc<LoadedPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self { plugins: Vec::new() }
    }

    /// Build a process handle for every command line. No process is spawned here.
    pub fn discover(source: &PluginSource, timeout: Duration, pool: Arc<Semaphore>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();

        for definition in source.read()? {
            let handle = PluginHandle::new(definition.clone(), timeout, pool.clone());
            registry.insert(LoadedPlugin::new(definition, Arc::new(handle)));
        }

        tracing::info!("Discovered {} plugins", registry.len());
        Ok(registry)
    }

    pub fn insert(&mut self, plugin: LoadedPlugin) -> Arc<LoadedPlugin> {
        let plugin = Arc::new(plugin);
        self.plugins.push(plugin.clone());
        plugin
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LoadedPlugin>> {
        self.plugins.iter()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_no_plugins() {
        let source = PluginSource {
            file: Some(PathBuf::from("/definitely/not/here/plugins")),
            execute: Vec::new(),
        };
        let registry = PluginRegistry::discover(&source, Duration::from_secs(1), Arc::new(Semaphore::new(1))).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_reads_file_then_inline_entries() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "casper7-plugin-echo").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "# disabled-plugin").unwrap();
        writeln!(file, "  python -m meatball  ").unwrap();

        let source = PluginSource {
            file: Some(file.path().to_path_buf()),
            execute: vec!["casper7-plugin-echo".to_string(), "wordle".to_string()],
        };

        let executes: Vec<String> = source.read().unwrap().into_iter().map(|d| d.execute).collect();
        assert_eq!(executes, vec!["casper7-plugin-echo", "python -m meatball", "wordle"]);
    }

    #[test]
    fn test_discovery_keeps_order() {
        let source = PluginSource {
            file: None,
            execute: vec!["Meatball Day".to_string(), "wordle".to_string()],
        };
        let registry = PluginRegistry::discover(&source, Duration::from_secs(1), Arc::new(Semaphore::new(1))).unwrap();
        let slugs: Vec<String> = registry.iter().map(|p| p.definition().slug()).collect();
        assert_eq!(slugs, vec!["meatball-day", "wordle"]);
    }
}
