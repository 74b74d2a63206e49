//! Capability registry: namespaces of commands, with lazily loaded plugins.

use crate::capability::Command;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Map separator characters to the joining character used for entry names.
pub fn normalize_name(name: &str) -> String {
    name.replace(['-', ' ', '.'], "_")
}

/// Something reachable by name inside a namespace.
#[derive(Clone)]
pub enum Entry {
    Namespace(Arc<Namespace>),
    Command(Arc<Command>),
}

impl std::fmt::Debug for Entry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Entry::Namespace(ns) => write!(f, "Namespace({})", ns.name()),
            Entry::Command(cmd) => write!(f, "Command({})", cmd.name()),
        }
    }
}

/// An explicit lookup table of named entries.
#[derive(Clone, Default)]
pub struct Namespace {
    name: String,
    summary: Option<String>,
    entries: IndexMap<String, Entry>,
}

impl Namespace {
    pub fn new(name: &str) -> Self {
        Self {
            name: normalize_name(name),
            summary: None,
            entries: IndexMap::new(),
        }
    }

    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }

    /// Add a command under its own (normalized) name.
    pub fn add_command(&mut self, command: Command) {
        let key = normalize_name(command.name());
        self.entries.insert(key, Entry::Command(Arc::new(command)));
    }

    pub fn add_namespace(&mut self, namespace: Namespace) {
        let key = namespace.name.clone();
        self.entries.insert(key, Entry::Namespace(Arc::new(namespace)));
    }

    pub fn with_command(mut self, command: Command) -> Self {
        self.add_command(command);
        self
    }

    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.add_namespace(namespace);
        self
    }

    pub fn get(&self, name: &str) -> Option<Entry> {
        self.entries.get(name).cloned()
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Commands directly inside this namespace, in registration order.
    pub fn commands(&self) -> Vec<Arc<Command>> {
        self.entries
            .values()
            .filter_map(|entry| match entry {
                Entry::Command(cmd) => Some(Arc::clone(cmd)),
                Entry::Namespace(_) => None,
            })
            .collect()
    }
}

/// Provider of namespaces loaded on demand (the plugin side of the root).
pub trait PluginSource: Send + Sync {
    /// Names this source can load, used for listings and fuzzy matching.
    fn available(&self) -> Vec<String>;

    /// Load the namespace `name`; `Ok(None)` when this source does not know it.
    fn load(&self, name: &str) -> anyhow::Result<Option<Namespace>>;
}

type NamespaceFactory = Box<dyn Fn() -> anyhow::Result<Namespace> + Send + Sync>;

/// In-process plugin source backed by namespace factories.
#[derive(Default)]
pub struct PluginCatalog {
    factories: IndexMap<String, NamespaceFactory>,
}

impl PluginCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> anyhow::Result<Namespace> + Send + Sync + 'static,
    {
        self.factories.insert(normalize_name(name), Box::new(factory));
    }

    pub fn with<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> anyhow::Result<Namespace> + Send + Sync + 'static,
    {
        self.register(name, factory);
        self
    }
}

impl PluginSource for PluginCatalog {
    fn available(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    fn load(&self, name: &str) -> anyhow::Result<Option<Namespace>> {
        match self.factories.get(name) {
            Some(factory) => factory().map(Some),
            None => Ok(None),
        }
    }
}

/// Root of the capability tree.
///
/// Names resolve against the built-in namespace first, then against plugin
/// sources in registration order. Plugin loads are cached per name, including
/// misses; load failures are not cached so a later attempt can succeed.
pub struct Registry {
    builtins: Namespace,
    sources: Vec<Box<dyn PluginSource>>,
    cache: RwLock<HashMap<String, Option<Arc<Namespace>>>>,
}

impl Registry {
    pub fn new(builtins: Namespace) -> Self {
        Self {
            builtins,
            sources: Vec::new(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn add_source(&mut self, source: Box<dyn PluginSource>) {
        self.sources.push(source);
        self.cache.write().clear();
    }

    pub fn builtins(&self) -> &Namespace {
        &self.builtins
    }

    /// Look up a root-level name. The error text describes why it failed.
    pub fn lookup(&self, name: &str) -> Result<Entry, String> {
        if let Some(entry) = self.builtins.get(name) {
            return Ok(entry);
        }

        if let Some(cached) = self.cache.read().get(name) {
            return cached
                .clone()
                .map(Entry::Namespace)
                .ok_or_else(|| format!("No capability named '{}'", name));
        }

        let mut failure = None;
        for source in &self.sources {
            match source.load(name) {
                Ok(Some(namespace)) => {
                    debug!(name, "Loaded plugin namespace");
                    let namespace = Arc::new(namespace);
                    self.cache
                        .write()
                        .insert(name.to_string(), Some(Arc::clone(&namespace)));
                    return Ok(Entry::Namespace(namespace));
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(name, error = %e, "Plugin failed to load");
                    failure = Some(format!("Failed to load '{}': {:#}", name, e));
                }
            }
        }

        match failure {
            Some(message) => Err(message),
            None => {
                self.cache.write().insert(name.to_string(), None);
                Err(format!("No capability named '{}'", name))
            }
        }
    }

    /// Every root-level name: builtins first, then plugin names.
    pub fn names(&self) -> Vec<String> {
        let mut names = self.builtins.names();
        for source in &self.sources {
            for name in source.available() {
                if !names.contains(&name) {
                    names.push(name);
                }
            }
        }
        names
    }
}
