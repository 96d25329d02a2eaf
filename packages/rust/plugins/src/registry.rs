//! Identifier → plugin factory registry.
//!
//! Plugins are independent variants composed via this registry in
//! configuration order; there is no inheritance hierarchy to extend —
//! registering a factory under a new identifier is the whole contract.

use std::collections::BTreeMap;

use tracing::warn;

use crate::builtin::{ReadabilityPlugin, SeoPlugin, WordStatsPlugin};
use crate::{Plugin, PluginMetadata};

/// Constructor for a registered plugin.
pub type PluginFactory = fn() -> Box<dyn Plugin>;

/// Maps plugin identifiers to their factories.
pub struct PluginRegistry {
    factories: BTreeMap<&'static str, PluginFactory>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// A registry pre-populated with the built-in plugins.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register("seo", || Box::new(SeoPlugin));
        registry.register("readability", || Box::new(ReadabilityPlugin));
        registry.register("word-stats", || Box::new(WordStatsPlugin));
        registry
    }

    /// Register a factory under an identifier. Later registrations replace
    /// earlier ones.
    pub fn register(&mut self, identifier: &'static str, factory: PluginFactory) {
        self.factories.insert(identifier, factory);
    }

    /// Resolve a configured identifier list into an ordered plugin chain.
    ///
    /// Returns the resolved plugins plus the identifiers that matched
    /// nothing (reported as `Skipped` outcomes by the pipeline).
    pub fn build(&self, enabled: &[String]) -> (Vec<Box<dyn Plugin>>, Vec<String>) {
        let mut plugins = Vec::with_capacity(enabled.len());
        let mut unknown = Vec::new();

        for identifier in enabled {
            match self.factories.get(identifier.as_str()) {
                Some(factory) => plugins.push(factory()),
                None => {
                    warn!(plugin = %identifier, "unknown plugin identifier, skipping");
                    unknown.push(identifier.clone());
                }
            }
        }

        (plugins, unknown)
    }

    /// Metadata for every registered plugin, in identifier order.
    pub fn metadata(&self) -> Vec<PluginMetadata> {
        self.factories
            .values()
            .map(|factory| factory().metadata())
            .collect()
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
