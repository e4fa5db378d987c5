//! Deduplicating registry of resolved plugin sources.
//!
//! The [`SourceRegistry`] hands out shared [`PluginSource`] instances so that
//! plugins from one monorepo, or the same dependency declared twice, are
//! cloned and built once. It only grows while a configuration is resolved and
//! is rebuilt from scratch on every reload.

use std::sync::Arc;

use crate::source::{PluginSource, is_equivalent};

/// Append-only collection of sources resolved for the current configuration.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<PluginSource>>,
}

impl SourceRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the registered source equivalent to `candidate`, registering
    /// the candidate when none exists.
    pub fn resolve(&mut self, candidate: PluginSource) -> Arc<PluginSource> {
        if let Some(existing) = self
            .sources
            .iter()
            .find(|source| is_equivalent(source, &candidate))
        {
            return Arc::clone(existing);
        }
        let source = Arc::new(candidate);
        self.sources.push(Arc::clone(&source));
        source
    }

    /// Registered sources in resolution order.
    #[must_use]
    pub fn sources(&self) -> &[Arc<PluginSource>] {
        &self.sources
    }

    /// Returns the number of distinct sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Returns `true` when no sources are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
