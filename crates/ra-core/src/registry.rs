//! Name → [`ContentSource`] mapping, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::traits::ContentSource;

/// Immutable set of registered sources, cheap to clone into spawned tasks.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    sources: Arc<HashMap<String, Arc<dyn ContentSource>>>,
}

impl SourceRegistry {
    /// Registers every source under its own [`ContentSource::name`]. A later
    /// source with the same name replaces an earlier one.
    pub fn new(sources: impl IntoIterator<Item = Arc<dyn ContentSource>>) -> Self {
        let sources = sources
            .into_iter()
            .map(|source| (source.name().to_string(), source))
            .collect();
        Self {
            sources: Arc::new(sources),
        }
    }

    /// Looks up a source, failing with `UnknownSource` before any network call.
    pub fn get(&self, name: &str) -> Result<Arc<dyn ContentSource>> {
        self.sources
            .get(name)
            .cloned()
            .ok_or_else(|| AppError::UnknownSource(name.to_string()))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.sources.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("sources", &self.names())
            .finish()
    }
}
