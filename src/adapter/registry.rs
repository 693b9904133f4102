//! Adapter registry
//!
//! Maps archive names to adapter constructors. Adapters handed out by
//! [`Registry::create`] are already wrapped in pagination expansion and
//! dedup filtering, in that order, so callers never see a bare adapter.

use crate::adapter::{DedupFilter, PaginationExpansion, SiteAdapter};
use crate::crawler::CrawlWindow;
use crate::storage::Storage;
use crate::HarvestError;
use std::sync::Arc;

/// Builds a fresh, unwrapped adapter
pub type AdapterConstructor =
    Arc<dyn Fn() -> Result<Box<dyn SiteAdapter>, HarvestError> + Send + Sync>;

/// What the decorators need to wrap an adapter
#[derive(Clone)]
pub struct AdapterContext {
    pub storage: Arc<dyn Storage>,
    pub window: CrawlWindow,
}

/// Name to constructor mapping, in registration order
#[derive(Clone, Default)]
pub struct Registry {
    entries: Vec<(String, AdapterConstructor)>,
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in archive
    pub fn with_builtin_sites() -> Self {
        let mut registry = Self::new();
        crate::sites::register_all(&mut registry);
        registry
    }

    /// Registers (or replaces) the constructor for `name`
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn() -> Result<Box<dyn SiteAdapter>, HarvestError> + Send + Sync + 'static,
    {
        let constructor: AdapterConstructor = Arc::new(constructor);
        match self.entries.iter_mut().find(|(known, _)| known == name) {
            Some(entry) => entry.1 = constructor,
            None => self.entries.push((name.to_string(), constructor)),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(known, _)| known == name)
    }

    /// Registered names, in registration order
    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Fails on the first name that is not registered
    pub fn validate_names<S: AsRef<str>>(&self, names: &[S]) -> Result<(), HarvestError> {
        for name in names {
            if !self.contains(name.as_ref()) {
                return Err(self.unknown(name.as_ref()));
            }
        }
        Ok(())
    }

    fn unknown(&self, name: &str) -> HarvestError {
        HarvestError::UnknownArchive {
            name: name.to_string(),
            known: self.names().join(", "),
        }
    }

    /// Builds the bare adapter for `name`, without decorators
    pub fn create_raw(&self, name: &str) -> Result<Box<dyn SiteAdapter>, HarvestError> {
        let (_, constructor) = self
            .entries
            .iter()
            .find(|(known, _)| known == name)
            .ok_or_else(|| self.unknown(name))?;
        constructor()
    }

    /// Builds the adapter for `name` wrapped in pagination, then dedup
    pub fn create(
        &self,
        name: &str,
        context: &AdapterContext,
    ) -> Result<Arc<dyn SiteAdapter>, HarvestError> {
        let adapter = self.create_raw(name)?;
        let paginated = PaginationExpansion::new(adapter);
        Ok(Arc::new(DedupFilter::new(
            Box::new(paginated),
            context.storage.clone(),
            context.window,
        )))
    }

    /// Builds wrapped adapters for `names`, in the given order
    pub fn create_list<S: AsRef<str>>(
        &self,
        names: &[S],
        context: &AdapterContext,
    ) -> Result<Vec<Arc<dyn SiteAdapter>>, HarvestError> {
        self.validate_names(names)?;
        names
            .iter()
            .map(|name| self.create(name.as_ref(), context))
            .collect()
    }

    /// Builds wrapped adapters for every registered archive
    pub fn create_all(
        &self,
        context: &AdapterContext,
    ) -> Result<Vec<Arc<dyn SiteAdapter>>, HarvestError> {
        self.create_list(&self.names(), context)
    }
}
