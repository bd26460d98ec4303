//! Cache manager: named store registry built from configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::CacheSettings;

use super::store::{CacheStore, LruBackend};

/// Owns the named [`CacheStore`] instances declared in configuration and
/// resolves them by name.
///
/// Loading has partial-failure semantics: a definition with an unknown backend
/// identifier, a blank name, or a duplicate name is logged and skipped without
/// aborting the remaining definitions.
#[derive(Default)]
pub struct CacheManager {
    stores: HashMap<String, Arc<CacheStore>>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every store declared in `definitions`, skipping bad ones.
    pub fn from_settings(definitions: &[CacheSettings]) -> Self {
        let mut manager = Self::new();
        for definition in definitions {
            match build_store(definition) {
                Ok(store) => {
                    if manager.register(store) {
                        info!(
                            cache = %definition.name,
                            backend = %definition.backend,
                            capacity = definition.capacity,
                            flush_interval_ms = definition.flush_interval.as_millis() as u64,
                            "Registered cache"
                        );
                    } else {
                        warn!(
                            cache = %definition.name,
                            "Skipping cache definition with blank or duplicate name"
                        );
                    }
                }
                Err(reason) => {
                    warn!(
                        cache = %definition.name,
                        backend = %definition.backend,
                        reason,
                        "Skipping cache definition that could not be instantiated"
                    );
                }
            }
        }
        manager
    }

    /// Register a store under its own name.
    ///
    /// Returns `false` without registering when the name is blank or already
    /// taken; names are unique.
    pub fn register(&mut self, store: CacheStore) -> bool {
        let name = store.name().to_string();
        if name.is_empty() || self.stores.contains_key(&name) {
            return false;
        }
        self.stores.insert(name, Arc::new(store));
        true
    }

    /// Look up a store by name.
    ///
    /// An empty or unknown name yields `None`, which callers treat as
    /// "caching disabled", not as an error.
    pub fn get_cache(&self, name: &str) -> Option<Arc<CacheStore>> {
        if name.is_empty() {
            return None;
        }
        self.stores.get(name).cloned()
    }

    /// Names of every registered store.
    pub fn cache_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.stores.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

fn build_store(definition: &CacheSettings) -> Result<CacheStore, &'static str> {
    let backend = match definition.backend.as_str() {
        "lru" => Box::new(LruBackend::new(definition.capacity)),
        _ => return Err("unknown backend identifier"),
    };
    Ok(CacheStore::new(definition.name.clone(), backend)
        .with_flush_interval(definition.flush_interval))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn definition(name: &str, backend: &str) -> CacheSettings {
        CacheSettings {
            name: name.to_string(),
            backend: backend.to_string(),
            capacity: 16,
            flush_interval: Duration::from_secs(60),
        }
    }

    #[test]
    fn builds_declared_stores() {
        let manager =
            CacheManager::from_settings(&[definition("content", "lru"), definition("assets", "lru")]);

        assert_eq!(manager.cache_names(), vec!["assets", "content"]);
        let store = manager.get_cache("content").expect("content cache");
        assert_eq!(store.name(), "content");
        assert_eq!(store.flush_interval(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn unknown_backend_is_skipped_not_fatal() {
        let manager = CacheManager::from_settings(&[
            definition("broken", "redis"),
            definition("content", "lru"),
        ]);

        assert!(manager.get_cache("broken").is_none());
        assert!(manager.get_cache("content").is_some());
    }

    #[test]
    fn duplicate_and_blank_names_are_skipped() {
        let manager = CacheManager::from_settings(&[
            definition("content", "lru"),
            definition("content", "lru"),
            definition("", "lru"),
        ]);

        assert_eq!(manager.cache_names(), vec!["content"]);
    }

    #[test]
    fn empty_or_unknown_name_means_no_cache() {
        let manager = CacheManager::from_settings(&[definition("content", "lru")]);
        assert!(manager.get_cache("").is_none());
        assert!(manager.get_cache("nope").is_none());
    }
}
