//! Site composition root.
//!
//! Wires configuration into live objects: one [`CacheManager`] plus every
//! declared repository, resolved against it by name. Ownership is explicit —
//! nothing is stashed in ambient global state; embedders hold the `Site` (or
//! the pieces) themselves.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::cache::CacheManager;
use crate::config::Settings;
use crate::content::FileSystemRepository;

pub struct Site {
    caches: CacheManager,
    repositories: HashMap<String, Arc<FileSystemRepository>>,
}

impl Site {
    /// Build the cache manager and all repositories from settings.
    ///
    /// Duplicate repository names keep the first definition; cache wiring
    /// failures degrade individual repositories to uncached operation rather
    /// than failing the site.
    pub fn from_settings(settings: &Settings) -> Self {
        let caches = CacheManager::from_settings(&settings.caches);

        let mut repositories = HashMap::new();
        for definition in &settings.repositories {
            if repositories.contains_key(&definition.name) {
                continue;
            }
            let repository = FileSystemRepository::from_settings(definition, &caches);
            info!(
                repository = %definition.name,
                root = %definition.root.display(),
                cached = repository.cache().is_some(),
                "Registered repository"
            );
            repositories.insert(definition.name.clone(), Arc::new(repository));
        }

        Self {
            caches,
            repositories,
        }
    }

    pub fn cache_manager(&self) -> &CacheManager {
        &self.caches
    }

    pub fn repository(&self, name: &str) -> Option<&Arc<FileSystemRepository>> {
        self.repositories.get(name)
    }

    pub fn repository_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.repositories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;
    use crate::config::{CacheSettings, LogFormat, LoggingSettings, RepositorySettings};
    use tracing::level_filters::LevelFilter;

    fn settings() -> Settings {
        Settings {
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            caches: vec![CacheSettings {
                name: "content".to_string(),
                backend: "lru".to_string(),
                capacity: 64,
                flush_interval: Duration::ZERO,
            }],
            repositories: vec![
                RepositorySettings {
                    name: "site".to_string(),
                    root: PathBuf::from("/srv/site/content"),
                    cache: Some("content".to_string()),
                    write_allowed: false,
                    config_dir: "config".to_string(),
                    config_suffix: "xml".to_string(),
                },
                RepositorySettings {
                    name: "uncached".to_string(),
                    root: PathBuf::from("/srv/site/static"),
                    cache: Some("missing-cache".to_string()),
                    write_allowed: true,
                    config_dir: "config".to_string(),
                    config_suffix: "xml".to_string(),
                },
            ],
        }
    }

    #[test]
    fn wires_repositories_to_declared_caches() {
        let site = Site::from_settings(&settings());

        assert_eq!(site.repository_names(), vec!["site", "uncached"]);
        let cached = site.repository("site").expect("site repository");
        assert!(cached.cache().is_some());
        assert_eq!(cached.cache().unwrap().name(), "content");
    }

    #[test]
    fn unknown_cache_name_degrades_to_uncached() {
        let site = Site::from_settings(&settings());
        let repository = site.repository("uncached").expect("uncached repository");
        assert!(repository.cache().is_none());
        assert!(repository.write_allowed());
    }

    #[test]
    fn unknown_repository_is_absent() {
        let site = Site::from_settings(&settings());
        assert!(site.repository("nope").is_none());
    }
}
