//! Filesystem-backed content repository.
//!
//! The repository owns the request-time coherence protocol: every read
//! validates the cached entry's recorded modification time against the file
//! on disk and rebuilds the entry on any mismatch. Staleness is re-checked
//! per request; nothing is pushed, nothing is patched in place.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, warn};

use crate::cache::{CacheEntry, CacheError, CacheKey, CacheManager, CacheStore};
use crate::config::RepositorySettings;
use crate::telemetry::{METRIC_CACHE_DEGRADED, METRIC_CACHE_STALE};

use super::actions::{ActionDispatcher, ActionError, ActionRegistry};
use super::error::RepositoryError;
use super::fs::{DiskStore, FileStore};
use super::page::RequestContext;
use super::pageconfig::PageConfig;
use super::path::RelPath;
use super::view::{PassthroughRenderer, ViewRenderer};

/// Result of serving a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    /// Merged output from the view renderer.
    Rendered(String),
    /// A content action requested a redirect; rendering was skipped.
    Redirect(String),
}

/// A named repository over one filesystem root, with an optional content
/// cache and companion-configuration support.
pub struct FileSystemRepository {
    name: String,
    root: PathBuf,
    config_dir: String,
    config_suffix: String,
    write_allowed: bool,
    files: Arc<dyn FileStore>,
    cache: Option<Arc<CacheStore>>,
    actions: Arc<dyn ActionDispatcher>,
    renderer: Arc<dyn ViewRenderer>,
}

impl FileSystemRepository {
    /// Repository over the real filesystem with no cache, no registered
    /// actions, and a passthrough renderer. Collaborators attach via the
    /// `with_` methods.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            config_dir: "config".to_string(),
            config_suffix: "xml".to_string(),
            write_allowed: false,
            files: Arc::new(DiskStore),
            cache: None,
            actions: Arc::new(ActionRegistry::new()),
            renderer: Arc::new(PassthroughRenderer),
        }
    }

    /// Build a repository from configuration, resolving its cache by name.
    ///
    /// A configured cache name the manager does not know disables caching for
    /// this repository, logged but not fatal.
    pub fn from_settings(settings: &RepositorySettings, caches: &CacheManager) -> Self {
        let cache = match settings.cache.as_deref() {
            None | Some("") => None,
            Some(name) => {
                let store = caches.get_cache(name);
                if store.is_none() {
                    warn!(
                        repository = %settings.name,
                        cache = name,
                        "Configured cache is not registered; repository runs uncached"
                    );
                }
                store
            }
        };

        let mut repository = Self::new(settings.name.clone(), settings.root.clone())
            .with_config_dir(&settings.config_dir)
            .with_config_suffix(&settings.config_suffix)
            .with_write_allowed(settings.write_allowed);
        repository.cache = cache;
        repository
    }

    pub fn with_cache(mut self, cache: Arc<CacheStore>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_files(mut self, files: Arc<dyn FileStore>) -> Self {
        self.files = files;
        self
    }

    pub fn with_actions(mut self, actions: Arc<dyn ActionDispatcher>) -> Self {
        self.actions = actions;
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn ViewRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_write_allowed(mut self, write_allowed: bool) -> Self {
        self.write_allowed = write_allowed;
        self
    }

    pub fn with_config_dir(mut self, config_dir: &str) -> Self {
        self.config_dir = config_dir.trim_matches('/').to_string();
        self
    }

    pub fn with_config_suffix(mut self, suffix: &str) -> Self {
        self.config_suffix = suffix.trim_start_matches('.').to_string();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_allowed(&self) -> bool {
        self.write_allowed
    }

    pub fn cache(&self) -> Option<&Arc<CacheStore>> {
        self.cache.as_ref()
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Raw content bytes for a logical path, through the cache when one is
    /// configured.
    pub fn read(&self, path: &str) -> Result<Bytes, RepositoryError> {
        let rel = RelPath::parse(path)?;
        self.load_content(&rel)
    }

    /// Raw content as UTF-8 text.
    pub fn read_to_string(&self, path: &str) -> Result<String, RepositoryError> {
        let rel = RelPath::parse(path)?;
        self.content_text(&rel)
    }

    /// The companion configuration for a path, or `None` when no config file
    /// exists — which is the common case and not an error.
    pub fn page_config(&self, path: &str) -> Result<Option<Arc<PageConfig>>, RepositoryError> {
        let rel = RelPath::parse(path)?;
        self.load_page_config(&rel)
    }

    /// Serve a page: resolve content, apply companion configuration to the
    /// context, and render.
    ///
    /// Property injection runs before action execution; a redirect from an
    /// action short-circuits rendering.
    pub fn get(
        &self,
        path: &str,
        context: &mut RequestContext,
    ) -> Result<PageOutcome, RepositoryError> {
        let rel = RelPath::parse(path)?;
        let content = self.content_text(&rel)?;

        if let Some(config) = self.load_page_config(&rel)? {
            if let Some(redirect) = self.apply_page_config(&rel, &config, context)? {
                return Ok(PageOutcome::Redirect(redirect));
            }
        }

        let rendered = self.renderer.render(context, rel.as_str(), &content)?;
        Ok(PageOutcome::Rendered(rendered))
    }

    // ========================================================================
    // Writes and directories
    // ========================================================================

    /// Write content at a logical path.
    ///
    /// Gated on `write_allowed`; the cache entry is not invalidated here —
    /// the next read observes the changed modification time and reloads.
    pub fn write(&self, path: &str, data: &[u8]) -> Result<(), RepositoryError> {
        if !self.write_allowed {
            return Err(RepositoryError::write_not_permitted(&self.name));
        }
        let rel = RelPath::parse(path)?;
        self.files.write(&rel.under(&self.root), data)?;
        Ok(())
    }

    pub fn make_directory(&self, path: &str) -> Result<(), RepositoryError> {
        if !self.write_allowed {
            return Err(RepositoryError::write_not_permitted(&self.name));
        }
        let rel = RelPath::parse(path)?;
        self.files.make_dir(&rel.under(&self.root))?;
        Ok(())
    }

    /// Remove an empty directory; fails if the target is missing or has
    /// children.
    pub fn remove_directory(&self, path: &str) -> Result<(), RepositoryError> {
        if !self.write_allowed {
            return Err(RepositoryError::write_not_permitted(&self.name));
        }
        let rel = RelPath::parse(path)?;
        self.files.remove_dir(&rel.under(&self.root))?;
        Ok(())
    }

    // ========================================================================
    // Enumeration and cache control
    // ========================================================================

    /// Lazy breadth-first walk of every content path in the repository.
    ///
    /// A live filesystem walk, never cache-derived; the configuration
    /// directory subtree is excluded. Each call starts a fresh walk.
    pub fn paths(&self) -> ContentPaths {
        ContentPaths::new(
            Arc::clone(&self.files),
            self.root.clone(),
            self.root.clone(),
            Some(Path::new(&self.config_dir).to_path_buf()),
        )
    }

    /// Like [`paths`](Self::paths), rooted at `base`.
    pub fn paths_under(&self, base: &str) -> Result<ContentPaths, RepositoryError> {
        let rel = RelPath::parse(base)?;
        Ok(ContentPaths::new(
            Arc::clone(&self.files),
            self.root.clone(),
            rel.under(&self.root),
            Some(Path::new(&self.config_dir).to_path_buf()),
        ))
    }

    /// Manually flush the attached cache. Safe concurrently with readers; a
    /// no-op without a cache.
    pub fn clear_cache(&self) -> Result<(), CacheError> {
        match &self.cache {
            Some(cache) => cache.clear(),
            None => Ok(()),
        }
    }

    // ========================================================================
    // Coherence protocol
    // ========================================================================

    fn load_content(&self, rel: &RelPath) -> Result<Bytes, RepositoryError> {
        let file = rel.under(&self.root);

        let Some(cache) = &self.cache else {
            return self.read_file(&file, rel);
        };

        let modified = self.file_modified(&file, rel)?;
        let key = CacheKey::Content(rel.as_str().to_string());

        match cache.get(&key) {
            Ok(Some(entry)) if entry.is_current(modified) => {
                if let Some(body) = entry.as_content() {
                    return Ok(body.clone());
                }
                // A config entry under a content key cannot happen with the
                // tagged key space; treat it as a miss if a backend misbehaves.
            }
            Ok(Some(_)) => {
                counter!(METRIC_CACHE_STALE).increment(1);
                debug!(repository = %self.name, path = %rel, "Stale cache entry, reloading");
            }
            Ok(None) => {}
            Err(err) => {
                counter!(METRIC_CACHE_DEGRADED).increment(1);
                warn!(
                    repository = %self.name,
                    path = %rel,
                    error = %err,
                    "Cache lookup failed; serving uncached read for this request"
                );
                return self.read_file(&file, rel);
            }
        }

        let body = self.read_file(&file, rel)?;
        if let Err(err) = cache.put(key, CacheEntry::content(body.clone(), modified)) {
            counter!(METRIC_CACHE_DEGRADED).increment(1);
            warn!(
                repository = %self.name,
                path = %rel,
                error = %err,
                "Cache store failed; content served uncached"
            );
        }
        Ok(body)
    }

    fn content_text(&self, rel: &RelPath) -> Result<String, RepositoryError> {
        let body = self.load_content(rel)?;
        String::from_utf8(body.to_vec()).map_err(|_| RepositoryError::Encoding {
            path: rel.as_str().to_string(),
        })
    }

    fn load_page_config(&self, rel: &RelPath) -> Result<Option<Arc<PageConfig>>, RepositoryError> {
        let config_rel = rel.config_path(&self.config_dir, &self.config_suffix);
        let file = config_rel.under(&self.root);

        if !self.files.exists(&file) {
            return Ok(None);
        }

        let Some(cache) = &self.cache else {
            return self.parse_config_file(&file, rel).map(Some);
        };

        let modified = self.file_modified(&file, rel)?;
        let key = CacheKey::PageConfig(rel.as_str().to_string());

        match cache.get(&key) {
            Ok(Some(entry)) if entry.is_current(modified) => {
                if let Some(config) = entry.as_page_config() {
                    return Ok(Some(Arc::clone(config)));
                }
            }
            Ok(Some(_)) => {
                counter!(METRIC_CACHE_STALE).increment(1);
                debug!(repository = %self.name, path = %rel, "Stale page config, reloading");
            }
            Ok(None) => {}
            Err(err) => {
                counter!(METRIC_CACHE_DEGRADED).increment(1);
                warn!(
                    repository = %self.name,
                    path = %rel,
                    error = %err,
                    "Cache lookup failed; parsing page config uncached"
                );
                return self.parse_config_file(&file, rel).map(Some);
            }
        }

        let config = self.parse_config_file(&file, rel)?;
        if let Err(err) = cache.put(key, CacheEntry::page_config(Arc::clone(&config), modified)) {
            counter!(METRIC_CACHE_DEGRADED).increment(1);
            warn!(
                repository = %self.name,
                path = %rel,
                error = %err,
                "Cache store failed; page config served uncached"
            );
        }
        Ok(Some(config))
    }

    fn apply_page_config(
        &self,
        rel: &RelPath,
        config: &PageConfig,
        context: &mut RequestContext,
    ) -> Result<Option<String>, RepositoryError> {
        for property in &config.properties {
            context
                .page_mut()
                .set_property(&property.name, property.locale.as_deref(), &property.value);
        }

        for action in &config.actions {
            match self.actions.execute(&action.name, context, &action.config) {
                Ok(Some(redirect)) => return Ok(Some(redirect)),
                Ok(None) => {}
                Err(ActionError::Unknown { name }) => {
                    return Err(RepositoryError::configuration_invalid(
                        rel.as_str(),
                        format!("content action `{name}` cannot be resolved"),
                    ));
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(None)
    }

    fn parse_config_file(
        &self,
        file: &Path,
        rel: &RelPath,
    ) -> Result<Arc<PageConfig>, RepositoryError> {
        let raw = self.files.read(file)?;
        let text = std::str::from_utf8(&raw).map_err(|_| RepositoryError::Encoding {
            path: rel.as_str().to_string(),
        })?;
        PageConfig::parse(text)
            .map(Arc::new)
            .map_err(|err| RepositoryError::configuration_invalid(rel.as_str(), err.to_string()))
    }

    fn file_modified(&self, file: &Path, rel: &RelPath) -> Result<SystemTime, RepositoryError> {
        match self.files.modified(file) {
            Ok(modified) => Ok(modified),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(RepositoryError::content_not_found(rel.as_str()))
            }
            Err(err) => Err(err.into()),
        }
    }

    fn read_file(&self, file: &Path, rel: &RelPath) -> Result<Bytes, RepositoryError> {
        match self.files.read(file) {
            Ok(body) => Ok(body),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                Err(RepositoryError::content_not_found(rel.as_str()))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Lazy breadth-first enumeration of content paths.
///
/// Directories are visited level by level; files convert back to
/// repository-relative strings with `/` separators. I/O errors during the
/// walk surface as `Err` items.
pub struct ContentPaths {
    files: Arc<dyn FileStore>,
    root: PathBuf,
    skip: Option<PathBuf>,
    dirs: VecDeque<PathBuf>,
    ready: VecDeque<PathBuf>,
}

impl ContentPaths {
    fn new(files: Arc<dyn FileStore>, root: PathBuf, base: PathBuf, skip_rel: Option<PathBuf>) -> Self {
        let skip = skip_rel
            .filter(|rel| !rel.as_os_str().is_empty())
            .map(|rel| root.join(rel));
        let mut dirs = VecDeque::new();
        if files.exists(&base) {
            dirs.push_back(base);
        }
        Self {
            files,
            root,
            skip,
            dirs,
            ready: VecDeque::new(),
        }
    }

    fn relative(&self, path: &Path) -> String {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        rel.components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

impl Iterator for ContentPaths {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(file) = self.ready.pop_front() {
                return Some(Ok(self.relative(&file)));
            }
            let dir = self.dirs.pop_front()?;
            match self.files.list_dir(&dir) {
                Ok(entries) => {
                    for entry in entries {
                        if self.skip.as_deref() == Some(entry.path.as_path()) {
                            continue;
                        }
                        if entry.is_dir {
                            self.dirs.push_back(entry.path);
                        } else {
                            self.ready.push_back(entry.path);
                        }
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;
    use crate::content::fs::MemoryStore;

    fn mtime(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn repository_with(files: Arc<MemoryStore>) -> FileSystemRepository {
        FileSystemRepository::new("site", "root").with_files(files)
    }

    #[test]
    fn missing_content_is_content_not_found() {
        let files = Arc::new(MemoryStore::new());
        let repository = repository_with(files);
        let err = repository.read("nope.html").unwrap_err();
        assert!(matches!(err, RepositoryError::ContentNotFound { path } if path == "nope.html"));
    }

    #[test]
    fn missing_companion_config_is_not_an_error() {
        let files = Arc::new(MemoryStore::new());
        files.put_file("root/index.html", "hello", mtime(1));
        let repository = repository_with(files);

        assert!(repository.page_config("index.html").unwrap().is_none());

        let mut context = RequestContext::new("index.html");
        let outcome = repository.get("index.html", &mut context).unwrap();
        assert_eq!(outcome, PageOutcome::Rendered("hello".to_string()));
        assert_eq!(context.page().property_count(), 0);
    }

    #[test]
    fn page_config_injects_properties_before_actions() {
        let files = Arc::new(MemoryStore::new());
        files.put_file("root/news/today.html", "$title", mtime(1));
        files.put_file(
            "root/config/news/today.xml",
            r#"<page>
                <property name="title">Today</property>
                <content-action name="check-title"/>
            </page>"#,
            mtime(1),
        );

        let mut registry = ActionRegistry::new();
        registry.register("check-title", |context, _config| {
            let title = context.page().property("title").unwrap_or("").to_string();
            context.put("seen-title", title);
            Ok(None)
        });

        let repository = repository_with(files).with_actions(Arc::new(registry));
        let mut context = RequestContext::new("news/today.html");
        repository.get("news/today.html", &mut context).unwrap();

        assert_eq!(context.get("seen-title"), Some("Today"));
    }

    #[test]
    fn unresolvable_action_is_configuration_invalid() {
        let files = Arc::new(MemoryStore::new());
        files.put_file("root/index.html", "x", mtime(1));
        files.put_file(
            "root/config/index.xml",
            r#"<page><content-action name="ghost"/></page>"#,
            mtime(1),
        );

        let repository = repository_with(files);
        let mut context = RequestContext::new("index.html");
        let err = repository.get("index.html", &mut context).unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationInvalid { .. }));
    }

    #[test]
    fn malformed_property_is_configuration_invalid() {
        let files = Arc::new(MemoryStore::new());
        files.put_file("root/index.html", "x", mtime(1));
        files.put_file(
            "root/config/index.xml",
            "<page><property>no name</property></page>",
            mtime(1),
        );

        let repository = repository_with(files);
        let mut context = RequestContext::new("index.html");
        let err = repository.get("index.html", &mut context).unwrap_err();
        assert!(matches!(err, RepositoryError::ConfigurationInvalid { .. }));
    }

    #[test]
    fn action_redirect_short_circuits_rendering() {
        let files = Arc::new(MemoryStore::new());
        files.put_file("root/index.html", "x", mtime(1));
        files.put_file(
            "root/config/index.xml",
            r#"<page><content-action name="bounce"/><content-action name="after"/></page>"#,
            mtime(1),
        );

        let mut registry = ActionRegistry::new();
        registry.register("bounce", |_context, _config| Ok(Some("login.html".to_string())));
        registry.register("after", |_context, _config| {
            panic!("must not run after a redirect")
        });

        let repository = repository_with(files).with_actions(Arc::new(registry));
        let mut context = RequestContext::new("index.html");
        let outcome = repository.get("index.html", &mut context).unwrap();
        assert_eq!(outcome, PageOutcome::Redirect("login.html".to_string()));
    }

    #[test]
    fn write_gating_blocks_all_mutation() {
        let files = Arc::new(MemoryStore::new());
        let repository = repository_with(Arc::clone(&files));

        assert!(matches!(
            repository.write("a.html", b"x").unwrap_err(),
            RepositoryError::WriteNotPermitted { .. }
        ));
        assert!(matches!(
            repository.make_directory("d").unwrap_err(),
            RepositoryError::WriteNotPermitted { .. }
        ));
        assert!(!files.exists(Path::new("root/a.html")));
    }

    #[test]
    fn write_allowed_persists_content() {
        let files = Arc::new(MemoryStore::new());
        let repository = repository_with(Arc::clone(&files)).with_write_allowed(true);

        repository.write("sub/a.html", b"body").unwrap();
        assert_eq!(repository.read_to_string("sub/a.html").unwrap(), "body");
    }

    #[test]
    fn enumeration_is_breadth_first_and_skips_config_dir() {
        let files = Arc::new(MemoryStore::new());
        files.put_file("root/index.html", "x", mtime(1));
        files.put_file("root/news/today.html", "x", mtime(1));
        files.put_file("root/news/archive/old.html", "x", mtime(1));
        files.put_file("root/about.html", "x", mtime(1));
        files.put_file("root/config/index.xml", "<page/>", mtime(1));

        let repository = repository_with(files);
        let paths: Vec<String> = repository.paths().map(Result::unwrap).collect();

        assert_eq!(
            paths,
            vec![
                "about.html",
                "index.html",
                "news/today.html",
                "news/archive/old.html",
            ]
        );
    }

    #[test]
    fn enumeration_under_base_is_restartable() {
        let files = Arc::new(MemoryStore::new());
        files.put_file("root/news/today.html", "x", mtime(1));
        files.put_file("root/index.html", "x", mtime(1));

        let repository = repository_with(files);
        let first: Vec<String> = repository.paths_under("news").unwrap().map(Result::unwrap).collect();
        let second: Vec<String> = repository.paths_under("news").unwrap().map(Result::unwrap).collect();

        assert_eq!(first, vec!["news/today.html"]);
        assert_eq!(first, second);
    }

    #[test]
    fn traversal_outside_root_is_rejected() {
        let files = Arc::new(MemoryStore::new());
        let repository = repository_with(files);
        assert!(matches!(
            repository.read("../secret").unwrap_err(),
            RepositoryError::IllegalPath(_)
        ));
    }
}
