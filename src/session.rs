// src/session.rs

//! Plugin resolution sessions
//!
//! A [`ResolutionSession`] turns the plugins of a [`Configuration`] into an
//! execution scope:
//!
//! ```text
//! plugins ──> coordinate set ──> caller module descriptor
//!                                       |
//!                                       v
//!                   resolution cache (hit: reuse files)
//!                                       | miss
//!                                       v
//!                     descriptor file ──> backend ──> files
//!                                                      |
//!                                                      v
//!                     execution scope parented to the configuration's
//! ```
//!
//! Sessions are created from a [`ResolverContext`], which owns the backend
//! and the resolution cache shared by all of its sessions.

use crate::cache::ResolutionCache;
use crate::config::{Configuration, ConfigurationProvider};
use crate::coordinate::{CoordinateSet, PluginCoordinate};
use crate::descriptor::ModuleDescriptor;
use crate::error::{Error, ResolutionFailure, Result};
use crate::loader::ExecutionScope;
use crate::repository::{ArtifactResolver, RepositoryBackend, ResolveOptions};
use crate::settings::SettingsLocator;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempPath;
use tracing::{debug, info, warn};

/// Owner of the resolution backend and the shared resolution cache
///
/// The backend is built from the settings file the first time a session
/// needs it, unless one was supplied up front.
pub struct ResolverContext {
    locator: SettingsLocator,
    backend: Mutex<Option<Arc<dyn ArtifactResolver>>>,
    cache: Arc<ResolutionCache>,
}

impl ResolverContext {
    /// Context whose backend comes from the settings file `locator` finds
    pub fn new(locator: SettingsLocator) -> Self {
        Self {
            locator,
            backend: Mutex::new(None),
            cache: Arc::new(ResolutionCache::new()),
        }
    }

    /// Context around an already constructed backend
    pub fn with_backend(backend: Arc<dyn ArtifactResolver>) -> Self {
        Self {
            locator: SettingsLocator::new(),
            backend: Mutex::new(Some(backend)),
            cache: Arc::new(ResolutionCache::new()),
        }
    }

    /// Share an existing cache instead of the context's own
    pub fn with_cache(mut self, cache: Arc<ResolutionCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &Arc<ResolutionCache> {
        &self.cache
    }

    /// The backend, initializing it from the settings file on first use
    pub fn backend(&self) -> Result<Arc<dyn ArtifactResolver>> {
        let mut backend = self
            .backend
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = backend.as_ref() {
            return Ok(Arc::clone(existing));
        }

        let settings = self.locator.load()?;
        info!(
            "Initialized resolver with cache {} and {} repositories",
            settings.cache_dir.display(),
            settings.repositories.len()
        );
        let created: Arc<dyn ArtifactResolver> = Arc::new(RepositoryBackend::new(settings));
        *backend = Some(Arc::clone(&created));
        Ok(created)
    }

    /// Drop the backend and forget cached resolutions
    pub fn shutdown(&self) {
        self.backend
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        self.cache.clear();
    }

    /// Start a new online, non-verbose session
    pub fn session(self: &Arc<Self>) -> ResolutionSession {
        ResolutionSession::new(Arc::clone(self))
    }
}

/// State prepared by [`ResolutionSession::init`]
struct Prepared {
    backend: Arc<dyn ArtifactResolver>,
    options: ResolveOptions,
    descriptor_file: TempPath,
}

/// One attempt at resolving a batch of plugins
pub struct ResolutionSession {
    context: Arc<ResolverContext>,
    offline: bool,
    verbose: bool,
    coordinates: CoordinateSet,
    descriptor: Option<ModuleDescriptor>,
    prepared: Option<Prepared>,
}

impl ResolutionSession {
    pub fn new(context: Arc<ResolverContext>) -> Self {
        Self {
            context,
            offline: false,
            verbose: false,
            coordinates: CoordinateSet::new(),
            descriptor: None,
            prepared: None,
        }
    }

    /// Restrict resolution to the local cache regardless of configuration
    pub fn offline(mut self, offline: bool) -> Self {
        self.offline = offline;
        self
    }

    /// Log informational backend messages instead of errors only
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn is_offline(&self) -> bool {
        self.offline
    }

    pub fn coordinates(&self) -> &CoordinateSet {
        &self.coordinates
    }

    pub fn descriptor(&self) -> Option<&ModuleDescriptor> {
        self.descriptor.as_ref()
    }

    /// Options the next resolution will use, once initialized
    pub fn options(&self) -> Option<&ResolveOptions> {
        self.prepared.as_ref().map(|p| &p.options)
    }

    /// Transient descriptor file, removed when the session is dropped
    pub fn descriptor_path(&self) -> Option<&Path> {
        self.prepared.as_ref().map(|p| p.descriptor_file.as_ref())
    }

    /// Acquire the backend and decide how this session resolves
    ///
    /// An offline session always uses the cache only. An online session
    /// does too when the configuration's `offline` parameter is true.
    pub fn init(&mut self, configuration: &Configuration) -> Result<()> {
        let backend = self.context.backend()?;
        backend.set_verbose(self.verbose);

        let use_cache_only = self.offline || configuration.offline_requested();
        let options = ResolveOptions::default().cache_only(use_cache_only);

        let descriptor_file = tempfile::Builder::new()
            .prefix("ivy")
            .suffix(".xml")
            .tempfile()?
            .into_temp_path();

        debug!(
            "Resolution session ready (cache only: {}, descriptor: {})",
            use_cache_only,
            descriptor_file.display()
        );
        self.prepared = Some(Prepared {
            backend,
            options,
            descriptor_file,
        });
        Ok(())
    }

    /// Declare a plugin to resolve
    ///
    /// Declaring the same coordinate twice has no effect.
    pub fn add_artifact(&mut self, group: &str, artifact: &str, version: &str) -> Result<()> {
        let coordinate = PluginCoordinate::parse_parts(group, artifact, version)?;
        if !self.coordinates.insert(coordinate.clone()) {
            debug!("{} already declared", coordinate);
            return Ok(());
        }

        self.descriptor
            .get_or_insert_with(|| ModuleDescriptor::caller_of(&coordinate))
            .add_dependency(coordinate);
        Ok(())
    }

    /// Resolve every declared plugin to local files
    ///
    /// Nothing declared means nothing to resolve: the backend is not called.
    pub fn resolve_artifacts(&self) -> Result<Vec<PathBuf>> {
        let Some(descriptor) = self.descriptor.as_ref() else {
            return Ok(Vec::new());
        };
        let prepared = self.prepared.as_ref().ok_or_else(|| {
            Error::InitError("Resolution session used before initialization".to_string())
        })?;

        self.context.cache().resolve_with(&self.coordinates, || {
            descriptor.write_to(&prepared.descriptor_file)?;
            let report = prepared
                .backend
                .resolve(&prepared.descriptor_file, &prepared.options)?;

            if !report.has_error() {
                return Ok(report.local_files());
            }

            let mut problems = Vec::with_capacity(report.problems.len());
            for problem in &report.problems {
                warn!("{}", problem.message);
                problems.push(problem.message.clone());
            }
            let plugin = report.problems.iter().find_map(|p| p.coordinate.clone());
            Err(Error::Unresolved(
                ResolutionFailure::new(problems).with_plugin(plugin),
            ))
        })
    }

    fn resolve_plugins(
        &mut self,
        configuration: &Configuration,
        current: &mut Option<PluginCoordinate>,
    ) -> Result<Vec<PathBuf>> {
        self.init(configuration)?;
        for plugin in configuration.plugins() {
            *current = Some(plugin.coordinate());
            self.add_artifact(&plugin.group_id, &plugin.artifact_id, &plugin.version)?;
        }
        self.resolve_artifacts()
    }
}

/// Attach plugin context to a failure raised while loading
fn contextualize(err: Error, current: Option<PluginCoordinate>) -> Error {
    match err {
        Error::ConfigError(_) => err,
        Error::Unresolved(ref failure) => {
            match failure.plugin().cloned().or(current) {
                Some(coordinate) => Error::PluginError {
                    coordinate,
                    reason: err.to_string(),
                },
                None => err,
            }
        }
        other => match current {
            Some(coordinate) => Error::PluginError {
                coordinate,
                reason: other.to_string(),
            },
            None => Error::InitError(format!(
                "Unable to initialize plugin configuration: {other}"
            )),
        },
    }
}

impl ConfigurationProvider for ResolutionSession {
    /// Resolve the configuration's plugins and replace its scope
    ///
    /// Either every plugin is loaded or none is: on any failure the
    /// configuration keeps its previous scope.
    fn load(&mut self, configuration: &mut Configuration) -> Result<()> {
        if configuration.plugins().is_empty() {
            debug!("No plugins declared");
            return Ok(());
        }
        info!("Resolving {} plugins", configuration.plugins().len());

        let mut current = None;
        let files = self
            .resolve_plugins(configuration, &mut current)
            .map_err(|e| contextualize(e, current.clone()))?;

        let scope = ExecutionScope::with_parent(files, Arc::clone(configuration.scope()))?;
        info!("Loaded {} plugin artifacts", scope.entries().len());
        configuration.set_scope(scope);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{ArtifactReport, Problem, ResolveReport};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend answering every request with the same report
    struct FixedBackend {
        report: ResolveReport,
        calls: AtomicUsize,
    }

    impl ArtifactResolver for FixedBackend {
        fn resolve(&self, _descriptor: &Path, _options: &ResolveOptions) -> Result<ResolveReport> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.report.clone())
        }
    }

    fn context(report: ResolveReport) -> (Arc<ResolverContext>, Arc<FixedBackend>) {
        let backend = Arc::new(FixedBackend {
            report,
            calls: AtomicUsize::new(0),
        });
        let context = Arc::new(ResolverContext::with_backend(backend.clone()));
        (context, backend)
    }

    #[test]
    fn test_add_artifact_is_idempotent() {
        let (context, _) = context(ResolveReport::default());
        let mut session = context.session();
        session.add_artifact("org.example", "pluginA", "1.0").unwrap();
        session.add_artifact("org.example", "pluginA", "1.0").unwrap();
        session.add_artifact("org.example", "pluginB", "2.0").unwrap();

        assert_eq!(session.coordinates().len(), 2);
        let descriptor = session.descriptor().unwrap();
        assert_eq!(descriptor.dependencies().len(), 2);
        assert_eq!(descriptor.root().module, "pluginA-caller");
    }

    #[test]
    fn test_add_artifact_rejects_invalid_coordinate() {
        let (context, _) = context(ResolveReport::default());
        let mut session = context.session();
        assert!(session.add_artifact("org.example", "", "1.0").is_err());
        assert!(session.descriptor().is_none());
    }

    #[test]
    fn test_nothing_declared_skips_backend() {
        let (context, backend) = context(ResolveReport::default());
        let session = context.session();
        assert!(session.resolve_artifacts().unwrap().is_empty());
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_before_init_fails() {
        let (context, _) = context(ResolveReport::default());
        let mut session = context.session();
        session.add_artifact("g", "a", "1").unwrap();
        assert!(matches!(session.resolve_artifacts(), Err(Error::InitError(_))));
    }

    #[test]
    fn test_offline_parameter_downgrades_online_session() {
        let (context, _) = context(ResolveReport::default());
        let config = Configuration::new().with_parameter("offline", serde_json::json!("true"));

        let mut session = context.session();
        session.init(&config).unwrap();
        assert!(session.options().unwrap().use_cache_only);

        let mut online = context.session();
        online.init(&Configuration::new()).unwrap();
        assert!(!online.options().unwrap().use_cache_only);
    }

    #[test]
    fn test_failure_attributed_to_reported_plugin() {
        let b = PluginCoordinate::new("org.example", "pluginB", "2.0");
        let (context, _) = context(ResolveReport {
            problems: vec![Problem::for_plugin(b.clone(), "module not found")],
            ..ResolveReport::default()
        });
        let mut config = Configuration::new()
            .with_plugin(crate::config::PluginConfig::new("org.example", "pluginB", "2.0"))
            .with_plugin(crate::config::PluginConfig::new("org.example", "pluginC", "3.0"));

        let err = context.session().load(&mut config).unwrap_err();
        match err {
            Error::PluginError { coordinate, reason } => {
                assert_eq!(coordinate, b);
                assert!(reason.contains("module not found"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_contextualize_without_plugin() {
        let err = contextualize(Error::ParseError("bad".to_string()), None);
        assert_eq!(
            err.to_string(),
            "Unable to initialize plugin configuration: Parse error: bad"
        );

        let config = contextualize(Error::ConfigError("missing".to_string()), None);
        assert!(config.is_config_error());
    }

    #[test]
    fn test_descriptor_file_removed_on_drop() {
        let dir = tempfile::TempDir::new().unwrap();
        let jar = dir.path().join("a-1.jar");
        std::fs::write(&jar, b"PK").unwrap();
        let (context, _) = context(ResolveReport {
            artifacts: vec![ArtifactReport {
                coordinate: PluginCoordinate::new("g", "a", "1"),
                local_file: jar,
            }],
            ..ResolveReport::default()
        });

        let mut session = context.session();
        session.init(&Configuration::new()).unwrap();
        session.add_artifact("g", "a", "1").unwrap();
        session.resolve_artifacts().unwrap();

        let path = session.descriptor_path().unwrap().to_path_buf();
        assert!(path.is_file());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("xml"));
        drop(session);
        assert!(!path.exists());
    }
}
