// src/repository/backend.rs

//! Maven-layout repository backend
//!
//! # Resolution
//!
//! Dependencies of the descriptor are resolved depth-first, in declaration
//! order. For every module the backend needs its POM (for transitive
//! dependencies and packaging) and its jar:
//!
//! ```text
//! <cache>/<group path>/<artifact>/<version>/<artifact>-<version>.{pom,jar}
//!     |
//!     | missing and online
//!     v
//! filesystem repositories (copied into the cache)
//!     |
//!     | still missing
//!     v
//! remote repositories (downloaded into the cache)
//! ```
//!
//! Offline resolution stops after the cache. The first version of a
//! `group:artifact` that is reached wins, and the exclude rules of a declared
//! dependency apply to its whole closure.

use super::client::RepositoryClient;
use super::pom::Pom;
use super::{ArtifactReport, ArtifactResolver, Problem, ResolveOptions, ResolveReport};
use crate::coordinate::PluginCoordinate;
use crate::descriptor::{DependencyDescriptor, ModuleDescriptor};
use crate::error::{Error, Result};
use crate::settings::{RepositoryConfig, ResolverSettings};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info};

/// A module present in the local cache
#[derive(Debug)]
struct CachedModule {
    jar: Option<PathBuf>,
    dependencies: Vec<PluginCoordinate>,
}

/// Resolver over a local cache and a list of repositories
pub struct RepositoryBackend {
    settings: ResolverSettings,
    verbose: AtomicBool,
}

impl RepositoryBackend {
    pub fn new(settings: ResolverSettings) -> Self {
        Self {
            settings,
            verbose: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    fn message(&self, msg: impl fmt::Display) {
        if self.verbose.load(Ordering::Relaxed) {
            info!("{}", msg);
        } else {
            debug!("{}", msg);
        }
    }

    fn cache_path(&self, coordinate: &PluginCoordinate, extension: &str) -> PathBuf {
        self.settings
            .cache_dir
            .join(coordinate.repository_dir())
            .join(format!("{}.{}", coordinate.file_stem(), extension))
    }

    /// Resolve the closure of one declared dependency into `report`
    fn resolve_dependency(
        &self,
        root: &DependencyDescriptor,
        options: &ResolveOptions,
        client: Option<&RepositoryClient>,
        visited: &mut HashSet<String>,
        report: &mut ResolveReport,
    ) {
        let mut stack = vec![root.coordinate.clone()];

        while let Some(coordinate) = stack.pop() {
            if root.excludes(&coordinate.group, &coordinate.artifact) {
                self.message(format_args!(
                    "{} excluded from the dependencies of {}",
                    coordinate, root.coordinate
                ));
                continue;
            }
            if !visited.insert(coordinate.module_key()) {
                continue;
            }

            match self.fetch_module(&coordinate, options, client) {
                Ok(Some(module)) => {
                    if let Some(jar) = module.jar {
                        self.message(format_args!("found {} in {}", coordinate, jar.display()));
                        report.artifacts.push(ArtifactReport {
                            coordinate: coordinate.clone(),
                            local_file: jar,
                        });
                    }
                    if root.transitive {
                        // Reversed so that pops follow declaration order
                        stack.extend(module.dependencies.into_iter().rev());
                    }
                }
                Ok(None) => {
                    let message = format!(
                        "module not found: {}#{};{}",
                        coordinate.group, coordinate.artifact, coordinate.version
                    );
                    error!("{}", message);
                    report
                        .problems
                        .push(Problem::for_plugin(root.coordinate.clone(), message));
                }
                Err(e) => {
                    let message = format!("{coordinate}: {e}");
                    error!("{}", message);
                    report
                        .problems
                        .push(Problem::for_plugin(root.coordinate.clone(), message));
                }
            }
        }
    }

    /// Make `coordinate` available in the cache and read it
    ///
    /// Returns `Ok(None)` when no repository knows the module.
    fn fetch_module(
        &self,
        coordinate: &PluginCoordinate,
        options: &ResolveOptions,
        client: Option<&RepositoryClient>,
    ) -> Result<Option<CachedModule>> {
        let pom_path = self.cache_path(coordinate, "pom");
        let jar_path = self.cache_path(coordinate, "jar");
        let online = !options.use_cache_only;

        if online && !pom_path.is_file() {
            self.fetch_file(coordinate, "pom", &pom_path, client)?;
        }
        let pom = if pom_path.is_file() {
            Some(Pom::read_from(&pom_path)?)
        } else {
            None
        };
        let packaging = pom.as_ref().map_or("jar", |p| p.packaging.as_str());

        if online && packaging != "pom" && !jar_path.is_file() {
            self.fetch_file(coordinate, "jar", &jar_path, client)?;
        }

        let jar = if jar_path.is_file() {
            Some(jar_path)
        } else if pom.is_none() {
            return Ok(None);
        } else if packaging == "pom" {
            None
        } else {
            return Err(Error::NotFoundError(format!(
                "missing artifact {}#{};{}!{}.jar",
                coordinate.group,
                coordinate.artifact,
                coordinate.version,
                coordinate.artifact
            )));
        };

        Ok(Some(CachedModule {
            jar,
            dependencies: pom.map(|p| p.runtime_dependencies()).unwrap_or_default(),
        }))
    }

    /// Copy or download one file of the module into the cache
    ///
    /// Repositories are tried in order until one has the file.
    fn fetch_file(
        &self,
        coordinate: &PluginCoordinate,
        extension: &str,
        dest: &Path,
        client: Option<&RepositoryClient>,
    ) -> Result<bool> {
        let relative = format!(
            "{}/{}.{}",
            coordinate.repository_dir(),
            coordinate.file_stem(),
            extension
        );

        for repository in &self.settings.repositories {
            let found = match repository {
                RepositoryConfig::Filesystem { root, .. } => {
                    let source = root.join(&relative);
                    if source.is_file() {
                        if let Some(parent) = dest.parent() {
                            fs::create_dir_all(parent)?;
                        }
                        fs::copy(&source, dest)?;
                        true
                    } else {
                        false
                    }
                }
                RepositoryConfig::Remote { root, name } => {
                    let Some(client) = client else {
                        continue;
                    };
                    let url = root.join(&relative).map_err(|e| {
                        Error::ParseError(format!("Invalid URL in repository '{name}': {e}"))
                    })?;
                    client.fetch_to_file(&url, dest)?
                }
            };
            if found {
                self.message(format_args!(
                    "{} {} found in {}",
                    coordinate,
                    extension,
                    repository.name()
                ));
                return Ok(true);
            }
        }
        Ok(false)
    }
}

impl ArtifactResolver for RepositoryBackend {
    fn resolve(&self, descriptor: &Path, options: &ResolveOptions) -> Result<ResolveReport> {
        let descriptor = ModuleDescriptor::read_from(descriptor)?;
        let root = descriptor.root();
        self.message(format_args!(
            ":: resolving dependencies :: {}#{};{} (confs: {}, cache only: {})",
            root.organisation,
            root.module,
            root.revision,
            options.confs.join(","),
            options.use_cache_only
        ));

        let needs_client = !options.use_cache_only
            && self
                .settings
                .repositories
                .iter()
                .any(|r| matches!(r, RepositoryConfig::Remote { .. }));
        let client = if needs_client {
            Some(RepositoryClient::new()?)
        } else {
            None
        };

        let mut visited = HashSet::new();
        let mut report = ResolveReport::default();
        for dependency in descriptor.dependencies() {
            self.resolve_dependency(dependency, options, client.as_ref(), &mut visited, &mut report);
        }

        self.message(format_args!(
            ":: resolution report :: {} artifacts, {} problems",
            report.artifacts.len(),
            report.problems.len()
        ));
        Ok(report)
    }

    fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{HOST_CORE_ARTIFACT, HOST_CORE_GROUP};
    use tempfile::TempDir;

    fn publish(root: &Path, coordinate: &PluginCoordinate, deps: &[&PluginCoordinate]) -> PathBuf {
        let dir = root.join(coordinate.repository_dir());
        fs::create_dir_all(&dir).unwrap();
        let deps_xml: String = deps
            .iter()
            .map(|d| {
                format!(
                    "<dependency><groupId>{}</groupId><artifactId>{}</artifactId><version>{}</version></dependency>",
                    d.group, d.artifact, d.version
                )
            })
            .collect();
        fs::write(
            dir.join(format!("{}.pom", coordinate.file_stem())),
            format!("<project><dependencies>{deps_xml}</dependencies></project>"),
        )
        .unwrap();
        let jar = dir.join(format!("{}.jar", coordinate.file_stem()));
        fs::write(&jar, b"PK").unwrap();
        jar
    }

    fn write_descriptor(dir: &Path, plugins: &[&PluginCoordinate]) -> PathBuf {
        let mut md = ModuleDescriptor::caller_of(plugins[0]);
        for plugin in plugins {
            md.add_dependency((*plugin).clone());
        }
        let path = dir.join("descriptor.xml");
        md.write_to(&path).unwrap();
        path
    }

    #[test]
    fn test_resolves_transitively_from_cache() {
        let cache = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let a = PluginCoordinate::new("org.example", "pluginA", "1.0");
        let lib = PluginCoordinate::new("org.example", "lib", "2.0");
        let core = PluginCoordinate::new(HOST_CORE_GROUP, HOST_CORE_ARTIFACT, "3.0");

        let a_jar = publish(cache.path(), &a, &[&lib, &core]);
        let lib_jar = publish(cache.path(), &lib, &[]);
        publish(cache.path(), &core, &[]);

        let backend = RepositoryBackend::new(ResolverSettings::with_cache_dir(cache.path()));
        let descriptor = write_descriptor(work.path(), &[&a]);
        let report = backend
            .resolve(&descriptor, &ResolveOptions::default().cache_only(true))
            .unwrap();

        assert!(!report.has_error());
        assert_eq!(report.local_files(), vec![a_jar, lib_jar]);
    }

    #[test]
    fn test_missing_module_is_attributed() {
        let cache = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let a = PluginCoordinate::new("org.example", "pluginA", "9.9");

        let backend = RepositoryBackend::new(ResolverSettings::with_cache_dir(cache.path()));
        let descriptor = write_descriptor(work.path(), &[&a]);
        let report = backend
            .resolve(&descriptor, &ResolveOptions::default())
            .unwrap();

        assert!(report.has_error());
        assert_eq!(
            report.problems,
            vec![Problem::for_plugin(
                a.clone(),
                "module not found: org.example#pluginA;9.9"
            )]
        );
    }

    #[test]
    fn test_filesystem_repository_is_copied_into_cache() {
        let cache = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let a = PluginCoordinate::new("org.example", "pluginA", "1.0");
        publish(repo.path(), &a, &[]);

        let settings = ResolverSettings::with_cache_dir(cache.path()).with_repository(
            RepositoryConfig::Filesystem {
                name: "local".to_string(),
                root: repo.path().to_path_buf(),
            },
        );
        let backend = RepositoryBackend::new(settings);
        let descriptor = write_descriptor(work.path(), &[&a]);

        // Offline never looks past the cache
        let offline = backend
            .resolve(&descriptor, &ResolveOptions::default().cache_only(true))
            .unwrap();
        assert!(offline.has_error());

        let online = backend
            .resolve(&descriptor, &ResolveOptions::default())
            .unwrap();
        assert!(!online.has_error());
        let cached = cache.path().join(a.repository_dir()).join("pluginA-1.0.jar");
        assert_eq!(online.local_files(), vec![cached.clone()]);
        assert!(cached.is_file());
    }

    #[test]
    fn test_files_are_fetched_from_separate_repositories() {
        let cache = TempDir::new().unwrap();
        let poms = TempDir::new().unwrap();
        let jars = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let a = PluginCoordinate::new("org.example", "pluginA", "1.0");

        publish(poms.path(), &a, &[]);
        fs::remove_file(poms.path().join(a.repository_dir()).join("pluginA-1.0.jar")).unwrap();
        publish(jars.path(), &a, &[]);
        fs::remove_file(jars.path().join(a.repository_dir()).join("pluginA-1.0.pom")).unwrap();

        // Half-populated cache entry: only the POM is there
        let cached_dir = cache.path().join(a.repository_dir());
        fs::create_dir_all(&cached_dir).unwrap();
        fs::write(cached_dir.join("pluginA-1.0.pom"), "<project/>").unwrap();

        let settings = ResolverSettings::with_cache_dir(cache.path())
            .with_repository(RepositoryConfig::Filesystem {
                name: "poms".to_string(),
                root: poms.path().to_path_buf(),
            })
            .with_repository(RepositoryConfig::Filesystem {
                name: "jars".to_string(),
                root: jars.path().to_path_buf(),
            });
        let backend = RepositoryBackend::new(settings);
        let descriptor = write_descriptor(work.path(), &[&a]);

        let report = backend
            .resolve(&descriptor, &ResolveOptions::default())
            .unwrap();
        assert!(!report.has_error(), "{:?}", report.problems);
        assert_eq!(report.local_files(), vec![cached_dir.join("pluginA-1.0.jar")]);

        // Same with an empty cache: POM from one repository, jar from the other
        let fresh = TempDir::new().unwrap();
        let settings = ResolverSettings {
            cache_dir: fresh.path().to_path_buf(),
            ..backend.settings().clone()
        };
        let report = RepositoryBackend::new(settings)
            .resolve(&descriptor, &ResolveOptions::default())
            .unwrap();
        assert!(!report.has_error(), "{:?}", report.problems);
        let fresh_dir = fresh.path().join(a.repository_dir());
        assert!(fresh_dir.join("pluginA-1.0.pom").is_file());
        assert_eq!(report.local_files(), vec![fresh_dir.join("pluginA-1.0.jar")]);
    }

    #[test]
    fn test_first_version_wins() {
        let cache = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let a = PluginCoordinate::new("org.example", "pluginA", "1.0");
        let b = PluginCoordinate::new("org.example", "pluginB", "1.0");
        let lib1 = PluginCoordinate::new("org.example", "lib", "1");
        let lib2 = PluginCoordinate::new("org.example", "lib", "2");

        let a_jar = publish(cache.path(), &a, &[&lib1]);
        let b_jar = publish(cache.path(), &b, &[&lib2]);
        let lib1_jar = publish(cache.path(), &lib1, &[]);
        publish(cache.path(), &lib2, &[]);

        let backend = RepositoryBackend::new(ResolverSettings::with_cache_dir(cache.path()));
        let descriptor = write_descriptor(work.path(), &[&a, &b]);
        let report = backend
            .resolve(&descriptor, &ResolveOptions::default().cache_only(true))
            .unwrap();

        assert_eq!(report.local_files(), vec![a_jar, lib1_jar, b_jar]);
    }

    #[test]
    fn test_pom_packaging_has_no_jar() {
        let cache = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let bom = PluginCoordinate::new("org.example", "bom", "1.0");
        let dir = cache.path().join(bom.repository_dir());
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("bom-1.0.pom"),
            "<project><packaging>pom</packaging></project>",
        )
        .unwrap();

        let backend = RepositoryBackend::new(ResolverSettings::with_cache_dir(cache.path()));
        let descriptor = write_descriptor(work.path(), &[&bom]);
        let report = backend
            .resolve(&descriptor, &ResolveOptions::default().cache_only(true))
            .unwrap();

        assert!(!report.has_error());
        assert!(report.artifacts.is_empty());
    }

    #[test]
    fn test_missing_jar_is_a_problem() {
        let cache = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let a = PluginCoordinate::new("org.example", "pluginA", "1.0");
        let dir = cache.path().join(a.repository_dir());
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("pluginA-1.0.pom"), "<project/>").unwrap();

        let backend = RepositoryBackend::new(ResolverSettings::with_cache_dir(cache.path()));
        let descriptor = write_descriptor(work.path(), &[&a]);
        let report = backend
            .resolve(&descriptor, &ResolveOptions::default().cache_only(true))
            .unwrap();

        assert_eq!(report.problems.len(), 1);
        assert!(report.problems[0].message.contains("missing artifact"));
    }
}
