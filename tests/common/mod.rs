// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use plugin_resolver::repository::{ArtifactReport, Problem};
use plugin_resolver::{
    ArtifactResolver, ModuleDescriptor, PluginConfig, PluginCoordinate, ResolveOptions,
    ResolveReport, Result,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// A request seen by [`RecordingBackend`]
#[derive(Debug, Clone)]
pub struct Request {
    pub descriptor: ModuleDescriptor,
    pub options: ResolveOptions,
}

/// In-memory backend that records every request
///
/// Known plugins resolve to their jar followed by the jars of their
/// dependencies; unknown ones produce a `module not found` problem
/// attributed to the plugin.
pub struct RecordingBackend {
    dir: TempDir,
    modules: HashMap<PluginCoordinate, Vec<PathBuf>>,
    fail_silently: bool,
    calls: AtomicUsize,
    requests: Mutex<Vec<Request>>,
    verbose: Mutex<Option<bool>>,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            modules: HashMap::new(),
            fail_silently: false,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            verbose: Mutex::new(None),
        }
    }

    /// Make `coordinate` resolvable, pulling in jars named `extra`
    pub fn with_module(mut self, coordinate: &PluginCoordinate, extra: &[&str]) -> Self {
        let mut files = vec![self.jar(&format!("{}.jar", coordinate.file_stem()))];
        for name in extra {
            files.push(self.jar(name));
        }
        self.modules.insert(coordinate.clone(), files);
        self
    }

    /// Fail every resolution without a problem message
    pub fn failing_silently(mut self) -> Self {
        self.fail_silently = true;
        self
    }

    fn jar(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, b"PK").unwrap();
        path
    }

    /// Path of the jar created for `name`
    pub fn jar_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Option<Request> {
        self.requests().pop()
    }

    pub fn verbose(&self) -> Option<bool> {
        *self.verbose.lock().unwrap()
    }
}

impl ArtifactResolver for RecordingBackend {
    fn resolve(&self, descriptor: &Path, options: &ResolveOptions) -> Result<ResolveReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let descriptor = ModuleDescriptor::read_from(descriptor)?;

        let mut report = ResolveReport::default();
        if self.fail_silently {
            report.failed = true;
        } else {
            for dependency in descriptor.dependencies() {
                let coordinate = &dependency.coordinate;
                match self.modules.get(coordinate) {
                    Some(files) => report.artifacts.extend(files.iter().map(|f| ArtifactReport {
                        coordinate: coordinate.clone(),
                        local_file: f.clone(),
                    })),
                    None => report.problems.push(Problem::for_plugin(
                        coordinate.clone(),
                        format!(
                            "module not found: {}#{};{}",
                            coordinate.group, coordinate.artifact, coordinate.version
                        ),
                    )),
                }
            }
        }

        self.requests.lock().unwrap().push(Request {
            descriptor,
            options: options.clone(),
        });
        Ok(report)
    }

    fn set_verbose(&self, verbose: bool) {
        *self.verbose.lock().unwrap() = Some(verbose);
    }
}

pub fn plugin(artifact: &str, version: &str) -> PluginConfig {
    PluginConfig::new("org.example", artifact, version)
}

pub fn coordinate(artifact: &str, version: &str) -> PluginCoordinate {
    PluginCoordinate::new("org.example", artifact, version)
}

/// Lay out a module in a Maven-layout directory, returning its jar
pub fn publish(root: &Path, coordinate: &PluginCoordinate, deps: &[&PluginCoordinate]) -> PathBuf {
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
