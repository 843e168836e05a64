// src/repository/mod.rs

//! Artifact resolution backends
//!
//! The resolution session only talks to the [`ArtifactResolver`] trait: it
//! hands over a module descriptor file and gets back a [`ResolveReport`].
//! [`RepositoryBackend`] is the bundled implementation, resolving against a
//! local cache, filesystem repositories and remote Maven repositories.

mod backend;
mod client;
mod pom;

pub use backend::RepositoryBackend;
pub use client::RepositoryClient;
pub use pom::{Pom, PomDependency};

use crate::coordinate::PluginCoordinate;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Configuration resolved when none is requested
pub const DEFAULT_CONF: &str = "default";

/// Options for one resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Configurations to resolve
    pub confs: Vec<String>,
    /// Only use artifacts already in the local cache, never the network
    pub use_cache_only: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            confs: vec![DEFAULT_CONF.to_string()],
            use_cache_only: false,
        }
    }
}

impl ResolveOptions {
    pub fn cache_only(mut self, use_cache_only: bool) -> Self {
        self.use_cache_only = use_cache_only;
        self
    }
}

/// One resolved artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactReport {
    pub coordinate: PluginCoordinate,
    pub local_file: PathBuf,
}

/// A problem reported by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    /// The declared plugin whose closure produced the problem, when known
    pub coordinate: Option<PluginCoordinate>,
    pub message: String,
}

impl Problem {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            coordinate: None,
            message: message.into(),
        }
    }

    pub fn for_plugin(coordinate: PluginCoordinate, message: impl Into<String>) -> Self {
        Self {
            coordinate: Some(coordinate),
            message: message.into(),
        }
    }
}

/// Outcome of a backend resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Resolved artifacts in backend order
    pub artifacts: Vec<ArtifactReport>,
    /// Problems encountered; non-empty means the resolution failed
    pub problems: Vec<Problem>,
    /// Set by backends that fail without being able to say why
    pub failed: bool,
}

impl ResolveReport {
    /// A failed report carrying no problem message
    pub fn failed() -> Self {
        Self {
            failed: true,
            ..Self::default()
        }
    }

    pub fn has_error(&self) -> bool {
        self.failed || !self.problems.is_empty()
    }

    /// Local files of all resolved artifacts, in order
    pub fn local_files(&self) -> Vec<PathBuf> {
        self.artifacts.iter().map(|a| a.local_file.clone()).collect()
    }
}

/// A service turning a module descriptor into local artifact files
///
/// Implementations may block on network I/O.
pub trait ArtifactResolver: Send + Sync {
    /// Resolve every dependency of the module described by `descriptor`
    ///
    /// Problems with individual modules belong in the report; `Err` is for
    /// failures that prevent resolution from running at all.
    fn resolve(&self, descriptor: &Path, options: &ResolveOptions) -> Result<ResolveReport>;

    /// Switch between informational and error-only backend messages
    fn set_verbose(&self, _verbose: bool) {}
}
