// src/lib.rs

//! Plugin dependency resolution
//!
//! Resolves declared plugins (`group:artifact:version`) together with their
//! transitive dependencies into an ordered list of local artifact files, and
//! layers those files into an isolated execution scope on top of the host's.
//!
//! # Architecture
//!
//! - Coordinates: structured `group:artifact:version` triples and sets of them
//! - Descriptors: a synthetic root module depending on every plugin, with the
//!   host core excluded from each dependency
//! - Cache: the last successful resolution answers every subset request
//! - Backends: pluggable behind [`repository::ArtifactResolver`]
//! - Scopes: parent-first chained artifact lookups
//! - Resources: include/exclude/extension filtered file walks

pub mod cache;
pub mod config;
pub mod coordinate;
pub mod descriptor;
mod error;
pub mod loader;
pub mod repository;
pub mod resource;
pub mod session;
pub mod settings;
mod xml;

pub use cache::ResolutionCache;
pub use config::{Configuration, ConfigurationProvider, PluginConfig, ResourceConfig};
pub use coordinate::{CoordinateSet, PluginCoordinate};
pub use descriptor::{DependencyDescriptor, ExcludeRule, ModuleDescriptor, ModuleRevision};
pub use error::{Error, ResolutionFailure, Result};
pub use loader::ExecutionScope;
pub use repository::{ArtifactResolver, RepositoryBackend, ResolveOptions, ResolveReport};
pub use resource::FileResource;
pub use session::{ResolutionSession, ResolverContext};
pub use settings::{ResolverSettings, SettingsLocator};
