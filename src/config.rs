// src/config.rs

//! User configuration consumed by the resolver
//!
//! # Example plugins.toml
//!
//! ```toml
//! [parameters]
//! offline = true
//!
//! [[plugins]]
//! group_id = "org.example"
//! artifact_id = "pluginA"
//! version = "1.0"
//!
//! [[resources]]
//! path = "src/main/java"
//! extensions = ["java"]
//! includes = ["org/example/**"]
//! excludes = ["**/generated/**"]
//! ```

use crate::coordinate::PluginCoordinate;
use crate::error::{Error, Result};
use crate::loader::ExecutionScope;
use crate::resource::FileResource;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Parameter switching resolution to cache-only mode
pub const OFFLINE_PARAMETER: &str = "offline";

/// A plugin declared by the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginConfig {
    pub group_id: String,
    pub artifact_id: String,
    pub version: String,
}

impl PluginConfig {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        }
    }

    pub fn coordinate(&self) -> PluginCoordinate {
        PluginCoordinate::new(&self.group_id, &self.artifact_id, &self.version)
    }
}

/// A `[[resources]]` entry describing files to transform
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    pub path: PathBuf,
    #[serde(default)]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
}

impl ResourceConfig {
    pub fn to_resource(&self) -> FileResource {
        FileResource::new(&self.path)
            .with_extensions(self.extensions.clone())
            .with_includes(self.includes.clone())
            .with_excludes(self.excludes.clone())
    }
}

/// On-disk form of a [`Configuration`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    plugins: Vec<PluginConfig>,
    #[serde(default)]
    parameters: HashMap<String, serde_json::Value>,
    #[serde(default)]
    resources: Vec<ResourceConfig>,
}

/// Plugins, free-form parameters and the host execution scope
#[derive(Debug, Clone)]
pub struct Configuration {
    plugins: Vec<PluginConfig>,
    parameters: HashMap<String, serde_json::Value>,
    resources: Vec<ResourceConfig>,
    scope: Arc<ExecutionScope>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            parameters: HashMap::new(),
            resources: Vec::new(),
            scope: ExecutionScope::root(),
        }
    }
}

impl Configuration {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML configuration
    pub fn from_toml(content: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content)
            .map_err(|e| Error::ConfigError(format!("Invalid configuration: {e}")))?;
        Ok(Self {
            plugins: file.plugins,
            parameters: file.parameters,
            resources: file.resources,
            scope: ExecutionScope::root(),
        })
    }

    /// Load a TOML configuration file
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    pub fn with_plugin(mut self, plugin: PluginConfig) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_scope(mut self, scope: Arc<ExecutionScope>) -> Self {
        self.scope = scope;
        self
    }

    pub fn plugins(&self) -> &[PluginConfig] {
        &self.plugins
    }

    pub fn parameters(&self) -> &HashMap<String, serde_json::Value> {
        &self.parameters
    }

    pub fn resources(&self) -> &[ResourceConfig] {
        &self.resources
    }

    /// The execution scope plugins are loaded on top of
    pub fn scope(&self) -> &Arc<ExecutionScope> {
        &self.scope
    }

    pub fn set_scope(&mut self, scope: Arc<ExecutionScope>) {
        self.scope = scope;
    }

    /// Whether the `offline` parameter asks for cache-only resolution
    ///
    /// Accepts a boolean or a string equal to `true` in any case; anything
    /// else means online.
    pub fn offline_requested(&self) -> bool {
        match self.parameters.get(OFFLINE_PARAMETER) {
            Some(serde_json::Value::Bool(b)) => *b,
            Some(serde_json::Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        }
    }
}

/// Something that completes a [`Configuration`]
pub trait ConfigurationProvider {
    fn load(&mut self, configuration: &mut Configuration) -> Result<()>;
}
