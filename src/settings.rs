// src/settings.rs

//! Backend settings discovery and parsing
//!
//! The repository backend is configured by a settings file, `ivysettings.xml`
//! by default. The file is looked up, in order:
//!
//! 1. relative to the current working directory
//! 2. in the system configuration directory (`/etc/plugin-resolver`)
//! 3. in the user configuration directory (`~/.config/plugin-resolver`)
//!
//! Not finding it anywhere is a configuration error.
//!
//! Only a subset of the Ivy settings format is understood:
//!
//! ```text
//! <ivysettings>
//!   <caches defaultCacheDir="${user.home}/.plugin-resolver/cache"/>
//!   <resolvers>
//!     <chain name="default">
//!       <filesystem name="local" root="/srv/repo"/>
//!       <ibiblio name="central" m2compatible="true" root="https://repo1.maven.org/maven2/"/>
//!     </chain>
//!   </resolvers>
//! </ivysettings>
//! ```
//!
//! Chains are flattened: repositories are consulted in document order.

use crate::error::{Error, Result};
use crate::xml;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Default name of the backend settings file
pub const DEFAULT_SETTINGS_FILE: &str = "ivysettings.xml";

/// Directory name used under system and user configuration/cache roots
const APP_DIR: &str = "plugin-resolver";

/// A repository the backend may fetch modules from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositoryConfig {
    /// Maven-layout repository on the local filesystem
    Filesystem { name: String, root: PathBuf },
    /// Maven-layout repository served over HTTP(S)
    Remote { name: String, root: Url },
}

impl RepositoryConfig {
    pub fn name(&self) -> &str {
        match self {
            Self::Filesystem { name, .. } | Self::Remote { name, .. } => name,
        }
    }
}

/// Parsed backend settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    /// Local artifact cache; offline resolution only reads from here
    pub cache_dir: PathBuf,
    /// Repositories in lookup order
    pub repositories: Vec<RepositoryConfig>,
}

impl ResolverSettings {
    /// Settings with the given cache and no repositories
    pub fn with_cache_dir(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            repositories: Vec::new(),
        }
    }

    pub fn with_repository(mut self, repository: RepositoryConfig) -> Self {
        self.repositories.push(repository);
        self
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading resolver settings from {}", path.display());
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse settings from XML content
    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        let mut cache_dir: Option<PathBuf> = None;
        let mut repositories = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let element = xml::local_name(&e);
                    match element.as_str() {
                        "caches" => {
                            let attrs = xml::attributes(&e)?;
                            if let Some(dir) = attrs.get("defaultCacheDir") {
                                cache_dir = Some(PathBuf::from(expand_properties(dir)));
                            }
                        }
                        "filesystem" | "ibiblio" | "url" => {
                            let attrs = xml::attributes(&e)?;
                            let name = attrs
                                .get("name")
                                .cloned()
                                .unwrap_or_else(|| element.clone());
                            let Some(root) = attrs.get("root") else {
                                return Err(Error::ParseError(format!(
                                    "Repository '{name}' has no root"
                                )));
                            };
                            let root = expand_properties(root);
                            repositories.push(if element == "filesystem" {
                                RepositoryConfig::Filesystem {
                                    name,
                                    root: PathBuf::from(root),
                                }
                            } else {
                                RepositoryConfig::Remote {
                                    root: parse_root_url(&name, &root)?,
                                    name,
                                }
                            });
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::ParseError(format!(
                        "Invalid settings file at position {}: {e}",
                        reader.buffer_position()
                    )));
                }
            }
        }

        Ok(Self {
            cache_dir: cache_dir.unwrap_or_else(default_cache_dir),
            repositories,
        })
    }
}

/// Repository roots are always treated as directories
fn parse_root_url(name: &str, root: &str) -> Result<Url> {
    let root = if root.ends_with('/') {
        root.to_string()
    } else {
        format!("{root}/")
    };
    Url::parse(&root)
        .map_err(|e| Error::ParseError(format!("Invalid root URL for repository '{name}': {e}")))
}

/// Expand `${user.home}` in settings values
fn expand_properties(value: &str) -> String {
    match dirs::home_dir() {
        Some(home) => value.replace("${user.home}", &home.to_string_lossy()),
        None => value.to_string(),
    }
}

fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
}

/// Finds the settings file in the well-known locations
#[derive(Debug, Clone)]
pub struct SettingsLocator {
    file_name: String,
    search_dirs: Vec<PathBuf>,
}

impl Default for SettingsLocator {
    fn default() -> Self {
        let mut search_dirs = vec![PathBuf::from("/etc").join(APP_DIR)];
        if let Some(config) = dirs::config_dir() {
            search_dirs.push(config.join(APP_DIR));
        }
        Self {
            file_name: DEFAULT_SETTINGS_FILE.to_string(),
            search_dirs,
        }
    }
}

impl SettingsLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for a differently named settings file
    pub fn with_file_name(mut self, file_name: impl Into<String>) -> Self {
        self.file_name = file_name.into();
        self
    }

    /// Replace the fallback directories searched after the working directory
    pub fn with_search_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_dirs = dirs;
        self
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Locate the settings file
    pub fn locate(&self) -> Result<PathBuf> {
        let relative = PathBuf::from(&self.file_name);
        if relative.is_file() {
            return Ok(relative);
        }

        for dir in &self.search_dirs {
            let candidate = dir.join(&self.file_name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(Error::ConfigError(format!(
            "Resolver settings file ({}) could not be found in the working directory or {}",
            self.file_name,
            self.search_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )))
    }

    /// Locate and parse the settings file
    pub fn load(&self) -> Result<ResolverSettings> {
        ResolverSettings::load(&self.locate()?)
    }
}
