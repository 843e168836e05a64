// src/error.rs

//! Error types shared by the resolver, the loader chain and file resources

use crate::coordinate::PluginCoordinate;
use std::fmt;
use thiserror::Error;

/// Result type for plugin resolver operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving and loading plugins
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration is unusable (missing settings file, bad config file)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Resolver could not be initialized
    #[error("{0}")]
    InitError(String),

    /// Malformed input (coordinates, XML, patterns)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Remote repository transfer failed
    #[error("Download error: {0}")]
    DownloadError(String),

    /// A file or module could not be found
    #[error("Not found: {0}")]
    NotFoundError(String),

    /// The backend reported an unsuccessful resolution
    #[error("{0}")]
    Unresolved(ResolutionFailure),

    /// Resolution failed while a specific plugin was being processed
    #[error("Unable to resolve the plugin: {}. Reason : {reason}", spaced(.coordinate))]
    PluginError {
        coordinate: PluginCoordinate,
        reason: String,
    },

    /// I/O failure, propagated unchanged
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error describes a configuration problem that must be
    /// surfaced as-is rather than wrapped with plugin context
    pub fn is_config_error(&self) -> bool {
        matches!(self, Self::ConfigError(_))
    }
}

fn spaced(coordinate: &PluginCoordinate) -> String {
    format!(
        "{} : {} : {}",
        coordinate.group, coordinate.artifact, coordinate.version
    )
}

/// Aggregated problems reported by a failed resolution
///
/// Problems are kept structured until the failure is displayed, where they
/// are joined with `;`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolutionFailure {
    problems: Vec<String>,
    plugin: Option<PluginCoordinate>,
}

impl ResolutionFailure {
    pub fn new(problems: Vec<String>) -> Self {
        Self {
            problems,
            plugin: None,
        }
    }

    /// Attribute the failure to a declared plugin
    pub fn with_plugin(mut self, plugin: Option<PluginCoordinate>) -> Self {
        self.plugin = plugin;
        self
    }

    /// The declared plugin the backend blamed, if any
    pub fn plugin(&self) -> Option<&PluginCoordinate> {
        self.plugin.as_ref()
    }

    /// Problem messages in the order the backend reported them
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// True when the backend failed without saying why
    pub fn is_undefined(&self) -> bool {
        self.problems.is_empty()
    }
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.problems.is_empty() {
            write!(f, "Unable to resolve the artifacts. Undefined cause")
        } else {
            write!(
                f,
                "Unable to resolve the artifacts. Cause: {}",
                self.problems.join(";")
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_undefined_failure_message() {
        let failure = ResolutionFailure::default();
        assert!(failure.is_undefined());
        assert_eq!(
            failure.to_string(),
            "Unable to resolve the artifacts. Undefined cause"
        );
    }

    #[test]
    fn test_failure_joins_problems() {
        let failure = ResolutionFailure::new(vec![
            "module not found: a#b;1".to_string(),
            "download failed".to_string(),
        ]);
        assert_eq!(
            failure.to_string(),
            "Unable to resolve the artifacts. Cause: module not found: a#b;1;download failed"
        );
    }

    #[test]
    fn test_plugin_error_names_coordinate() {
        let err = Error::PluginError {
            coordinate: PluginCoordinate::new("org.example", "pluginA", "9.9"),
            reason: "not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unable to resolve the plugin: org.example : pluginA : 9.9. Reason : not found"
        );
    }

    #[test]
    fn test_io_error_is_transparent() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.jar");
        let err: Error = io.into();
        assert_eq!(err.to_string(), "missing.jar");
        assert!(!err.is_config_error());
    }
}
