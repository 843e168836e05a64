// src/coordinate.rs

//! Artifact coordinates and coordinate sets
//!
//! A coordinate is the `(group, artifact, version)` triple that identifies
//! one external artifact. Its canonical string form is
//! `group:artifact:version`; because `:` is rejected inside components, the
//! canonical form is unambiguous.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A `(group, artifact, version)` triple
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PluginCoordinate {
    pub group: String,
    pub artifact: String,
    pub version: String,
}

impl PluginCoordinate {
    /// Create a coordinate without validation
    pub fn new(
        group: impl Into<String>,
        artifact: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            artifact: artifact.into(),
            version: version.into(),
        }
    }

    /// Create a coordinate, rejecting empty components and embedded `:`
    pub fn parse_parts(group: &str, artifact: &str, version: &str) -> Result<Self> {
        for (label, value) in [("group", group), ("artifact", artifact), ("version", version)] {
            let value = value.trim();
            if value.is_empty() {
                return Err(Error::ParseError(format!(
                    "empty {} in coordinate '{}:{}:{}'",
                    label, group, artifact, version
                )));
            }
            if value.contains(':') {
                return Err(Error::ParseError(format!(
                    "{} '{}' must not contain ':'",
                    label, value
                )));
            }
        }
        Ok(Self::new(group.trim(), artifact.trim(), version.trim()))
    }

    /// `group:artifact` without the version
    pub fn module_key(&self) -> String {
        format!("{}:{}", self.group, self.artifact)
    }

    /// Directory of this module inside a Maven-layout repository
    /// (`org/example/plugin/1.0`)
    pub fn repository_dir(&self) -> String {
        format!(
            "{}/{}/{}",
            self.group.replace('.', "/"),
            self.artifact,
            self.version
        )
    }

    /// Base file name of this module's files (`plugin-1.0`)
    pub fn file_stem(&self) -> String {
        format!("{}-{}", self.artifact, self.version)
    }
}

impl fmt::Display for PluginCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.artifact, self.version)
    }
}

impl FromStr for PluginCoordinate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(':').collect();
        match parts.as_slice() {
            [group, artifact, version] => Self::parse_parts(group, artifact, version),
            _ => Err(Error::ParseError(format!(
                "invalid coordinate '{}', expected group:artifact:version",
                s
            ))),
        }
    }
}

/// A deduplicated set of coordinates owned by one resolution session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinateSet {
    coordinates: BTreeSet<PluginCoordinate>,
}

impl CoordinateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a coordinate, returning false if it was already present
    pub fn insert(&mut self, coordinate: PluginCoordinate) -> bool {
        self.coordinates.insert(coordinate)
    }

    pub fn contains(&self, coordinate: &PluginCoordinate) -> bool {
        self.coordinates.contains(coordinate)
    }

    /// True if every coordinate of `self` is also in `other`
    pub fn is_subset(&self, other: &CoordinateSet) -> bool {
        self.coordinates.is_subset(&other.coordinates)
    }

    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PluginCoordinate> {
        self.coordinates.iter()
    }
}

impl FromIterator<PluginCoordinate> for CoordinateSet {
    fn from_iter<I: IntoIterator<Item = PluginCoordinate>>(iter: I) -> Self {
        Self {
            coordinates: iter.into_iter().collect(),
        }
    }
}
