// src/repository/pom.rs

//! Minimal POM reader
//!
//! Only what transitive resolution needs is extracted: the packaging, the
//! module's own version, `<properties>` and the direct `<dependencies>`.
//! Parent POMs and dependency management are not consulted, so dependencies
//! whose version cannot be determined from the POM itself are skipped.

use crate::coordinate::PluginCoordinate;
use crate::error::{Error, Result};
use crate::xml;
use quick_xml::Reader;
use quick_xml::events::Event;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// A `<dependency>` entry of a POM
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PomDependency {
    pub group: String,
    pub artifact: String,
    pub version: Option<String>,
    pub scope: Option<String>,
    pub optional: bool,
}

impl PomDependency {
    /// Whether the dependency is needed at runtime
    pub fn is_runtime(&self) -> bool {
        !self.optional
            && matches!(self.scope.as_deref(), None | Some("compile") | Some("runtime"))
    }
}

/// The parts of a POM used for resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pom {
    pub packaging: String,
    pub version: Option<String>,
    pub properties: HashMap<String, String>,
    pub dependencies: Vec<PomDependency>,
}

impl Pom {
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        let mut pom = Pom {
            packaging: "jar".to_string(),
            version: None,
            properties: HashMap::new(),
            dependencies: Vec::new(),
        };
        let mut parent_version: Option<String> = None;
        let mut path: Vec<String> = Vec::new();
        let mut current: Option<PomDependency> = None;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = xml::local_name(&e);
                    if name == "dependency" && at(&path, &["project", "dependencies"]) {
                        current = Some(PomDependency::default());
                    }
                    path.push(name);
                }
                Ok(Event::End(_)) => {
                    let closed = path.pop();
                    if closed.as_deref() == Some("dependency")
                        && at(&path, &["project", "dependencies"])
                        && let Some(dep) = current.take()
                    {
                        pom.dependencies.push(dep);
                    }
                }
                Ok(Event::Text(t)) => {
                    let text = t
                        .unescape()
                        .map_err(|e| Error::ParseError(format!("Invalid POM text: {e}")))?
                        .trim()
                        .to_string();
                    let names: Vec<&str> = path.iter().map(String::as_str).collect();
                    match names.as_slice() {
                        ["project", "packaging"] => pom.packaging = text,
                        ["project", "version"] => pom.version = Some(text),
                        ["project", "parent", "version"] => parent_version = Some(text),
                        ["project", "properties", key] => {
                            pom.properties.insert((*key).to_string(), text);
                        }
                        ["project", "dependencies", "dependency", field] => {
                            if let Some(dep) = current.as_mut() {
                                match *field {
                                    "groupId" => dep.group = text,
                                    "artifactId" => dep.artifact = text,
                                    "version" => dep.version = Some(text),
                                    "scope" => dep.scope = Some(text),
                                    "optional" => dep.optional = text == "true",
                                    _ => {}
                                }
                            }
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::ParseError(format!(
                        "Invalid POM at position {}: {e}",
                        reader.buffer_position()
                    )));
                }
            }
        }

        if pom.version.is_none() {
            pom.version = parent_version;
        }
        Ok(pom)
    }

    /// Substitute `${...}` references from the POM's own properties
    pub fn interpolate(&self, value: &str) -> Option<String> {
        let mut result = value.to_string();
        while let Some(start) = result.find("${") {
            let end = start + result[start..].find('}')?;
            let key = &result[start + 2..end];
            let replacement = match key {
                "project.version" | "version" | "pom.version" => self.version.clone()?,
                _ => self.properties.get(key)?.clone(),
            };
            if replacement.contains("${") {
                return None;
            }
            result.replace_range(start..=end, &replacement);
        }
        Some(result)
    }

    /// Coordinates of the runtime dependencies whose version is known
    pub fn runtime_dependencies(&self) -> Vec<PluginCoordinate> {
        self.dependencies
            .iter()
            .filter(|d| d.is_runtime())
            .filter_map(|d| {
                let version = self.interpolate(d.version.as_deref()?)?;
                let group = self.interpolate(&d.group)?;
                PluginCoordinate::parse_parts(&group, &d.artifact, &version).ok()
            })
            .collect()
    }
}

fn at(path: &[String], expected: &[&str]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}
