// src/descriptor.rs

//! Dependency descriptors for plugin resolution
//!
//! The resolver never resolves plugins one at a time. Every declared plugin
//! becomes a dependency edge of a single synthetic *caller* module, and the
//! backend resolves that module as a whole. Each edge carries a standing
//! exclusion of the host tool's own core artifact so a plugin can never drag
//! a second copy of the host onto the search path.
//!
//! Descriptors are exchanged with the backend as Ivy-style module files:
//!
//! ```text
//! <ivy-module version="2.0">
//!   <info organisation="org.example" module="pluginA-caller" revision="working"/>
//!   <dependencies>
//!     <dependency org="org.example" name="pluginA" rev="1.0" transitive="true">
//!       <exclude org="org.walkmod" module="walkmod-core" artifact="*" type="*" ext="*" matcher="exact"/>
//!     </dependency>
//!   </dependencies>
//! </ivy-module>
//! ```

use crate::coordinate::PluginCoordinate;
use crate::error::{Error, Result};
use crate::xml;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, Event};
use std::fs;
use std::path::Path;

/// Group of the host tool's core artifact
pub const HOST_CORE_GROUP: &str = "org.walkmod";

/// Name of the host tool's core artifact
pub const HOST_CORE_ARTIFACT: &str = "walkmod-core";

/// Pattern matching any value
pub const ANY_EXPRESSION: &str = "*";

/// Revision given to the synthetic caller module
const CALLER_REVISION: &str = "working";

/// Identity of a module revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleRevision {
    pub organisation: String,
    pub module: String,
    pub revision: String,
}

/// Rule keeping matching artifacts out of a dependency's closure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExcludeRule {
    pub organisation: String,
    pub module: String,
    pub artifact: String,
    pub kind: String,
    pub extension: String,
    pub matcher: String,
}

impl ExcludeRule {
    /// Exclude every artifact of `organisation:module`
    pub fn module(organisation: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            organisation: organisation.into(),
            module: module.into(),
            artifact: ANY_EXPRESSION.to_string(),
            kind: ANY_EXPRESSION.to_string(),
            extension: ANY_EXPRESSION.to_string(),
            matcher: "exact".to_string(),
        }
    }

    /// The standing rule excluding the host's core artifact
    pub fn host_core() -> Self {
        Self::module(HOST_CORE_GROUP, HOST_CORE_ARTIFACT)
    }

    /// Whether this rule excludes the given module
    pub fn matches(&self, group: &str, artifact: &str) -> bool {
        field_matches(&self.organisation, group) && field_matches(&self.module, artifact)
    }
}

fn field_matches(pattern: &str, value: &str) -> bool {
    pattern == ANY_EXPRESSION || pattern == value
}

/// One edge from the caller module to a declared plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyDescriptor {
    pub coordinate: PluginCoordinate,
    pub transitive: bool,
    pub exclude_rules: Vec<ExcludeRule>,
}

impl DependencyDescriptor {
    pub fn new(coordinate: PluginCoordinate) -> Self {
        Self {
            coordinate,
            transitive: true,
            exclude_rules: Vec::new(),
        }
    }

    pub fn with_exclude(mut self, rule: ExcludeRule) -> Self {
        self.exclude_rules.push(rule);
        self
    }

    /// Whether any exclude rule of this edge matches the module
    pub fn excludes(&self, group: &str, artifact: &str) -> bool {
        self.exclude_rules.iter().any(|r| r.matches(group, artifact))
    }
}

/// A synthetic root module depending on every declared plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    root: ModuleRevision,
    dependencies: Vec<DependencyDescriptor>,
}

impl ModuleDescriptor {
    /// Create the caller module named after the first declared plugin
    pub fn caller_of(first: &PluginCoordinate) -> Self {
        Self {
            root: ModuleRevision {
                organisation: first.group.clone(),
                module: format!("{}-caller", first.artifact),
                revision: CALLER_REVISION.to_string(),
            },
            dependencies: Vec::new(),
        }
    }

    pub fn root(&self) -> &ModuleRevision {
        &self.root
    }

    pub fn dependencies(&self) -> &[DependencyDescriptor] {
        &self.dependencies
    }

    /// Add a dependency on `coordinate` carrying the host exclusion
    ///
    /// Returns false and leaves the descriptor unchanged if an edge for the
    /// same coordinate already exists.
    pub fn add_dependency(&mut self, coordinate: PluginCoordinate) -> bool {
        if self.dependencies.iter().any(|d| d.coordinate == coordinate) {
            return false;
        }
        self.dependencies
            .push(DependencyDescriptor::new(coordinate).with_exclude(ExcludeRule::host_core()));
        true
    }

    /// Serialize to an Ivy-style module file
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        let map_err = |e: quick_xml::Error| Error::ParseError(format!("Failed to write descriptor: {e}"));

        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(map_err)?;

        let mut module = BytesStart::new("ivy-module");
        module.push_attribute(("version", "2.0"));
        writer.write_event(Event::Start(module)).map_err(map_err)?;

        let mut info = BytesStart::new("info");
        info.push_attribute(("organisation", self.root.organisation.as_str()));
        info.push_attribute(("module", self.root.module.as_str()));
        info.push_attribute(("revision", self.root.revision.as_str()));
        writer.write_event(Event::Empty(info)).map_err(map_err)?;

        writer
            .write_event(Event::Start(BytesStart::new("dependencies")))
            .map_err(map_err)?;
        for dep in &self.dependencies {
            let mut element = BytesStart::new("dependency");
            element.push_attribute(("org", dep.coordinate.group.as_str()));
            element.push_attribute(("name", dep.coordinate.artifact.as_str()));
            element.push_attribute(("rev", dep.coordinate.version.as_str()));
            element.push_attribute(("transitive", if dep.transitive { "true" } else { "false" }));

            if dep.exclude_rules.is_empty() {
                writer.write_event(Event::Empty(element)).map_err(map_err)?;
                continue;
            }

            writer.write_event(Event::Start(element)).map_err(map_err)?;
            for rule in &dep.exclude_rules {
                let mut exclude = BytesStart::new("exclude");
                exclude.push_attribute(("org", rule.organisation.as_str()));
                exclude.push_attribute(("module", rule.module.as_str()));
                exclude.push_attribute(("artifact", rule.artifact.as_str()));
                exclude.push_attribute(("type", rule.kind.as_str()));
                exclude.push_attribute(("ext", rule.extension.as_str()));
                exclude.push_attribute(("matcher", rule.matcher.as_str()));
                writer.write_event(Event::Empty(exclude)).map_err(map_err)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("dependency")))
                .map_err(map_err)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new("dependencies")))
            .map_err(map_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("ivy-module")))
            .map_err(map_err)?;

        String::from_utf8(writer.into_inner())
            .map_err(|e| Error::ParseError(format!("Descriptor is not UTF-8: {e}")))
    }

    /// Write the module file to `path`, replacing previous content
    pub fn write_to(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_xml()?)?;
        Ok(())
    }

    /// Parse an Ivy-style module file
    pub fn parse_xml(content: &str) -> Result<Self> {
        let mut reader = Reader::from_str(content);
        reader.trim_text(true);

        let mut root: Option<ModuleRevision> = None;
        let mut dependencies: Vec<DependencyDescriptor> = Vec::new();

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                    let name = xml::local_name(&e);
                    let attrs = xml::attributes(&e)?;
                    let get = |key: &str| -> Result<String> {
                        attrs.get(key).cloned().ok_or_else(|| {
                            Error::ParseError(format!("<{name}> is missing '{key}'"))
                        })
                    };
                    match name.as_str() {
                        "info" => {
                            root = Some(ModuleRevision {
                                organisation: get("organisation")?,
                                module: get("module")?,
                                revision: get("revision")?,
                            });
                        }
                        "dependency" => {
                            let coordinate =
                                PluginCoordinate::parse_parts(&get("org")?, &get("name")?, &get("rev")?)?;
                            let mut dep = DependencyDescriptor::new(coordinate);
                            dep.transitive = attrs.get("transitive").is_none_or(|v| v != "false");
                            dependencies.push(dep);
                        }
                        "exclude" => {
                            let dep = dependencies.last_mut().ok_or_else(|| {
                                Error::ParseError("<exclude> outside of <dependency>".to_string())
                            })?;
                            let any = |key: &str| {
                                attrs
                                    .get(key)
                                    .cloned()
                                    .unwrap_or_else(|| ANY_EXPRESSION.to_string())
                            };
                            dep.exclude_rules.push(ExcludeRule {
                                organisation: any("org"),
                                module: any("module"),
                                artifact: any("artifact"),
                                kind: any("type"),
                                extension: any("ext"),
                                matcher: attrs
                                    .get("matcher")
                                    .cloned()
                                    .unwrap_or_else(|| "exact".to_string()),
                            });
                        }
                        _ => {}
                    }
                }
                Ok(Event::Eof) => break,
                Ok(_) => {}
                Err(e) => {
                    return Err(Error::ParseError(format!(
                        "Invalid module descriptor at position {}: {e}",
                        reader.buffer_position()
                    )));
                }
            }
        }

        let root = root.ok_or_else(|| {
            Error::ParseError("Module descriptor has no <info> element".to_string())
        })?;
        Ok(Self { root, dependencies })
    }

    /// Read a module file written by [`ModuleDescriptor::write_to`]
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::parse_xml(&content)
    }
}
