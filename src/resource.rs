// src/resource.rs

//! File resources: the source files a transformation runs over
//!
//! A [`FileResource`] is a root path plus optional filters:
//!
//! - `extensions`: file name suffixes (`java` selects `*.java`)
//! - `includes` / `excludes`: wildcard patterns, relative to the root unless
//!   they already start with it
//!
//! Patterns follow the usual wildcard rules (`*` and `**` match any run of
//! characters, separators included, `?` one character). A pattern without
//! wildcards also matches everything beneath it, and every directory on the
//! way to an include is entered so deep includes can be reached.

use crate::error::{Error, Result};
use glob::{MatchOptions, Pattern};
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// A compiled include or exclude pattern
#[derive(Debug, Clone)]
struct PathFilter {
    /// Root joined with the user pattern, unescaped
    full: String,
    /// `full` up to the first wildcard of the user pattern
    literal: String,
    pattern: Pattern,
    /// For `dir/**`, the directory itself
    base: Option<Pattern>,
}

const WILDCARDS: [char; 3] = ['*', '?', '['];

impl PathFilter {
    fn new(root: &str, raw: &str) -> Result<Self> {
        let raw = raw.replace('\\', "/");
        let relative = raw
            .strip_prefix(root)
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))
            .unwrap_or(raw.as_str())
            .trim_start_matches('/');

        let root = root.trim_end_matches('/');
        let escaped = Pattern::escape(root);
        let compile = |rel: &str| {
            Pattern::new(&format!("{escaped}/{rel}"))
                .map_err(|e| Error::ParseError(format!("Invalid pattern '{rel}': {e}")))
        };

        let pattern = compile(relative)?;
        let base = relative.strip_suffix("/**").map(compile).transpose()?;
        let literal_end = relative.find(WILDCARDS).unwrap_or(relative.len());

        Ok(Self {
            full: format!("{root}/{relative}"),
            literal: format!("{root}/{}", &relative[..literal_end]),
            pattern,
            base,
        })
    }

    fn is_literal(&self) -> bool {
        self.literal.len() == self.full.len()
    }

    /// Whether `path` is matched by the pattern itself
    fn matches(&self, path: &str) -> bool {
        self.pattern.matches_with(path, MATCH_OPTIONS)
            || self
                .base
                .as_ref()
                .is_some_and(|base| base.matches_with(path, MATCH_OPTIONS))
            || (self.is_literal() && is_beneath(path, &self.full))
    }

    /// Whether `path` is a directory that must be entered to reach matches
    ///
    /// Ancestors of the literal part always qualify. Past the first wildcard
    /// any directory may still contain a match.
    fn leads_to(&self, path: &str) -> bool {
        let prefix = self.literal.as_str();
        prefix == path
            || is_beneath(prefix, path)
            || (!self.is_literal() && path.starts_with(prefix))
    }
}

/// `path` lies strictly inside `dir`
fn is_beneath(path: &str, dir: &str) -> bool {
    path.strip_prefix(dir)
        .is_some_and(|rest| rest.starts_with('/') || (dir.ends_with('/') && !rest.is_empty()))
}

/// Make a path absolute and lexically normalized, with `/` separators
fn normalize(path: &Path) -> Result<String> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    Ok(normalized.to_string_lossy().replace('\\', "/"))
}

/// A root file or directory with extension and path filters
#[derive(Debug, Clone, Default)]
pub struct FileResource {
    path: PathBuf,
    extensions: Vec<String>,
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl FileResource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Only select files with one of these extensions (without the dot)
    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_includes(mut self, includes: Vec<String>) -> Self {
        self.includes = includes;
        self
    }

    pub fn with_excludes(mut self, excludes: Vec<String>) -> Self {
        self.excludes = excludes;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// Walk the resource
    ///
    /// Each call starts a fresh, lazy traversal. Directories that cannot be
    /// read are skipped.
    pub fn iter(&self) -> Result<FileResourceIter> {
        let root = normalize(&self.path)?;
        let includes = self
            .includes
            .iter()
            .map(|p| PathFilter::new(&root, p))
            .collect::<Result<Vec<_>>>()?;
        let excludes = self
            .excludes
            .iter()
            .map(|p| PathFilter::new(&root, p))
            .collect::<Result<Vec<_>>>()?;
        let suffixes = self.extensions.iter().map(|e| format!(".{e}")).collect();

        let filter = Filter {
            root: root.clone(),
            includes,
            excludes,
            suffixes,
        };

        Ok(FileResourceIter {
            walker: WalkDir::new(&root).follow_links(false).into_iter(),
            filter,
        })
    }

    /// Collect the selected files
    pub fn files(&self) -> Result<Vec<PathBuf>> {
        Ok(self.iter()?.collect())
    }
}

#[derive(Debug)]
struct Filter {
    root: String,
    includes: Vec<PathFilter>,
    excludes: Vec<PathFilter>,
    suffixes: Vec<String>,
}

impl Filter {
    fn has_path_filters(&self) -> bool {
        !self.includes.is_empty() || !self.excludes.is_empty()
    }

    fn excluded(&self, path: &str) -> bool {
        self.excludes.iter().any(|f| f.matches(path))
    }

    fn accepts_dir(&self, path: &str) -> bool {
        if path == self.root {
            return true;
        }
        let included = self.includes.is_empty()
            || self.includes.iter().any(|f| f.matches(path) || f.leads_to(path));
        included && !self.excluded(path)
    }

    fn accepts_file(&self, path: &str, is_root: bool) -> bool {
        let extension_ok =
            self.suffixes.is_empty() || self.suffixes.iter().any(|s| path.ends_with(s.as_str()));
        if !extension_ok {
            return false;
        }
        if is_root || !self.has_path_filters() {
            return true;
        }
        let included = self.includes.is_empty() || self.includes.iter().any(|f| f.matches(path));
        included && !self.excluded(path)
    }
}

/// Lazy iterator over the files of a [`FileResource`]
pub struct FileResourceIter {
    walker: walkdir::IntoIter,
    filter: Filter,
}

impl Iterator for FileResourceIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            let path = entry.path().to_string_lossy().replace('\\', "/");

            if entry.file_type().is_dir() {
                if !self.filter.accepts_dir(&path) {
                    self.walker.skip_current_dir();
                }
                continue;
            }

            if self.filter.accepts_file(&path, entry.depth() == 0) {
                return Some(entry.into_path());
            }
        }
    }
}

/// Parent directory of `path` with separators replaced by `separator`
///
/// `src/org/example/Foo.java` with `.` gives `src.org.example`.
pub fn nearest_namespace(path: &Path, separator: &str) -> Result<String> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| Error::NotFoundError(format!("{} has no parent", path.display())))?;
    Ok(parent
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, separator)
        .replace('/', separator))
}

/// Namespace owning `path`; the same as [`nearest_namespace`] for files
pub fn owner_namespace(path: &Path, separator: &str) -> Result<String> {
    nearest_namespace(path, separator)
}
