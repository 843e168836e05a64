// src/loader.rs

//! Isolated, chained execution scopes for plugin artifacts
//!
//! An [`ExecutionScope`] is an ordered list of artifact files with an
//! optional parent. Lookups ask the parent chain first and only then the
//! scope's own entries, so everything the host can see stays visible to
//! plugin code. The parent keeps no reference to its children: plugins
//! loaded into a child never leak into the host's scope.

use crate::error::Result;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A layer of artifact files on top of an optional parent scope
#[derive(Debug, Default)]
pub struct ExecutionScope {
    entries: Vec<PathBuf>,
    parent: Option<Arc<ExecutionScope>>,
}

impl ExecutionScope {
    /// The empty scope of the host itself
    pub fn root() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Build a scope whose search order is exactly `files`, parented to
    /// `parent`
    ///
    /// Every file must exist and be a regular file; the first that isn't
    /// fails the whole construction with the underlying I/O error.
    pub fn with_parent(files: Vec<PathBuf>, parent: Arc<ExecutionScope>) -> Result<Arc<Self>> {
        for file in &files {
            let metadata = fs::metadata(file)?;
            if !metadata.is_file() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is not a file", file.display()),
                )
                .into());
            }
        }
        debug!(
            "Created execution scope with {} entries (depth {})",
            files.len(),
            parent.depth() + 1
        );
        Ok(Arc::new(Self {
            entries: files,
            parent: Some(parent),
        }))
    }

    /// This scope's own entries, in search order
    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    pub fn parent(&self) -> Option<&Arc<ExecutionScope>> {
        self.parent.as_ref()
    }

    /// Number of ancestors
    pub fn depth(&self) -> usize {
        self.parent.as_ref().map_or(0, |p| p.depth() + 1)
    }

    /// Every entry visible from this scope, ancestors first
    pub fn search_path(&self) -> Vec<PathBuf> {
        let mut path = self
            .parent
            .as_ref()
            .map(|p| p.search_path())
            .unwrap_or_default();
        path.extend(self.entries.iter().cloned());
        path
    }

    /// Find the first visible entry satisfying `predicate`, parent first
    pub fn find<P>(&self, predicate: P) -> Option<&Path>
    where
        P: Fn(&Path) -> bool + Copy,
    {
        if let Some(found) = self.parent.as_ref().and_then(|p| p.find(predicate)) {
            return Some(found);
        }
        self.entries
            .iter()
            .map(PathBuf::as_path)
            .find(|entry| predicate(*entry))
    }

    /// Find a visible entry by file name
    pub fn find_file(&self, file_name: &str) -> Option<&Path> {
        self.find(|p| p.file_name().is_some_and(|n| n == file_name))
    }

    /// Whether `other` is this scope or one of its ancestors
    pub fn descends_from(&self, other: &Arc<ExecutionScope>) -> bool {
        if std::ptr::eq(self, Arc::as_ptr(other)) {
            return true;
        }
        self.parent
            .as_ref()
            .is_some_and(|p| p.descends_from(other))
    }
}
