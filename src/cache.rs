// src/cache.rs

//! Memoization of resolution results
//!
//! A [`ResolutionCache`] remembers the coordinate set of the last successful
//! resolution and the files it produced. A later request for a subset of
//! that set is answered from the cache without touching the backend; any
//! coordinate outside the remembered set forces a full resolution of the
//! *current* set, whose result then replaces the remembered one (sets are
//! never merged).
//!
//! The cache is shared explicitly, usually through an `Arc`. Its lock is held
//! for the whole compare-resolve-store sequence, so sessions on different
//! threads cannot interleave inside it; the price is that they also resolve
//! one at a time.

use crate::coordinate::CoordinateSet;
use crate::error::Result;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct CacheState {
    last_resolved: CoordinateSet,
    /// `None` after a failed resolution, which makes the entry unusable
    files: Option<Vec<PathBuf>>,
}

/// Process- or session-wide memo of the last resolution
#[derive(Debug, Default)]
pub struct ResolutionCache {
    state: Mutex<CacheState>,
}

impl ResolutionCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic inside `resolve` leaves the state consistent: the store
        // happens only after it returned.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Return cached files for `requested`, or run `resolve` and remember
    /// its result
    pub fn resolve_with<F>(&self, requested: &CoordinateSet, resolve: F) -> Result<Vec<PathBuf>>
    where
        F: FnOnce() -> Result<Vec<PathBuf>>,
    {
        let mut state = self.lock();

        if !state.last_resolved.is_empty()
            && requested.is_subset(&state.last_resolved)
            && let Some(files) = &state.files
        {
            debug!(
                "Reusing resolution of {} coordinates for {} requested",
                state.last_resolved.len(),
                requested.len()
            );
            return Ok(files.clone());
        }

        match resolve() {
            Ok(files) => {
                state.last_resolved = requested.clone();
                state.files = Some(files.clone());
                Ok(files)
            }
            Err(e) => {
                state.files = None;
                Err(e)
            }
        }
    }

    /// Coordinates of the last successful resolution
    pub fn last_resolved(&self) -> CoordinateSet {
        self.lock().last_resolved.clone()
    }

    /// Files of the last successful resolution, if still usable
    pub fn files(&self) -> Option<Vec<PathBuf>> {
        self.lock().files.clone()
    }

    /// Forget everything
    pub fn clear(&self) {
        *self.lock() = CacheState::default();
    }
}
