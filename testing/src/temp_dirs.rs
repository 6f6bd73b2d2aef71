//! Temporary bundle directories.

use crate::settings::{TempDirPolicy, TestSettings};
use parking_lot::Mutex;
use platform_errors::{ConfigError, Result};
use std::path::PathBuf;
use tempfile::TempDir;

/// Absolute paths of the plugin bundle directories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleDirs {
    pub root: String,
    pub install: String,
}

/// Creates bundle directories and keeps them alive while it lives.
///
/// Directories are removed when the allocator is dropped unless the settings
/// ask to keep them.
#[derive(Debug)]
pub struct TempDirAllocator {
    root: Option<PathBuf>,
    prefix: String,
    policy: TempDirPolicy,
    keep: bool,
    held: Mutex<Vec<(String, TempDir)>>,
    memoized: Mutex<Option<BundleDirs>>,
}

impl TempDirAllocator {
    pub fn new(settings: &TestSettings) -> Self {
        Self {
            root: settings.temp_root.clone(),
            prefix: settings.temp_prefix.clone(),
            policy: settings.temp_dir_policy,
            keep: settings.keep_temp_dirs,
            held: Mutex::new(Vec::new()),
            memoized: Mutex::new(None),
        }
    }

    /// Bundle root and install directories, per the configured policy.
    pub fn bundle_dirs(&self) -> Result<BundleDirs> {
        match self.policy {
            TempDirPolicy::PerCall => self.fresh_bundle_dirs(),
            TempDirPolicy::PerInstance => {
                let mut memoized = self.memoized.lock();
                if let Some(dirs) = memoized.as_ref() {
                    return Ok(dirs.clone());
                }
                let dirs = self.fresh_bundle_dirs()?;
                *memoized = Some(dirs.clone());
                Ok(dirs)
            }
        }
    }

    fn fresh_bundle_dirs(&self) -> Result<BundleDirs> {
        Ok(BundleDirs {
            root: self.allocate()?,
            install: self.allocate()?,
        })
    }

    /// Create one new directory and return its absolute path.
    pub fn allocate(&self) -> Result<String> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(&self.prefix);

        let dir = match &self.root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| ConfigError::io("creating temporary directory", e))?;

        let path = std::path::absolute(dir.path())
            .map_err(|e| ConfigError::io("resolving temporary directory path", e))?;
        tracing::trace!("Allocated temporary directory {}", path.display());

        let path = path.to_string_lossy().into_owned();
        if self.keep {
            let _ = dir.keep();
        } else {
            self.held.lock().push((path.clone(), dir));
        }

        Ok(path)
    }

    /// Remove every owned directory except those in `keep` and the memoized
    /// per-instance pair. Returns how many were removed.
    pub fn release_except(&self, keep: &[&str]) -> usize {
        let memoized = self.memoized.lock();
        let is_memoized = |path: &str| {
            memoized
                .as_ref()
                .is_some_and(|dirs| dirs.root == path || dirs.install == path)
        };

        let mut held = self.held.lock();
        let before = held.len();
        held.retain(|(path, _)| keep.contains(&path.as_str()) || is_memoized(path.as_str()));
        let released = before - held.len();

        if released > 0 {
            tracing::debug!("Released {} temporary directories", released);
        }
        released
    }

    /// Number of directories currently owned by this allocator.
    pub fn held(&self) -> usize {
        self.held.lock().len()
    }
}
