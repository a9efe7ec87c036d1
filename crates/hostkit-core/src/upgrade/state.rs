//! # Persisted Upgrade State
//!
//! The durable marker naming the last completed phase target.
//!
//! On disk it is a single line holding a version id (e.g. `12`). An absent or
//! empty file means "not started". Writes go through a temporary file in the
//! same directory followed by a rename, so an interrupted write leaves either
//! the old marker or the new one, never a truncated file.

use crate::primitives::MAX_STATE_FILE_SIZE;
use crate::{HostkitError, VersionId};
use std::cell::{Cell, RefCell};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Storage for the last completed phase marker.
pub trait StateStore {
    /// Read the marker. `Ok(None)` means no phase has completed.
    fn load(&self) -> Result<Option<VersionId>, HostkitError>;

    /// Record `completed` as the last finished phase target.
    fn save(&self, completed: &VersionId) -> Result<(), HostkitError>;

    /// Remove the marker. Removing an absent marker is not an error.
    fn clear(&self) -> Result<(), HostkitError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// State marker kept in a single text file.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by `path`. Nothing is touched until the first call.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the marker file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Parse marker file contents.
fn parse_marker(contents: &str) -> Result<Option<VersionId>, HostkitError> {
    let mut lines = contents.lines().map(str::trim).filter(|l| !l.is_empty());
    let Some(first) = lines.next() else {
        return Ok(None);
    };
    if lines.next().is_some() || first.chars().any(char::is_whitespace) {
        return Err(HostkitError::State(format!(
            "state file must hold a single version id, found {:?}",
            contents.trim()
        )));
    }
    Ok(Some(VersionId::new(first)))
}

impl StateStore for FileStateStore {
    fn load(&self) -> Result<Option<VersionId>, HostkitError> {
        let metadata = match std::fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(HostkitError::State(format!(
                    "cannot stat {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        if metadata.len() > MAX_STATE_FILE_SIZE {
            return Err(HostkitError::State(format!(
                "{} is {} bytes, larger than a version marker can be",
                self.path.display(),
                metadata.len()
            )));
        }

        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            HostkitError::State(format!("cannot read {}: {}", self.path.display(), e))
        })?;
        parse_marker(&contents)
    }

    fn save(&self, completed: &VersionId) -> Result<(), HostkitError> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        writeln!(tmp, "{}", completed)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| {
            HostkitError::State(format!("cannot write {}: {}", self.path.display(), e))
        })?;

        tracing::debug!(path = %self.path.display(), marker = %completed, "state saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), HostkitError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "state cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(HostkitError::State(format!(
                "cannot remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

// =============================================================================
// MEMORY STORE
// =============================================================================

/// Volatile store for dry runs and tests. Counts writes.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    marker: RefCell<Option<VersionId>>,
    writes: Cell<usize>,
}

impl MemoryStateStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already records `marker`.
    #[must_use]
    pub fn with_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: RefCell::new(Some(VersionId::new(marker))),
            writes: Cell::new(0),
        }
    }

    /// Number of `save` and `clear` calls so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<VersionId>, HostkitError> {
        Ok(self.marker.borrow().clone())
    }

    fn save(&self, completed: &VersionId) -> Result<(), HostkitError> {
        *self.marker.borrow_mut() = Some(completed.clone());
        self.writes.set(self.writes.get().saturating_add(1));
        Ok(())
    }

    fn clear(&self) -> Result<(), HostkitError> {
        *self.marker.borrow_mut() = None;
        self.writes.set(self.writes.get().saturating_add(1));
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_marker_accepts_single_line() {
        assert_eq!(
            parse_marker("12\n").expect("parse"),
            Some(VersionId::new("12"))
        );
        assert_eq!(
            parse_marker("  13  ").expect("parse"),
            Some(VersionId::new("13"))
        );
    }

    #[test]
    fn parse_marker_empty_is_none() {
        assert_eq!(parse_marker("").expect("parse"), None);
        assert_eq!(parse_marker("\n\n").expect("parse"), None);
    }

    #[test]
    fn parse_marker_rejects_garbage() {
        assert!(matches!(
            parse_marker("12\n13\n"),
            Err(HostkitError::State(_))
        ));
        assert!(matches!(parse_marker("1 2"), Err(HostkitError::State(_))));
    }

    #[test]
    fn memory_store_counts_writes() {
        let store = MemoryStateStore::new();
        assert_eq!(store.load().expect("load"), None);

        store.save(&VersionId::new("12")).expect("save");
        assert_eq!(store.load().expect("load"), Some(VersionId::new("12")));

        store.clear().expect("clear");
        assert_eq!(store.load().expect("load"), None);
        assert_eq!(store.writes(), 2);
    }
}
