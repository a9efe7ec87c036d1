//! apt sources rewriting.

use super::fs::write_atomic;
use hostkit_core::templates::{AptSources, retarget_codename};
use hostkit_core::{HostkitError, Phase, SourcesWriter};
use std::path::{Path, PathBuf};

/// Rewrites `sources.list` for the phase target and retargets third-party
/// fragments in `sources.list.d`.
#[derive(Debug, Clone)]
pub struct AptSourcesWriter {
    sources_list: PathBuf,
    sources_dir: PathBuf,
    mirror: String,
    security_mirror: String,
}

impl AptSourcesWriter {
    #[must_use]
    pub fn new(
        sources_list: impl Into<PathBuf>,
        sources_dir: impl Into<PathBuf>,
        mirror: impl Into<String>,
        security_mirror: impl Into<String>,
    ) -> Self {
        Self {
            sources_list: sources_list.into(),
            sources_dir: sources_dir.into(),
            mirror: mirror.into(),
            security_mirror: security_mirror.into(),
        }
    }

    /// Copy `path` to `<path>.<codename>.bak` once; an existing backup is kept.
    fn backup(path: &Path, codename: &str) -> Result<(), HostkitError> {
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".{}.bak", codename));
        let backup = PathBuf::from(name);
        if backup.exists() || !path.exists() {
            return Ok(());
        }
        std::fs::copy(path, &backup).map_err(|e| {
            HostkitError::Io(format!("cannot back up {}: {}", path.display(), e))
        })?;
        tracing::debug!(backup = %backup.display(), "backed up");
        Ok(())
    }

    fn fragments(&self) -> Result<Vec<PathBuf>, HostkitError> {
        let entries = match std::fs::read_dir(&self.sources_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(HostkitError::Io(format!(
                    "cannot list {}: {}",
                    self.sources_dir.display(),
                    e
                )));
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.is_file()
                    && p.extension()
                        .is_some_and(|ext| ext == "list" || ext == "sources")
            })
            .collect();
        paths.sort();
        Ok(paths)
    }
}

impl SourcesWriter for AptSourcesWriter {
    fn write_sources(&self, phase: &Phase) -> Result<(), HostkitError> {
        let from = phase.source_codename.as_str();

        let text = AptSources::for_release(
            &phase.target_codename,
            self.mirror.as_str(),
            self.security_mirror.as_str(),
        )
        .render()?;
        Self::backup(&self.sources_list, from)?;
        write_atomic(&self.sources_list, text.as_bytes(), Some(0o644))?;
        tracing::info!(path = %self.sources_list.display(), codename = %phase.target_codename, "sources rewritten");

        for path in self.fragments()? {
            let original = std::fs::read_to_string(&path)
                .map_err(|e| HostkitError::Io(format!("cannot read {}: {}", path.display(), e)))?;
            let updated =
                retarget_codename(&original, &phase.source_codename, &phase.target_codename)?;
            if updated != original {
                Self::backup(&path, from)?;
                write_atomic(&path, updated.as_bytes(), Some(0o644))?;
                tracing::info!(path = %path.display(), "retargeted");
            }
        }
        Ok(())
    }
}
