//! OS identification from the release files.

use hostkit_core::{HostVersion, HostkitError, VersionDetector, detect_host_version};
use std::path::{Path, PathBuf};

/// Reads `/etc/os-release` and `/etc/debian_version` (paths configurable).
#[derive(Debug, Clone)]
pub struct OsReleaseDetector {
    os_release: PathBuf,
    debian_version: PathBuf,
}

impl OsReleaseDetector {
    #[must_use]
    pub fn new(os_release: impl Into<PathBuf>, debian_version: impl Into<PathBuf>) -> Self {
        Self {
            os_release: os_release.into(),
            debian_version: debian_version.into(),
        }
    }
}

fn read_optional(path: &Path) -> Result<Option<String>, HostkitError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(HostkitError::Detection(format!(
            "cannot read {}: {}",
            path.display(),
            e
        ))),
    }
}

impl VersionDetector for OsReleaseDetector {
    fn detect(&self) -> Result<HostVersion, HostkitError> {
        let os_release = read_optional(&self.os_release)?;
        let debian_version = read_optional(&self.debian_version)?;
        detect_host_version(os_release.as_deref(), debian_version.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostkit_core::VersionId;

    #[test]
    fn reads_version_from_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let os_release = dir.path().join("os-release");
        std::fs::write(
            &os_release,
            "PRETTY_NAME=\"Debian GNU/Linux 11 (bullseye)\"\nID=debian\nVERSION_ID=\"11\"\nVERSION_CODENAME=bullseye\n",
        )
        .expect("write");

        let host = OsReleaseDetector::new(&os_release, dir.path().join("missing"))
            .detect()
            .expect("detect");
        assert_eq!(host.version, VersionId::new("11"));
    }

    #[test]
    fn falls_back_to_debian_version() {
        let dir = tempfile::tempdir().expect("tempdir");
        let debian_version = dir.path().join("debian_version");
        std::fs::write(&debian_version, "12.7\n").expect("write");

        let host = OsReleaseDetector::new(dir.path().join("missing"), &debian_version)
            .detect()
            .expect("detect");
        assert_eq!(host.version, VersionId::new("12"));
    }

    #[test]
    fn nothing_readable_is_detection_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result =
            OsReleaseDetector::new(dir.path().join("a"), dir.path().join("b")).detect();
        assert!(matches!(result, Err(HostkitError::Detection(_))));
    }
}
