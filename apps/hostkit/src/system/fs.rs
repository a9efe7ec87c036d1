//! Local filesystem adapter.

use hostkit_core::{Filesystem, HostkitError};
use std::fs::Permissions;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

/// Replace `path` with `contents` via a temp file in the same directory.
///
/// Readers see either the old file or the new one, never a partial write.
/// Replacing a running binary this way also avoids `ETXTBSY`.
pub fn write_atomic(path: &Path, contents: &[u8], mode: Option<u32>) -> Result<(), HostkitError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    std::fs::create_dir_all(parent)
        .map_err(|e| HostkitError::Io(format!("cannot create {}: {}", parent.display(), e)))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .map_err(|e| HostkitError::Io(format!("cannot create temp file in {}: {}", parent.display(), e)))?;
    tmp.write_all(contents)?;
    if let Some(mode) = mode {
        tmp.as_file().set_permissions(Permissions::from_mode(mode))?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path)
        .map_err(|e| HostkitError::Io(format!("cannot replace {}: {}", path.display(), e.error)))?;
    Ok(())
}

/// Real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl Filesystem for LocalFs {
    fn read_to_string(&self, path: &Path) -> Result<Option<String>, HostkitError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(HostkitError::Io(format!("cannot read {}: {}", path.display(), e))),
        }
    }

    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<(), HostkitError> {
        write_atomic(path, contents, Some(mode))?;
        tracing::debug!(path = %path.display(), mode = %format!("{:o}", mode), "wrote");
        Ok(())
    }

    fn install_file(&self, from: &Path, to: &Path, mode: u32) -> Result<(), HostkitError> {
        let bytes = std::fs::read(from)
            .map_err(|e| HostkitError::Io(format!("cannot read {}: {}", from.display(), e)))?;
        write_atomic(to, &bytes, Some(mode))?;
        tracing::debug!(from = %from.display(), to = %to.display(), "installed");
        Ok(())
    }

    fn remove_path(&self, path: &Path) -> Result<bool, HostkitError> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(m) => m,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(HostkitError::Io(format!("cannot stat {}: {}", path.display(), e))),
        };
        let result = if metadata.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        result.map_err(|e| HostkitError::Io(format!("cannot remove {}: {}", path.display(), e)))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_sets_mode_and_creates_parents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("a").join("b.conf");

        LocalFs.write_file(&path, b"psk = x\n", 0o600).expect("write");

        let metadata = std::fs::metadata(&path).expect("metadata");
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
        assert_eq!(
            LocalFs.read_to_string(&path).expect("read"),
            Some("psk = x\n".to_string())
        );
    }

    #[test]
    fn install_copies_with_mode() {
        let dir = tempfile::tempdir().expect("tempdir");
        let from = dir.path().join("snell-server");
        let to = dir.path().join("bin").join("snell-server");
        std::fs::write(&from, b"\x7fELF").expect("write");

        LocalFs.install_file(&from, &to, 0o755).expect("install");
        assert_eq!(std::fs::read(&to).expect("read"), b"\x7fELF");
        let mode = std::fs::metadata(&to).expect("metadata").permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[test]
    fn remove_handles_files_dirs_and_missing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let sub = dir.path().join("snell");
        std::fs::create_dir(&sub).expect("mkdir");
        std::fs::write(sub.join("snell-server.conf"), "x").expect("write");

        assert!(LocalFs.remove_path(&sub).expect("remove dir"));
        assert!(!sub.exists());
        assert!(!LocalFs.remove_path(&sub).expect("remove missing"));
        assert_eq!(LocalFs.read_to_string(&sub).expect("read"), None);
    }
}
