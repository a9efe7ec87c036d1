//! Release archive extraction with `unzip`.

use super::runner::CommandRunner;
use hostkit_core::{ArchiveExtractor, HostkitError};
use std::path::Path;

pub struct UnzipExtractor<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> UnzipExtractor<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl ArchiveExtractor for UnzipExtractor<'_> {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), HostkitError> {
        if !self.runner.exists("unzip") {
            return Err(HostkitError::Install(
                "unzip is not installed; run `apt-get install unzip`".to_string(),
            ));
        }
        std::fs::create_dir_all(dest)?;

        let archive_arg = archive.to_string_lossy().into_owned();
        let dest_arg = dest.to_string_lossy().into_owned();
        let out = self.runner.run(
            "unzip",
            &["-o", "-q", archive_arg.as_str(), "-d", dest_arg.as_str()],
            &[],
        )?;
        if !out.success() {
            return Err(HostkitError::Download(format!(
                "cannot unpack {}: {}",
                archive.display(),
                out.failure_summary()
            )));
        }
        Ok(())
    }
}
