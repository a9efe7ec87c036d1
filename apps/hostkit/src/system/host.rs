//! Pre-flight probes: free space, package manager locks, mirror reachability.

use super::runner::CommandRunner;
use hostkit_core::primitives::{NETWORK_PROBE_TIMEOUT_SECS, PACKAGE_LOCK_FILES};
use hostkit_core::upgrade::parse_df_avail_mb;
use hostkit_core::{HostProbe, HostkitError};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Probes the live host.
pub struct SystemProbe<'a> {
    runner: &'a dyn CommandRunner,
    probe_url: String,
    timeout: Duration,
    locks: Vec<PathBuf>,
    proc_root: PathBuf,
}

impl<'a> SystemProbe<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner, probe_url: impl Into<String>) -> Self {
        Self {
            runner,
            probe_url: probe_url.into(),
            timeout: Duration::from_secs(NETWORK_PROBE_TIMEOUT_SECS),
            locks: PACKAGE_LOCK_FILES.iter().map(PathBuf::from).collect(),
            proc_root: PathBuf::from("/proc"),
        }
    }

    /// Watch these lock files and read process tables under `proc_root`.
    #[must_use]
    pub fn with_locks(mut self, locks: Vec<PathBuf>, proc_root: impl Into<PathBuf>) -> Self {
        self.locks = locks;
        self.proc_root = proc_root.into();
        self
    }

    /// Find a process with `lock` open by reading `<proc>/<pid>/fd` links.
    /// Processes whose fd table is unreadable are skipped.
    fn scan_proc(&self, lock: &Path) -> Result<Option<String>, HostkitError> {
        let entries = std::fs::read_dir(&self.proc_root).map_err(|e| {
            HostkitError::Preflight(format!(
                "fuser not found and {} is unreadable ({}); install psmisc",
                self.proc_root.display(),
                e
            ))
        })?;

        for entry in entries.flatten() {
            let name = entry.file_name();
            let Some(pid) = name.to_str().filter(|n| n.bytes().all(|b| b.is_ascii_digit()))
            else {
                continue;
            };
            let Ok(fds) = std::fs::read_dir(entry.path().join("fd")) else {
                continue;
            };
            for fd in fds.flatten() {
                if let Ok(target) = std::fs::read_link(fd.path())
                    && target == lock
                {
                    return Ok(Some(pid.to_string()));
                }
            }
        }
        Ok(None)
    }
}

impl HostProbe for SystemProbe<'_> {
    fn free_space_mb(&self) -> Result<u64, HostkitError> {
        let out = self.runner.run("df", &["--output=avail", "-BM", "/"], &[])?;
        if !out.success() {
            return Err(HostkitError::Preflight(format!(
                "df failed: {}",
                out.failure_summary()
            )));
        }
        parse_df_avail_mb(&out.stdout)
    }

    fn package_lock_holder(&self) -> Result<Option<String>, HostkitError> {
        let has_fuser = self.runner.exists("fuser");
        if !has_fuser {
            tracing::debug!("fuser not installed, scanning process fd tables");
        }

        for lock in &self.locks {
            if !lock.exists() {
                continue;
            }
            let holder = if has_fuser {
                // fuser exits 0 and prints PIDs when some process has the file open.
                let path = lock.to_string_lossy();
                let out = self.runner.run("fuser", &[&*path], &[])?;
                out.success().then(|| out.stdout.trim().to_string())
            } else {
                self.scan_proc(lock)?
            };
            if let Some(pid) = holder {
                return Ok(Some(format!("{} by pid {}", lock.display(), pid)));
            }
        }
        Ok(None)
    }

    fn network_reachable(&self) -> Result<bool, HostkitError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| HostkitError::Preflight(format!("http client: {}", e)))?;

        match client.head(&self.probe_url).send() {
            Ok(response) => {
                let status = response.status();
                tracing::debug!(url = %self.probe_url, %status, "network probe");
                Ok(status.is_success() || status.is_redirection())
            }
            Err(e) => {
                tracing::debug!(url = %self.probe_url, error = %e, "network probe failed");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::runner::testing::ScriptedRunner;
    use super::*;
    use hostkit_core::CommandOutput;

    #[test]
    fn free_space_from_df() {
        let runner = ScriptedRunner {
            outputs: vec![(
                "df",
                CommandOutput {
                    status: Some(0),
                    stdout: " Avail\n 5120M\n".to_string(),
                    stderr: String::new(),
                },
            )],
            ..ScriptedRunner::default()
        };
        let probe = SystemProbe::new(&runner, "http://127.0.0.1:9/");
        assert_eq!(probe.free_space_mb().expect("df"), 5120);
        assert_eq!(runner.calls.borrow()[0], "df --output=avail -BM /");
    }

    #[test]
    fn df_failure_is_preflight_error() {
        let runner = ScriptedRunner {
            outputs: vec![("df", CommandOutput::failed(1, "df: /: No such file"))],
            ..ScriptedRunner::default()
        };
        let probe = SystemProbe::new(&runner, "http://127.0.0.1:9/");
        assert!(matches!(probe.free_space_mb(), Err(HostkitError::Preflight(_))));
    }

    fn lock_fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let lock = dir.path().join("lock-frontend");
        std::fs::write(&lock, b"").expect("lock");
        let proc_root = dir.path().join("proc");
        std::fs::create_dir_all(proc_root.join("self").join("fd")).expect("self");
        std::fs::create_dir_all(proc_root.join("4242").join("fd")).expect("pid dir");
        (dir, lock, proc_root)
    }

    #[test]
    fn lock_holder_from_fuser() {
        let (_dir, lock, proc_root) = lock_fixture();
        let runner = ScriptedRunner {
            outputs: vec![(
                "fuser",
                CommandOutput {
                    status: Some(0),
                    stdout: " 812\n".to_string(),
                    stderr: String::new(),
                },
            )],
            installed: vec!["fuser"],
            ..ScriptedRunner::default()
        };
        let probe =
            SystemProbe::new(&runner, "http://127.0.0.1:9/").with_locks(vec![lock.clone()], proc_root);

        let holder = probe.package_lock_holder().expect("probe");
        assert_eq!(holder, Some(format!("{} by pid 812", lock.display())));
    }

    #[test]
    fn lock_holder_without_fuser_scans_proc() {
        let (_dir, lock, proc_root) = lock_fixture();
        std::os::unix::fs::symlink(&lock, proc_root.join("4242").join("fd").join("7"))
            .expect("symlink");
        std::os::unix::fs::symlink(&lock, proc_root.join("self").join("fd").join("3"))
            .expect("symlink");

        let runner = ScriptedRunner::default();
        let probe = SystemProbe::new(&runner, "http://127.0.0.1:9/")
            .with_locks(vec![lock.clone()], &proc_root);

        let holder = probe.package_lock_holder().expect("probe");
        assert_eq!(holder, Some(format!("{} by pid 4242", lock.display())));
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn free_lock_without_fuser() {
        let (_dir, lock, proc_root) = lock_fixture();
        std::fs::write(proc_root.join("4242").join("fd").join("0"), b"").expect("fd");

        let runner = ScriptedRunner::default();
        let probe =
            SystemProbe::new(&runner, "http://127.0.0.1:9/").with_locks(vec![lock], proc_root);
        assert_eq!(probe.package_lock_holder().expect("probe"), None);
    }

    #[test]
    fn unreadable_proc_without_fuser_is_preflight_error() {
        let (dir, lock, _proc_root) = lock_fixture();
        let runner = ScriptedRunner::default();
        let probe = SystemProbe::new(&runner, "http://127.0.0.1:9/")
            .with_locks(vec![lock], dir.path().join("missing"));

        let err = probe.package_lock_holder().expect_err("no proc table");
        assert!(matches!(err, HostkitError::Preflight(ref msg) if msg.contains("psmisc")));
    }

    #[test]
    fn unreachable_mirror_is_false_not_error() {
        let runner = ScriptedRunner::default();
        let probe = SystemProbe::new(&runner, "http://127.0.0.1:9/");
        assert!(!probe.network_reachable().expect("probe"));
    }
}
