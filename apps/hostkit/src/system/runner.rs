//! External command execution.

use hostkit_core::{CommandOutput, HostkitError};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Directories searched for admin tools that may be missing from `PATH`.
const SBIN_DIRS: &[&str] = &["/usr/local/sbin", "/usr/sbin", "/sbin"];

/// Runs a program to completion and captures its output.
pub trait CommandRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<CommandOutput, HostkitError>;

    /// Whether `program` can be found.
    fn exists(&self, program: &str) -> bool;
}

/// Runs commands on this host with `std::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    fn locate(program: &str) -> Option<PathBuf> {
        if program.contains('/') {
            let path = PathBuf::from(program);
            return path.is_file().then_some(path);
        }
        let path_dirs = std::env::var_os("PATH")
            .map(|p| std::env::split_paths(&p).collect::<Vec<_>>())
            .unwrap_or_default();
        path_dirs
            .into_iter()
            .chain(SBIN_DIRS.iter().map(PathBuf::from))
            .map(|dir| dir.join(program))
            .find(|candidate| candidate.is_file())
    }
}

impl CommandRunner for SystemRunner {
    fn run(
        &self,
        program: &str,
        args: &[&str],
        env: &[(&str, &str)],
    ) -> Result<CommandOutput, HostkitError> {
        let resolved = Self::locate(program).unwrap_or_else(|| Path::new(program).to_path_buf());
        tracing::debug!(program = %resolved.display(), ?args, "exec");

        let output = Command::new(&resolved)
            .args(args)
            .envs(env.iter().copied())
            .stdin(Stdio::null())
            .output()
            .map_err(|e| HostkitError::Io(format!("cannot run {}: {}", program, e)))?;

        let result = CommandOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        tracing::debug!(program, status = ?result.status, "exit");
        Ok(result)
    }

    fn exists(&self, program: &str) -> bool {
        Self::locate(program).is_some()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::cell::RefCell;

    /// Records invocations and answers from a script keyed by program name.
    #[derive(Default)]
    pub(crate) struct ScriptedRunner {
        pub calls: RefCell<Vec<String>>,
        pub outputs: Vec<(&'static str, CommandOutput)>,
        pub installed: Vec<&'static str>,
    }

    impl CommandRunner for ScriptedRunner {
        fn run(
            &self,
            program: &str,
            args: &[&str],
            env: &[(&str, &str)],
        ) -> Result<CommandOutput, HostkitError> {
            let mut line = env
                .iter()
                .map(|(k, v)| format!("{}={} ", k, v))
                .collect::<String>();
            line.push_str(program);
            for arg in args {
                line.push(' ');
                line.push_str(arg);
            }
            self.calls.borrow_mut().push(line);
            Ok(self
                .outputs
                .iter()
                .find(|(p, _)| *p == program)
                .map(|(_, out)| out.clone())
                .unwrap_or_else(CommandOutput::ok))
        }

        fn exists(&self, program: &str) -> bool {
            self.installed.iter().any(|p| *p == program)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn captures_status_and_output() {
        let out = SystemRunner
            .run("sh", &["-c", "echo out; echo err >&2; exit 3"], &[])
            .expect("run sh");
        assert_eq!(out.status, Some(3));
        assert_eq!(out.stdout, "out\n");
        assert_eq!(out.stderr, "err\n");
    }

    #[test]
    fn passes_environment() {
        let out = SystemRunner
            .run("sh", &["-c", "printf %s \"$HOSTKIT_PROBE\""], &[("HOSTKIT_PROBE", "x1")])
            .expect("run sh");
        assert_eq!(out.stdout, "x1");
    }

    #[test]
    fn missing_program_is_io_error() {
        assert!(!SystemRunner.exists("hostkit-definitely-missing"));
        assert!(matches!(
            SystemRunner.run("hostkit-definitely-missing", &[], &[]),
            Err(HostkitError::Io(_))
        ));
    }
}
