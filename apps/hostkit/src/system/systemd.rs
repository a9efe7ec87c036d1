//! systemctl service manager adapter.

use super::runner::CommandRunner;
use hostkit_core::{CommandOutput, HostkitError, ServiceAction, ServiceManager};

/// Drives units through `systemctl`.
pub struct Systemctl<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> Systemctl<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl ServiceManager for Systemctl<'_> {
    fn control(&self, action: ServiceAction, service: &str) -> Result<CommandOutput, HostkitError> {
        match action {
            ServiceAction::DaemonReload => self.runner.run("systemctl", &["daemon-reload"], &[]),
            _ => self.runner.run("systemctl", &[action.verb(), service], &[]),
        }
    }
}
