//! apt-get package manager adapter.

use super::runner::CommandRunner;
use hostkit_core::{CommandOutput, HostkitError, PackageManager, PackageOp};

/// Environment for unattended apt runs.
const APT_ENV: &[(&str, &str)] = &[
    ("DEBIAN_FRONTEND", "noninteractive"),
    ("APT_LISTCHANGES_FRONTEND", "none"),
];

/// Keep locally modified config files and take defaults for the rest.
const CONFFILE_OPTIONS: &[&str] = &[
    "-o",
    "Dpkg::Options::=--force-confdef",
    "-o",
    "Dpkg::Options::=--force-confold",
];

const BOOTLOADER_TOOL: &str = "update-grub";

/// `apt-get` arguments for an operation. `None` for the bootloader step.
#[must_use]
pub fn apt_args(op: PackageOp) -> Option<Vec<&'static str>> {
    let mut args = Vec::new();
    match op {
        PackageOp::RefreshIndex => args.push("update"),
        PackageOp::Upgrade | PackageOp::FullUpgrade => {
            args.push("-y");
            args.extend_from_slice(CONFFILE_OPTIONS);
            args.push(if op == PackageOp::Upgrade {
                "upgrade"
            } else {
                "full-upgrade"
            });
        }
        PackageOp::Autoremove => args.extend_from_slice(&["-y", "--purge", "autoremove"]),
        PackageOp::Clean => args.push("clean"),
        PackageOp::UpdateBootloader => return None,
    }
    Some(args)
}

/// Runs phase steps with apt-get.
pub struct AptGet<'a> {
    runner: &'a dyn CommandRunner,
}

impl<'a> AptGet<'a> {
    #[must_use]
    pub fn new(runner: &'a dyn CommandRunner) -> Self {
        Self { runner }
    }
}

impl PackageManager for AptGet<'_> {
    fn execute(&self, op: PackageOp) -> Result<CommandOutput, HostkitError> {
        match apt_args(op) {
            Some(args) => self.runner.run("apt-get", &args, APT_ENV),
            None if self.runner.exists(BOOTLOADER_TOOL) => self.runner.run(BOOTLOADER_TOOL, &[], &[]),
            None => {
                tracing::info!("{} not found, skipping bootloader update", BOOTLOADER_TOOL);
                Ok(CommandOutput::ok())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::runner::testing::ScriptedRunner;
    use super::*;

    #[test]
    fn full_upgrade_is_unattended() {
        let runner = ScriptedRunner::default();
        let out = AptGet::new(&runner)
            .execute(PackageOp::FullUpgrade)
            .expect("execute");
        assert!(out.success());
        assert_eq!(
            runner.calls.borrow()[0],
            "DEBIAN_FRONTEND=noninteractive APT_LISTCHANGES_FRONTEND=none apt-get -y \
             -o Dpkg::Options::=--force-confdef -o Dpkg::Options::=--force-confold full-upgrade"
        );
    }

    #[test]
    fn bootloader_step_uses_update_grub_when_present() {
        let runner = ScriptedRunner {
            installed: vec!["update-grub"],
            ..ScriptedRunner::default()
        };
        AptGet::new(&runner)
            .execute(PackageOp::UpdateBootloader)
            .expect("execute");
        assert_eq!(*runner.calls.borrow(), vec!["update-grub".to_string()]);
    }

    #[test]
    fn bootloader_step_skipped_without_grub() {
        let runner = ScriptedRunner::default();
        let out = AptGet::new(&runner)
            .execute(PackageOp::UpdateBootloader)
            .expect("execute");
        assert!(out.success());
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn failure_is_returned_not_raised() {
        let runner = ScriptedRunner {
            outputs: vec![("apt-get", CommandOutput::failed(100, "E: Could not resolve"))],
            ..ScriptedRunner::default()
        };
        let out = AptGet::new(&runner)
            .execute(PackageOp::RefreshIndex)
            .expect("execute");
        assert_eq!(out.status, Some(100));
    }
}
