//! # Upgrade Command
//!
//! Wires the host adapters into the sequencer and reports the result.

use super::{UpgradeMode, print_json};
use crate::config::HostkitConfig;
use crate::system::{
    AptGet, AptSourcesWriter, OsReleaseDetector, StdinConfirmer, SystemProbe, SystemRunner,
};
use hostkit_core::{
    AutoConfirm, CheckReport, Collaborators, Confirmer, FileStateStore, HostkitError, NextStep,
    RunMode, RunOutcome, Sequencer, StatusReport, UpgradePlan,
};

/// Build every adapter and run `mode`.
pub fn cmd_upgrade(
    config: &HostkitConfig,
    mode: UpgradeMode,
    yes: bool,
    json_mode: bool,
) -> Result<(), HostkitError> {
    let settings = &config.upgrade;
    let runner = SystemRunner;

    let detector = OsReleaseDetector::new(&settings.os_release_path, &settings.debian_version_path);
    let sources = AptSourcesWriter::new(
        &settings.sources_list,
        &settings.sources_dir,
        settings.mirror.as_str(),
        settings.security_mirror.as_str(),
    );
    let packages = AptGet::new(&runner);
    let probe = SystemProbe::new(&runner, settings.probe_url());
    let state = FileStateStore::new(&settings.state_file);
    let confirmer: &dyn Confirmer = if yes || settings.assume_yes {
        &AutoConfirm
    } else {
        &StdinConfirmer
    };

    let sequencer = Sequencer::new(
        UpgradePlan::debian(),
        settings.policy(),
        Collaborators {
            detector: &detector,
            sources: &sources,
            packages: &packages,
            probe: &probe,
            confirmer,
            state: &state,
        },
    );

    match mode {
        UpgradeMode::Status => {
            print_status(&sequencer.status(), json_mode);
            Ok(())
        }
        UpgradeMode::Check => {
            let report = sequencer.check()?;
            print_check(&report, json_mode);
            check_result(report)
        }
        UpgradeMode::Reset => {
            let previous = sequencer.reset()?;
            if json_mode {
                print_json(&serde_json::json!({
                    "reset": true,
                    "previous": previous,
                }));
            } else {
                match previous {
                    Some(v) => println!("Upgrade state cleared (was: phase to {} complete).", v),
                    None => println!("No upgrade state recorded; nothing to reset."),
                }
            }
            Ok(())
        }
        UpgradeMode::Run | UpgradeMode::Continue => {
            let run_mode = if mode == UpgradeMode::Continue {
                RunMode::Continue
            } else {
                RunMode::Start
            };
            let outcome = sequencer.run(run_mode)?;
            print_outcome(&outcome, json_mode);
            Ok(())
        }
    }
}

/// `--check` fails when a run could not proceed: unsupported host or a failed gate.
fn check_result(report: CheckReport) -> Result<(), HostkitError> {
    if let NextStep::Unsupported(version) = report.next_step {
        return Err(HostkitError::UnsupportedVersion(version));
    }
    match report.preflight {
        Some(preflight) => preflight.into_result().map(|_| ()),
        None => Ok(()),
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

fn print_status(status: &StatusReport, json_mode: bool) {
    if json_mode {
        print_json(&serde_json::json!(status));
        return;
    }

    println!("Debian Upgrade Status");
    println!("=====================");
    match &status.host {
        Some(host) => {
            println!(
                "Host:          {}",
                host.pretty_name.as_deref().unwrap_or(host.version.as_str())
            );
            println!("Version:       {}", host.version);
        }
        None => println!("Host:          unknown"),
    }
    match &status.persisted {
        Some(v) => println!("Recorded:      phase to {} complete", v),
        None => println!("Recorded:      nothing"),
    }
    match &status.state {
        Some(state) => println!("State:         {}", state),
        None => println!("State:         unknown"),
    }
    if let Some(next) = &status.next_step {
        println!("Next:          {}", next);
    }
    println!("Final release: {}", status.final_version);
    if !status.problems.is_empty() {
        println!();
        for problem in &status.problems {
            println!("Problem: {}", problem);
        }
    }
}

fn print_check(report: &CheckReport, json_mode: bool) {
    if json_mode {
        print_json(&serde_json::json!({
            "ready": report.ready(),
            "report": report,
        }));
        return;
    }

    println!("Debian Upgrade Check");
    println!("====================");
    println!("Version:   {}", report.host.version);
    println!("State:     {}", report.state);
    println!("Next:      {}", report.next_step);
    if let Some(preflight) = &report.preflight {
        println!();
        println!("Pre-flight:");
        for result in &preflight.results {
            let mark = if result.passed { "ok" } else { "FAIL" };
            println!("  [{:>4}] {:<12} {}", mark, result.gate.name(), result.message);
        }
    }
    println!();
    println!("Ready: {}", if report.ready() { "yes" } else { "no" });
}

fn print_outcome(outcome: &RunOutcome, json_mode: bool) {
    if json_mode {
        let value = match outcome {
            RunOutcome::PhaseCompleted { phase, is_final } => serde_json::json!({
                "outcome": "phase_completed",
                "phase": phase,
                "final": is_final,
            }),
            RunOutcome::RebootRequired(phase) => serde_json::json!({
                "outcome": "reboot_required",
                "phase": phase,
            }),
            RunOutcome::Done { cleared } => serde_json::json!({
                "outcome": "done",
                "state_cleared": cleared,
            }),
            RunOutcome::Declined(phase) => serde_json::json!({
                "outcome": "declined",
                "phase": phase,
            }),
        };
        print_json(&value);
        return;
    }

    match outcome {
        RunOutcome::PhaseCompleted { phase, is_final } => {
            println!("Phase {} complete.", phase);
            if *is_final {
                println!("Reboot to finish. The next `hostkit upgrade` clears the recorded state.");
            } else {
                println!("Reboot, then run `hostkit upgrade --continue` for the next phase.");
            }
        }
        RunOutcome::RebootRequired(phase) => {
            println!(
                "Phase {} already completed but the host still runs Debian {}.",
                phase, phase.source
            );
            println!("Reboot into the new release, then run `hostkit upgrade --continue`.");
        }
        RunOutcome::Done { cleared } => {
            println!("Host is on the final release; nothing to do.");
            if *cleared {
                println!("Recorded upgrade state cleared.");
            }
        }
        RunOutcome::Declined(phase) => {
            println!("Upgrade {} declined; nothing was changed.", phase);
        }
    }
}
