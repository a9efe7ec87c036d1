//! # Phase Sequencer
//!
//! Drives the host through the upgrade plan, one phase per invocation.
//!
//! The sequencer holds no position of its own. Every entry point re-derives
//! where the host is from two sources only:
//! - the freshly detected host version
//! - the persisted marker of the last completed phase
//!
//! A reboot between phases is therefore just another process restart.
//!
//! ## Phase Steps
//!
//! ```text
//! rewrite sources -> refresh index -> upgrade -> full-upgrade
//!                 -> autoremove -> clean -> update bootloader -> persist marker
//! ```
//!
//! Any step reporting failure abandons the phase before the marker is written.

use super::plan::{NextStep, Phase, UpgradePlan};
use super::preflight::{HostProbe, PreflightPolicy, PreflightReport, run_preflight};
use super::state::StateStore;
use crate::os_release::HostVersion;
use crate::{CommandOutput, HostkitError, VersionId};
use serde::Serialize;
use std::fmt;

// =============================================================================
// COLLABORATORS
// =============================================================================

/// OS identification facility.
pub trait VersionDetector {
    fn detect(&self) -> Result<HostVersion, HostkitError>;
}

/// Writes the package source definitions for a phase's target release.
pub trait SourcesWriter {
    fn write_sources(&self, phase: &Phase) -> Result<(), HostkitError>;
}

/// Package manager operations run during a phase, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageOp {
    RefreshIndex,
    Upgrade,
    FullUpgrade,
    Autoremove,
    Clean,
    UpdateBootloader,
}

impl PackageOp {
    /// Execution order within a phase.
    pub const SEQUENCE: [PackageOp; 6] = [
        Self::RefreshIndex,
        Self::Upgrade,
        Self::FullUpgrade,
        Self::Autoremove,
        Self::Clean,
        Self::UpdateBootloader,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::RefreshIndex => "package index refresh",
            Self::Upgrade => "upgrade",
            Self::FullUpgrade => "full-upgrade",
            Self::Autoremove => "autoremove",
            Self::Clean => "clean",
            Self::UpdateBootloader => "bootloader update",
        }
    }
}

impl fmt::Display for PackageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Package Manager Adapter.
///
/// Returns the raw command result; the sequencer decides what is fatal.
/// `Err` is reserved for failing to run the command at all.
pub trait PackageManager {
    fn execute(&self, op: PackageOp) -> Result<CommandOutput, HostkitError>;
}

/// Human-in-the-loop gate before destructive work.
pub trait Confirmer {
    fn confirm(&self, prompt: &str) -> bool;
}

/// Non-interactive policy: every prompt is accepted.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoConfirm;

impl Confirmer for AutoConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        tracing::info!(%prompt, "auto-confirmed");
        true
    }
}

/// Everything the sequencer talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub detector: &'a dyn VersionDetector,
    pub sources: &'a dyn SourcesWriter,
    pub packages: &'a dyn PackageManager,
    pub probe: &'a dyn HostProbe,
    pub confirmer: &'a dyn Confirmer,
    pub state: &'a dyn StateStore,
}

// =============================================================================
// STATE MACHINE
// =============================================================================

/// Where the upgrade stands.
///
/// Derived from the persisted marker. Without a marker the upgrade is
/// `NotStarted` whatever the host runs; the host-derived next step is
/// reported separately as a [`NextStep`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "version", rename_all = "snake_case")]
pub enum UpgradeState {
    NotStarted,
    PhaseInProgress(VersionId),
    PhaseComplete(VersionId),
    Done,
    Unsupported(VersionId),
}

impl fmt::Display for UpgradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => write!(f, "not started"),
            Self::PhaseInProgress(v) => write!(f, "upgrading to {}", v),
            Self::PhaseComplete(v) => write!(f, "phase to {} complete", v),
            Self::Done => write!(f, "done"),
            Self::Unsupported(v) => write!(f, "unsupported version {}", v),
        }
    }
}

/// Which entry point started the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// Start or resume the sequence.
    Start,
    /// Resume after a reboot; refuses to run when no phase has completed yet.
    Continue,
}

/// Result of a successful `run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// A phase completed and was recorded. The host should now reboot.
    PhaseCompleted { phase: Phase, is_final: bool },
    /// The recorded phase completed but the host still reports its source release.
    RebootRequired(Phase),
    /// The host is on the final release. `cleared` is true if a marker was removed.
    Done { cleared: bool },
    /// The operator declined the confirmation prompt.
    Declined(Phase),
}

/// Output of the check-only mode.
#[derive(Debug, Clone, Serialize)]
pub struct CheckReport {
    pub host: HostVersion,
    pub persisted: Option<VersionId>,
    pub state: UpgradeState,
    pub next_step: NextStep,
    /// The phase a run would execute, when `next_step` is `Run`.
    pub next_phase: Option<Phase>,
    pub preflight: Option<PreflightReport>,
}

impl CheckReport {
    /// True if a run would proceed past every gate.
    #[must_use]
    pub fn ready(&self) -> bool {
        self.next_phase.is_some() && self.preflight.as_ref().is_some_and(|p| p.passed())
    }
}

/// Output of the status mode. Never fails on host problems; it reports them.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub host: Option<HostVersion>,
    pub persisted: Option<VersionId>,
    pub state: Option<UpgradeState>,
    pub next_step: Option<NextStep>,
    pub final_version: VersionId,
    /// Every error met while gathering the report, in order.
    pub problems: Vec<String>,
}

// =============================================================================
// SEQUENCER
// =============================================================================

/// The resumable phase sequencer.
pub struct Sequencer<'a> {
    plan: UpgradePlan,
    policy: PreflightPolicy,
    io: Collaborators<'a>,
}

impl<'a> Sequencer<'a> {
    /// Create a sequencer over a plan and its collaborators.
    #[must_use]
    pub fn new(plan: UpgradePlan, policy: PreflightPolicy, io: Collaborators<'a>) -> Self {
        Self { plan, policy, io }
    }

    /// The plan being executed.
    #[must_use]
    pub fn plan(&self) -> &UpgradePlan {
        &self.plan
    }

    /// Inspect the host-reported OS version.
    pub fn determine_current_version(&self) -> Result<HostVersion, HostkitError> {
        let host = self.io.detector.detect()?;
        tracing::debug!(version = %host.version, "detected host version");
        Ok(host)
    }

    /// Decide the next step for the given host version and persisted marker.
    pub fn next_phase(
        &self,
        current: &VersionId,
        persisted: Option<&VersionId>,
    ) -> Result<NextStep, HostkitError> {
        self.plan.next_phase(current, persisted)
    }

    /// Ask the injected confirmation policy before mutating the host.
    pub fn require_confirmation(&self, phase: &Phase) -> bool {
        let prompt = format!(
            "Upgrade Debian {} ({}) to {} ({})? This rewrites apt sources and upgrades all packages.",
            phase.source, phase.source_codename, phase.target, phase.target_codename
        );
        self.io.confirmer.confirm(&prompt)
    }

    /// Execute one phase. Persists the phase target only if every step succeeds.
    pub fn run_phase(&self, phase: &Phase) -> Result<(), HostkitError> {
        let label = format!("{} -> {}", phase.source, phase.target);
        tracing::info!(
            state = %UpgradeState::PhaseInProgress(phase.target.clone()),
            phase = %label,
            "starting phase"
        );

        self.io
            .sources
            .write_sources(phase)
            .map_err(|e| HostkitError::PhaseExecution {
                phase: label.clone(),
                step: "sources rewrite".to_string(),
                reason: e.to_string(),
            })?;

        for op in PackageOp::SEQUENCE {
            tracing::info!(phase = %label, step = %op, "running");
            let output =
                self.io
                    .packages
                    .execute(op)
                    .map_err(|e| HostkitError::PhaseExecution {
                        phase: label.clone(),
                        step: op.to_string(),
                        reason: e.to_string(),
                    })?;
            if !output.success() {
                tracing::error!(phase = %label, step = %op, stderr = %output.stderr, "step failed");
                return Err(HostkitError::PhaseExecution {
                    phase: label,
                    step: op.to_string(),
                    reason: output.failure_summary(),
                });
            }
        }

        self.io.state.save(&phase.target)?;
        tracing::info!(
            state = %UpgradeState::PhaseComplete(phase.target.clone()),
            phase = %label,
            "phase complete"
        );
        Ok(())
    }

    fn state_for(&self, next: &NextStep, persisted: Option<&VersionId>) -> UpgradeState {
        match (persisted, next) {
            (None, _) => UpgradeState::NotStarted,
            (Some(_), NextStep::Done) => UpgradeState::Done,
            (Some(_), NextStep::Unsupported(v)) => UpgradeState::Unsupported(v.clone()),
            (Some(marker), _) => UpgradeState::PhaseComplete(marker.clone()),
        }
    }

    /// Check-only mode: detection, next step and pre-flight gates. Never mutates.
    pub fn check(&self) -> Result<CheckReport, HostkitError> {
        let host = self.determine_current_version()?;
        let persisted = self.io.state.load()?;
        let next = self.next_phase(&host.version, persisted.as_ref())?;
        let state = self.state_for(&next, persisted.as_ref());

        let (next_phase, preflight) = match &next {
            NextStep::Run(phase) => {
                let report = run_preflight(self.io.probe, &self.policy);
                (Some(phase.clone()), Some(report))
            }
            _ => (None, None),
        };

        Ok(CheckReport {
            host,
            persisted,
            state,
            next_step: next,
            next_phase,
            preflight,
        })
    }

    /// Status mode: informational, collects problems instead of failing.
    pub fn status(&self) -> StatusReport {
        let mut problems = Vec::new();

        let persisted = self.io.state.load().unwrap_or_else(|e| {
            problems.push(e.to_string());
            None
        });

        let host = match self.determine_current_version() {
            Ok(h) => Some(h),
            Err(e) => {
                problems.push(e.to_string());
                None
            }
        };

        let next_step = host.as_ref().and_then(|h| {
            match self.next_phase(&h.version, persisted.as_ref()) {
                Ok(next) => Some(next),
                Err(e) => {
                    problems.push(e.to_string());
                    None
                }
            }
        });
        let state = next_step
            .as_ref()
            .map(|next| self.state_for(next, persisted.as_ref()));

        StatusReport {
            host,
            persisted,
            state,
            next_step,
            final_version: self.plan.final_version().clone(),
            problems,
        }
    }

    /// Reset mode: forget all recorded progress. Returns the removed marker.
    pub fn reset(&self) -> Result<Option<VersionId>, HostkitError> {
        // A corrupt marker must still be removable.
        let previous = self.io.state.load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "discarding unreadable upgrade state");
            None
        });
        self.io.state.clear()?;
        tracing::info!(previous = ?previous, "upgrade state reset");
        Ok(previous)
    }

    /// Run or resume the sequence. Executes at most one phase.
    pub fn run(&self, mode: RunMode) -> Result<RunOutcome, HostkitError> {
        let host = self.determine_current_version()?;
        let persisted = self.io.state.load()?;

        if mode == RunMode::Continue
            && persisted.is_none()
            && host.version != *self.plan.final_version()
        {
            return Err(HostkitError::State(
                "no completed phase is recorded, so there is nothing to continue; \
                 run `hostkit upgrade` to start"
                    .to_string(),
            ));
        }

        match self.next_phase(&host.version, persisted.as_ref())? {
            NextStep::Done => {
                let cleared = persisted.is_some();
                if cleared {
                    self.io.state.clear()?;
                }
                tracing::info!(version = %host.version, "host is on the final release");
                Ok(RunOutcome::Done { cleared })
            }
            NextStep::Unsupported(version) => Err(HostkitError::UnsupportedVersion(version)),
            NextStep::RebootRequired(phase) => {
                tracing::warn!(phase = %phase, "phase already complete; reboot required");
                Ok(RunOutcome::RebootRequired(phase))
            }
            NextStep::Run(phase) => {
                run_preflight(self.io.probe, &self.policy).into_result()?;

                if !self.require_confirmation(&phase) {
                    tracing::info!(phase = %phase, "declined by operator");
                    return Ok(RunOutcome::Declined(phase));
                }

                self.run_phase(&phase)?;
                let is_final = phase.target == *self.plan.final_version();
                Ok(RunOutcome::PhaseCompleted { phase, is_final })
            }
        }
    }
}
