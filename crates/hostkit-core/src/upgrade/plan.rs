//! # Upgrade Plan
//!
//! The ordered chain of release phases and the pure decision of which phase
//! runs next.
//!
//! ## Decision Table
//!
//! | Host version          | Persisted state            | Result              |
//! |-----------------------|----------------------------|---------------------|
//! | final target          | any                        | `Done`              |
//! | not a phase source    | any                        | `Unsupported`       |
//! | source of phase n     | none / target of phase < n | `Run(n)`            |
//! | source of phase n     | target of phase n          | `RebootRequired(n)` |
//! | source of phase n     | target of phase > n        | `State` error       |
//! | source of phase n     | not a target in the plan   | `State` error       |

use crate::{Codename, HostkitError, VersionId};
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// PHASE
// =============================================================================

/// One release-to-release upgrade step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Phase {
    /// Version the host must be on for this phase to run.
    pub source: VersionId,
    /// Codename of the source release; used to retarget third-party sources.
    pub source_codename: Codename,
    /// Version the host is on once the phase completes.
    pub target: VersionId,
    /// Codename written into the apt sources.
    pub target_codename: Codename,
}

impl Phase {
    /// Create a new phase.
    #[must_use]
    pub fn new(
        source: impl Into<String>,
        source_codename: impl Into<String>,
        target: impl Into<String>,
        target_codename: impl Into<String>,
    ) -> Self {
        Self {
            source: VersionId::new(source),
            source_codename: Codename::new(source_codename),
            target: VersionId::new(target),
            target_codename: Codename::new(target_codename),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}) -> {} ({})",
            self.source, self.source_codename, self.target, self.target_codename
        )
    }
}

// =============================================================================
// NEXT STEP
// =============================================================================

/// What the sequencer should do given the observed host and persisted state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", content = "detail", rename_all = "snake_case")]
pub enum NextStep {
    /// Execute this phase.
    Run(Phase),
    /// This phase already completed; the host must reboot into the new release.
    RebootRequired(Phase),
    /// The host is on the final release.
    Done,
    /// The host is not on any release this plan can start from.
    Unsupported(VersionId),
}

impl fmt::Display for NextStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run(phase) => write!(f, "run {}", phase),
            Self::RebootRequired(phase) => write!(f, "reboot into {}", phase.target),
            Self::Done => write!(f, "nothing, host is on the final release"),
            Self::Unsupported(v) => write!(f, "none, version {} is not supported", v),
        }
    }
}

// =============================================================================
// UPGRADE PLAN
// =============================================================================

/// An immutable, contiguous chain of phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpgradePlan {
    phases: Vec<Phase>,
    final_version: VersionId,
}

impl UpgradePlan {
    /// Build a plan, checking that the phases form one unbroken chain.
    pub fn new(phases: Vec<Phase>) -> Result<Self, HostkitError> {
        let final_version = phases
            .last()
            .map(|p| p.target.clone())
            .ok_or_else(|| {
                HostkitError::Config("upgrade plan must contain at least one phase".to_string())
            })?;
        for pair in phases.windows(2) {
            if pair[0].target != pair[1].source {
                return Err(HostkitError::Config(format!(
                    "upgrade plan is not contiguous: phase {} is followed by {}",
                    pair[0], pair[1]
                )));
            }
            if pair[0].target_codename != pair[1].source_codename {
                return Err(HostkitError::Config(format!(
                    "upgrade plan codenames disagree: {} vs {}",
                    pair[0].target_codename, pair[1].source_codename
                )));
            }
        }
        Ok(Self {
            phases,
            final_version,
        })
    }

    /// The Debian plan shipped with hostkit: bullseye -> bookworm -> trixie.
    #[must_use]
    pub fn debian() -> Self {
        Self {
            phases: vec![
                Phase::new("11", "bullseye", "12", "bookworm"),
                Phase::new("12", "bookworm", "13", "trixie"),
            ],
            final_version: VersionId::new("13"),
        }
    }

    /// All phases in order.
    #[must_use]
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// The version the plan ends on.
    #[must_use]
    pub fn final_version(&self) -> &VersionId {
        &self.final_version
    }

    /// Versions the plan can start from.
    #[must_use]
    pub fn supported_sources(&self) -> Vec<&VersionId> {
        self.phases.iter().map(|p| &p.source).collect()
    }

    /// Index of the phase starting at `source`.
    #[must_use]
    pub fn index_of_source(&self, source: &VersionId) -> Option<usize> {
        self.phases.iter().position(|p| &p.source == source)
    }

    /// Index of the phase ending at `target`.
    #[must_use]
    pub fn index_of_target(&self, target: &VersionId) -> Option<usize> {
        self.phases.iter().position(|p| &p.target == target)
    }

    /// Check that a persisted marker names a phase in this plan.
    pub fn validate_marker(&self, marker: &VersionId) -> Result<usize, HostkitError> {
        self.index_of_target(marker).ok_or_else(|| {
            HostkitError::State(format!(
                "state file names '{}', which is not a phase target in the upgrade plan",
                marker
            ))
        })
    }

    /// Decide the next step from the observed host version and persisted marker.
    pub fn next_phase(
        &self,
        current: &VersionId,
        persisted: Option<&VersionId>,
    ) -> Result<NextStep, HostkitError> {
        if current == self.final_version() {
            return Ok(NextStep::Done);
        }

        let Some(index) = self.index_of_source(current) else {
            return Ok(NextStep::Unsupported(current.clone()));
        };
        let completed = persisted.map(|m| self.validate_marker(m)).transpose()?;
        let phase = self.phases[index].clone();

        match completed {
            Some(done) if done == index => Ok(NextStep::RebootRequired(phase)),
            Some(done) if done > index => Err(HostkitError::State(format!(
                "state file records {} as complete but the host reports {}",
                self.phases[done].target, current
            ))),
            _ => Ok(NextStep::Run(phase)),
        }
    }
}

impl Default for UpgradePlan {
    fn default() -> Self {
        Self::debian()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> VersionId {
        VersionId::new(s)
    }

    #[test]
    fn debian_plan_is_contiguous() {
        let plan = UpgradePlan::debian();
        assert!(UpgradePlan::new(plan.phases().to_vec()).is_ok());
        assert_eq!(plan.final_version(), &v("13"));
    }

    #[test]
    fn empty_plan_rejected() {
        assert!(matches!(
            UpgradePlan::new(Vec::new()),
            Err(HostkitError::Config(_))
        ));
    }

    #[test]
    fn gap_in_plan_rejected() {
        let result = UpgradePlan::new(vec![
            Phase::new("10", "buster", "11", "bullseye"),
            Phase::new("12", "bookworm", "13", "trixie"),
        ]);
        assert!(matches!(result, Err(HostkitError::Config(_))));
    }

    #[test]
    fn selects_phase_by_source() {
        let plan = UpgradePlan::debian();
        let step = plan.next_phase(&v("12"), None).expect("next");
        assert_eq!(step, NextStep::Run(plan.phases()[1].clone()));
    }

    #[test]
    fn final_version_is_done_regardless_of_marker() {
        let plan = UpgradePlan::debian();
        assert_eq!(plan.next_phase(&v("13"), None).expect("next"), NextStep::Done);
        assert_eq!(
            plan.next_phase(&v("13"), Some(&v("13"))).expect("next"),
            NextStep::Done
        );
    }

    #[test]
    fn unknown_version_is_unsupported() {
        let plan = UpgradePlan::debian();
        assert_eq!(
            plan.next_phase(&v("10"), None).expect("next"),
            NextStep::Unsupported(v("10"))
        );
    }

    #[test]
    fn completed_phase_waits_for_reboot() {
        let plan = UpgradePlan::debian();
        let step = plan.next_phase(&v("11"), Some(&v("12"))).expect("next");
        assert_eq!(step, NextStep::RebootRequired(plan.phases()[0].clone()));
    }

    #[test]
    fn marker_ahead_of_host_is_state_error() {
        let plan = UpgradePlan::debian();
        let result = plan.next_phase(&v("11"), Some(&v("13")));
        assert!(matches!(result, Err(HostkitError::State(_))));
    }

    #[test]
    fn marker_outside_plan_is_state_error() {
        let plan = UpgradePlan::debian();
        let result = plan.next_phase(&v("12"), Some(&v("42")));
        assert!(matches!(result, Err(HostkitError::State(_))));
    }
}
