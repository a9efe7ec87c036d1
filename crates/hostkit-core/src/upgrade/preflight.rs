//! # Pre-flight Gates
//!
//! Independent pass/fail checks run before any upgrade mutation:
//! - free disk space on `/`
//! - no process holding an apt/dpkg lock
//! - the Debian mirror is reachable
//!
//! Every gate is evaluated even when an earlier one fails, so the operator
//! sees all problems at once.

use crate::HostkitError;
use serde::Serialize;
use std::fmt;

// =============================================================================
// HOST PROBE
// =============================================================================

/// Read-only observations of the host used by the gates.
pub trait HostProbe {
    /// Free space available to root on `/`, in MiB.
    fn free_space_mb(&self) -> Result<u64, HostkitError>;

    /// Description of the first held package-manager lock, if any.
    fn package_lock_holder(&self) -> Result<Option<String>, HostkitError>;

    /// Whether the package mirror answers.
    fn network_reachable(&self) -> Result<bool, HostkitError>;
}

// =============================================================================
// GATES
// =============================================================================

/// The individual pre-flight checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PreflightGate {
    DiskSpace,
    PackageLock,
    Network,
}

impl PreflightGate {
    /// All gates in evaluation order.
    pub const ALL: [PreflightGate; 3] = [Self::DiskSpace, Self::PackageLock, Self::Network];

    /// Short display name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::DiskSpace => "disk space",
            Self::PackageLock => "package lock",
            Self::Network => "network",
        }
    }
}

impl fmt::Display for PreflightGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Outcome of one gate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateResult {
    pub gate: PreflightGate,
    pub passed: bool,
    pub message: String,
}

/// Outcome of all gates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightReport {
    pub results: Vec<GateResult>,
}

impl PreflightReport {
    /// True if every gate passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.results.iter().all(|r| r.passed)
    }

    /// Gates that failed.
    pub fn failures(&self) -> impl Iterator<Item = &GateResult> {
        self.results.iter().filter(|r| !r.passed)
    }

    /// Convert a failing report into a single `Preflight` error.
    pub fn into_result(self) -> Result<Self, HostkitError> {
        if self.passed() {
            return Ok(self);
        }
        let summary = self
            .failures()
            .map(|r| format!("{}: {}", r.gate, r.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(HostkitError::Preflight(summary))
    }
}

/// Thresholds for the gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreflightPolicy {
    pub min_free_space_mb: u64,
}

impl Default for PreflightPolicy {
    fn default() -> Self {
        Self {
            min_free_space_mb: crate::primitives::MIN_FREE_SPACE_MB,
        }
    }
}

fn evaluate(gate: PreflightGate, probe: &dyn HostProbe, policy: &PreflightPolicy) -> GateResult {
    let outcome: Result<(bool, String), HostkitError> = match gate {
        PreflightGate::DiskSpace => probe.free_space_mb().map(|free| {
            if free >= policy.min_free_space_mb {
                (true, format!("{} MiB free", free))
            } else {
                (
                    false,
                    format!(
                        "only {} MiB free on /, at least {} MiB required",
                        free, policy.min_free_space_mb
                    ),
                )
            }
        }),
        PreflightGate::PackageLock => probe.package_lock_holder().map(|holder| match holder {
            None => (true, "no package manager running".to_string()),
            Some(h) => (
                false,
                format!("package manager lock is held ({}); wait for it to finish", h),
            ),
        }),
        PreflightGate::Network => probe.network_reachable().map(|ok| {
            if ok {
                (true, "mirror reachable".to_string())
            } else {
                (false, "package mirror is unreachable".to_string())
            }
        }),
    };

    let (passed, message) = outcome.unwrap_or_else(|e| (false, e.to_string()));
    if passed {
        tracing::debug!(%gate, %message, "pre-flight gate passed");
    } else {
        tracing::warn!(%gate, %message, "pre-flight gate failed");
    }
    GateResult {
        gate,
        passed,
        message,
    }
}

/// Run every gate against the probe.
#[must_use]
pub fn run_preflight(probe: &dyn HostProbe, policy: &PreflightPolicy) -> PreflightReport {
    PreflightReport {
        results: PreflightGate::ALL
            .iter()
            .map(|gate| evaluate(*gate, probe, policy))
            .collect(),
    }
}

// =============================================================================
// PARSING HELPERS
// =============================================================================

/// Parse `df --output=avail -BM <path>` output into MiB.
///
/// Expected shape is a header line followed by a value such as `5120M`.
pub fn parse_df_avail_mb(output: &str) -> Result<u64, HostkitError> {
    let value = output
        .lines()
        .skip(1)
        .map(str::trim)
        .find(|l| !l.is_empty())
        .ok_or_else(|| HostkitError::Preflight("df printed no value".to_string()))?;

    value
        .trim_end_matches('M')
        .parse::<u64>()
        .map_err(|_| HostkitError::Preflight(format!("cannot parse df output {:?}", value)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe {
        free: u64,
        lock: Option<&'static str>,
        net: Result<bool, &'static str>,
    }

    impl HostProbe for Probe {
        fn free_space_mb(&self) -> Result<u64, HostkitError> {
            Ok(self.free)
        }
        fn package_lock_holder(&self) -> Result<Option<String>, HostkitError> {
            Ok(self.lock.map(str::to_string))
        }
        fn network_reachable(&self) -> Result<bool, HostkitError> {
            self.net.map_err(|e| HostkitError::Io(e.to_string()))
        }
    }

    #[test]
    fn all_gates_pass() {
        let probe = Probe {
            free: 10_000,
            lock: None,
            net: Ok(true),
        };
        let report = run_preflight(&probe, &PreflightPolicy::default());
        assert!(report.passed());
        assert_eq!(report.results.len(), 3);
        assert!(report.into_result().is_ok());
    }

    #[test]
    fn every_failing_gate_is_reported() {
        let probe = Probe {
            free: 100,
            lock: Some("/var/lib/dpkg/lock-frontend held by apt (pid 42)"),
            net: Err("dns failure"),
        };
        let report = run_preflight(&probe, &PreflightPolicy::default());
        assert_eq!(report.failures().count(), 3);

        let err = report.into_result().expect_err("must fail");
        let text = err.to_string();
        assert!(text.contains("disk space"));
        assert!(text.contains("pid 42"));
        assert!(text.contains("dns failure"));
    }

    #[test]
    fn threshold_is_inclusive() {
        let probe = Probe {
            free: 2048,
            lock: None,
            net: Ok(true),
        };
        let policy = PreflightPolicy {
            min_free_space_mb: 2048,
        };
        assert!(run_preflight(&probe, &policy).passed());
    }

    #[test]
    fn parses_df_output() {
        assert_eq!(parse_df_avail_mb(" Avail\n 5120M\n").expect("parse"), 5120);
        assert!(parse_df_avail_mb("Avail\n").is_err());
        assert!(parse_df_avail_mb("Avail\nlots\n").is_err());
    }
}
