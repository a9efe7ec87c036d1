//! # Core Type Definitions
//!
//! This module contains the shared vocabulary of hostkit:
//! - Release identifiers (`VersionId`, `Codename`)
//! - Captured external command results (`CommandOutput`)
//! - Error types (`HostkitError`)
//!
//! ## Error Taxonomy
//!
//! Every failure the tool can report maps to exactly one variant. The
//! propagation policy is fixed:
//! - `Detection` and `Preflight` abort before anything on the host is mutated
//! - `PhaseExecution` aborts the current phase only; completed phases stay recorded
//! - `UnsupportedVersion` is terminal

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// RELEASE IDENTIFIERS
// =============================================================================

/// Identifier of an OS release as reported by the host (e.g. `"12"`).
///
/// Compared as an opaque string: `"12"` and `"12.0"` are different ids.
/// Normalization happens once, when the host version is detected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(pub String);

impl VersionId {
    /// Create a new version id from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the version id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Human-readable release name (e.g. `"bookworm"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Codename(pub String);

impl Codename {
    /// Create a new codename from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the codename as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Codename {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// COMMAND OUTPUT
// =============================================================================

/// Result of one external command, as reported by an adapter.
///
/// Adapters never interpret the exit status; the caller decides whether a
/// non-zero status is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit status. `None` if the process was killed by a signal.
    pub status: Option<i32>,
    /// Captured standard output.
    pub stdout: String,
    /// Captured standard error.
    pub stderr: String,
}

impl CommandOutput {
    /// A successful, silent command.
    #[must_use]
    pub fn ok() -> Self {
        Self {
            status: Some(0),
            ..Self::default()
        }
    }

    /// A failed command with the given status and stderr.
    #[must_use]
    pub fn failed(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// True if the command exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    /// Short description of a failure: exit status plus the last stderr line.
    #[must_use]
    pub fn failure_summary(&self) -> String {
        let status = match self.status {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        };
        match self.stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(line) => format!("{}: {}", status, line.trim()),
            None => status,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in hostkit.
///
/// - No silent failures
/// - Use `Result<T, HostkitError>` for fallible operations
/// - Every variant carries enough context to print an actionable message
#[derive(Debug, Error)]
pub enum HostkitError {
    /// The host OS version could not be read.
    #[error("Cannot determine host OS version: {0}")]
    Detection(String),

    /// A pre-flight gate failed; nothing was changed.
    #[error("Pre-flight check failed: {0}")]
    Preflight(String),

    /// A release asset or version page could not be fetched.
    #[error("Download failed: {0}")]
    Download(String),

    /// The host is not on a recognized starting version.
    #[error("Unsupported OS version: {0}")]
    UnsupportedVersion(VersionId),

    /// An external command failed during an upgrade phase.
    #[error("Phase {phase} failed during {step}: {reason}")]
    PhaseExecution {
        /// The phase being executed, e.g. `11 -> 12`.
        phase: String,
        /// The step that failed.
        step: String,
        /// What went wrong.
        reason: String,
    },

    /// The persisted upgrade state is unreadable or inconsistent.
    #[error("Upgrade state error: {0}")]
    State(String),

    /// The configuration file is unreadable or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A proxy install precondition was not met.
    #[error("Install error: {0}")]
    Install(String),

    /// A template could not be rendered from the given input.
    #[error("Template error: {0}")]
    Template(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(String),
}

impl HostkitError {
    /// Suggested operator action for this error.
    #[must_use]
    pub fn remedy(&self) -> &'static str {
        match self {
            Self::Detection(_) => "Check that /etc/os-release is present and readable.",
            Self::Preflight(_) => {
                "Resolve the failed checks above and run the command again; nothing was changed."
            }
            Self::Download(_) => "Check network connectivity and the release URL, then retry.",
            Self::UnsupportedVersion(_) => {
                "Only the releases listed in the upgrade plan can be upgraded by this tool."
            }
            Self::PhaseExecution { .. } => {
                "Fix the reported problem and run `hostkit upgrade` again; the same phase will be retried."
            }
            Self::State(_) => {
                "Inspect the state file, or run `hostkit upgrade --reset` to start over."
            }
            Self::Config(_) => "Fix the configuration file or remove it to use defaults.",
            Self::Install(_) => "Run `hostkit status <service>` to inspect the current install.",
            Self::Template(_) => "Check the values passed on the command line.",
            Self::Io(_) => "Check permissions; most operations must run as root.",
        }
    }
}

impl From<std::io::Error> for HostkitError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

// =============================================================================
// TESTS
// =============================================================================
