//! # hostkit-core
//!
//! The host-agnostic engine for hostkit - THE LOGIC.
//!
//! This crate decides *what* to do; the application crate decides *how* to
//! touch the host. Every external effect (apt, systemctl, os-release, HTTP,
//! file writes) is a trait defined here and implemented by the binary.
//!
//! ## Modules
//!
//! - `upgrade`: resumable multi-phase Debian release upgrade
//! - `proxy`: install / update / uninstall of anytls and snell
//! - `templates`: pure renderers for unit files, configs and apt sources
//! - `release`: latest-version resolution and asset naming
//! - `os_release`: host version detection from os-release contents
//!
//! ## Architectural Constraints
//!
//! - Synchronous and single-threaded
//! - No network or process access
//! - Upgrade position is always re-derived from persisted state plus the
//!   freshly observed host version, never from memory

// =============================================================================
// MODULES
// =============================================================================

pub mod os_release;
pub mod primitives;
pub mod proxy;
pub mod release;
pub mod templates;
pub mod types;
pub mod upgrade;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use types::{Codename, CommandOutput, HostkitError, VersionId};

// =============================================================================
// RE-EXPORTS: Upgrade
// =============================================================================

pub use os_release::{HostVersion, OsRelease, detect_host_version};
pub use upgrade::{
    AutoConfirm, CheckReport, Collaborators, Confirmer, FileStateStore, HostProbe,
    MemoryStateStore, NextStep, PackageManager, PackageOp, Phase, PreflightPolicy,
    PreflightReport, RunMode, RunOutcome, Sequencer, SourcesWriter, StateStore, StatusReport,
    UpgradePlan, UpgradeState, VersionDetector,
};

// =============================================================================
// RE-EXPORTS: Proxy Installs
// =============================================================================

pub use proxy::{
    ArchiveExtractor, Filesystem, InstallManifest, InstallOptions, InstallPaths, Installer,
    ProxyKind, ReleaseSource, ServiceAction, ServiceManager, ServiceStatus, UpdateOutcome,
};
pub use release::{
    Arch, Fetcher, GithubLatestResolver, PageScrapeResolver, PinnedResolver, ReleaseResolver,
};
