//! # Primitives
//!
//! Fixed paths, limits and defaults shared by the core and the app layer.
//! The app's configuration file may override the paths; the constants here
//! are the values used when it does not.

// =============================================================================
// UPGRADE STATE
// =============================================================================

/// Default location of the persisted upgrade state marker.
pub const DEFAULT_STATE_FILE: &str = "/var/lib/hostkit/debian-upgrade.state";

/// Maximum accepted size of the state file in bytes.
///
/// The marker is a single version id; anything larger is treated as corrupt.
pub const MAX_STATE_FILE_SIZE: u64 = 256;

// =============================================================================
// OS IDENTIFICATION
// =============================================================================

/// Primary OS identification file.
pub const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Debian-specific fallback version file.
pub const DEBIAN_VERSION_PATH: &str = "/etc/debian_version";

// =============================================================================
// APT
// =============================================================================

/// Main apt sources file rewritten on each phase.
pub const SOURCES_LIST_PATH: &str = "/etc/apt/sources.list";

/// Directory of third-party apt source fragments.
pub const SOURCES_DIR_PATH: &str = "/etc/apt/sources.list.d";

/// Default Debian mirror.
pub const DEFAULT_MIRROR: &str = "http://deb.debian.org/debian";

/// Default Debian security mirror.
pub const DEFAULT_SECURITY_MIRROR: &str = "http://security.debian.org/debian-security";

/// Lock files held by dpkg/apt while they run.
pub const PACKAGE_LOCK_FILES: &[&str] = &[
    "/var/lib/dpkg/lock-frontend",
    "/var/lib/dpkg/lock",
    "/var/lib/apt/lists/lock",
];

// =============================================================================
// PREFLIGHT
// =============================================================================

/// Minimum free space on `/` before an upgrade phase, in MiB.
pub const MIN_FREE_SPACE_MB: u64 = 2048;

/// Timeout for the network reachability probe, in seconds.
pub const NETWORK_PROBE_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// PROXY INSTALLS
// =============================================================================

/// Where proxy binaries are installed.
pub const INSTALL_DIR: &str = "/usr/local/bin";

/// Where systemd unit files are written.
pub const UNIT_DIR: &str = "/etc/systemd/system";

/// Root of per-service configuration directories.
pub const CONFIG_ROOT: &str = "/etc";

/// Where install manifests are kept.
pub const MANIFEST_DIR: &str = "/etc/hostkit";

/// Length of generated PSKs / passwords.
pub const SECRET_LENGTH: usize = 32;
