//! # Configuration
//!
//! Optional TOML file overriding the built-in paths and thresholds.
//!
//! ```toml
//! [upgrade]
//! state_file = "/var/lib/hostkit/debian-upgrade.state"
//! mirror = "http://ftp.de.debian.org/debian"
//! min_free_space_mb = 4096
//!
//! [proxy]
//! install_dir = "/usr/local/bin"
//! service_user = "nobody"
//! ```
//!
//! Lookup order: `--config <path>` (must exist), then
//! `/etc/hostkit/hostkit.toml` if present, then defaults.

use hostkit_core::primitives;
use hostkit_core::{HostkitError, InstallPaths, PreflightPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// System-wide config file consulted when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostkit/hostkit.toml";

/// Maximum accepted config file size (1 MiB).
const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

// =============================================================================
// SECTIONS
// =============================================================================

/// `[upgrade]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpgradeConfig {
    pub state_file: PathBuf,
    pub os_release_path: PathBuf,
    pub debian_version_path: PathBuf,
    pub sources_list: PathBuf,
    pub sources_dir: PathBuf,
    pub mirror: String,
    pub security_mirror: String,
    /// Defaults to `mirror`.
    pub network_probe_url: Option<String>,
    pub min_free_space_mb: u64,
    /// Skip the confirmation prompt, as if `--yes` were always given.
    pub assume_yes: bool,
}

impl Default for UpgradeConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(primitives::DEFAULT_STATE_FILE),
            os_release_path: PathBuf::from(primitives::OS_RELEASE_PATH),
            debian_version_path: PathBuf::from(primitives::DEBIAN_VERSION_PATH),
            sources_list: PathBuf::from(primitives::SOURCES_LIST_PATH),
            sources_dir: PathBuf::from(primitives::SOURCES_DIR_PATH),
            mirror: primitives::DEFAULT_MIRROR.to_string(),
            security_mirror: primitives::DEFAULT_SECURITY_MIRROR.to_string(),
            network_probe_url: None,
            min_free_space_mb: primitives::MIN_FREE_SPACE_MB,
            assume_yes: false,
        }
    }
}

impl UpgradeConfig {
    /// URL probed by the network pre-flight gate.
    #[must_use]
    pub fn probe_url(&self) -> &str {
        self.network_probe_url.as_deref().unwrap_or(&self.mirror)
    }

    #[must_use]
    pub fn policy(&self) -> PreflightPolicy {
        PreflightPolicy {
            min_free_space_mb: self.min_free_space_mb,
        }
    }
}

// =============================================================================
// ROOT
// =============================================================================

/// The whole config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostkitConfig {
    pub upgrade: UpgradeConfig,
    pub proxy: InstallPaths,
}

impl HostkitConfig {
    /// Resolve and load the configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self, HostkitError> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_PATH);
                if default.is_file() {
                    Self::from_file(default)
                } else {
                    tracing::debug!("no config file, using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load a specific file. Missing or invalid files are errors.
    pub fn from_file(path: &Path) -> Result<Self, HostkitError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            HostkitError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(HostkitError::Config(format!(
                "{} is {} bytes, larger than the {} byte limit",
                path.display(),
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            HostkitError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| HostkitError::Config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse TOML text.
    pub fn parse(text: &str) -> Result<Self, HostkitError> {
        toml::from_str(text).map_err(|e| HostkitError::Config(e.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
