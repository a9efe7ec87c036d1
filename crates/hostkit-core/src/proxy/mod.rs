//! # Proxy Services
//!
//! Static knowledge about the supported proxy servers and the pure
//! derivation of everything an install writes to disk.
//!
//! | Kind   | Binary          | Service | Config file                      | Version source        |
//! |--------|-----------------|---------|----------------------------------|-----------------------|
//! | anytls | `anytls-server` | anytls  | none (flags on `ExecStart`)      | GitHub latest release |
//! | snell  | `snell-server`  | snell   | `<config_root>/snell/snell-server.conf` | Surge release notes page |
//!
//! The [`InstallManifest`] is the single authoritative record of an install.
//! Updates read the manifest only and never parse the live config.

mod installer;

pub use installer::*;

use crate::release::Arch;
use crate::templates::{ServiceUnit, SnellConfig};
use crate::{HostkitError, primitives};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// PROXY KIND
// =============================================================================

/// Supported proxy servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Anytls,
    Snell,
}

/// Where the latest version of a proxy is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseSource {
    /// GitHub "latest release" API for `owner/repo`.
    Github {
        owner: &'static str,
        repo: &'static str,
    },
    /// A page whose links embed the version, scraped with `pattern`.
    Page {
        url: &'static str,
        pattern: &'static str,
    },
}

impl ProxyKind {
    pub const ALL: [ProxyKind; 2] = [Self::Anytls, Self::Snell];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anytls => "anytls",
            Self::Snell => "snell",
        }
    }

    /// Installed binary file name.
    #[must_use]
    pub fn binary_name(&self) -> &'static str {
        match self {
            Self::Anytls => "anytls-server",
            Self::Snell => "snell-server",
        }
    }

    /// systemd service name (without `.service`).
    #[must_use]
    pub fn service_name(&self) -> &'static str {
        self.name()
    }

    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Anytls => "AnyTLS Proxy Server",
            Self::Snell => "Snell Proxy Server",
        }
    }

    #[must_use]
    pub fn documentation(&self) -> &'static str {
        match self {
            Self::Anytls => "https://github.com/anytls/anytls-go",
            Self::Snell => "https://kb.nssurge.com/surge-knowledge-base/release-notes/snell",
        }
    }

    #[must_use]
    pub fn default_port(&self) -> u16 {
        match self {
            Self::Anytls => 8443,
            Self::Snell => 6160,
        }
    }

    #[must_use]
    pub fn release_source(&self) -> ReleaseSource {
        match self {
            Self::Anytls => ReleaseSource::Github {
                owner: "anytls",
                repo: "anytls-go",
            },
            Self::Snell => ReleaseSource::Page {
                url: "https://kb.nssurge.com/surge-knowledge-base/release-notes/snell",
                pattern: r"snell-server-v([0-9]+\.[0-9]+\.[0-9]+[a-z0-9]*)-linux",
            },
        }
    }

    /// Download URL of the release archive for `version` on `arch`.
    pub fn asset_url(&self, version: &str, arch: Arch) -> Result<String, HostkitError> {
        match self {
            Self::Anytls => {
                let arch = match arch {
                    Arch::Amd64 => "amd64",
                    Arch::Arm64 => "arm64",
                    other => {
                        return Err(HostkitError::Download(format!(
                            "anytls publishes no build for {}",
                            other
                        )));
                    }
                };
                Ok(format!(
                    "https://github.com/anytls/anytls-go/releases/download/v{v}/anytls_{v}_linux_{arch}.zip",
                    v = version
                ))
            }
            Self::Snell => {
                let arch = match arch {
                    Arch::Amd64 => "amd64",
                    Arch::Arm64 => "aarch64",
                    Arch::Armv7 => "armv7l",
                    Arch::I386 => "i386",
                };
                Ok(format!(
                    "https://dl.nssurge.com/snell/snell-server-v{}-linux-{}.zip",
                    version, arch
                ))
            }
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProxyKind {
    type Err = HostkitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anytls" => Ok(Self::Anytls),
            "snell" => Ok(Self::Snell),
            other => Err(HostkitError::Install(format!(
                "unknown service '{}' (expected anytls or snell)",
                other
            ))),
        }
    }
}

// =============================================================================
// INSTALL PATHS
// =============================================================================

/// Filesystem layout for proxy installs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstallPaths {
    pub install_dir: PathBuf,
    pub unit_dir: PathBuf,
    pub config_root: PathBuf,
    pub manifest_dir: PathBuf,
    pub service_user: String,
}

impl Default for InstallPaths {
    fn default() -> Self {
        Self {
            install_dir: PathBuf::from(primitives::INSTALL_DIR),
            unit_dir: PathBuf::from(primitives::UNIT_DIR),
            config_root: PathBuf::from(primitives::CONFIG_ROOT),
            manifest_dir: PathBuf::from(primitives::MANIFEST_DIR),
            service_user: "root".to_string(),
        }
    }
}

impl InstallPaths {
    #[must_use]
    pub fn binary_path(&self, kind: ProxyKind) -> PathBuf {
        self.install_dir.join(kind.binary_name())
    }

    #[must_use]
    pub fn unit_path(&self, kind: ProxyKind) -> PathBuf {
        self.unit_dir.join(format!("{}.service", kind.service_name()))
    }

    /// Per-service configuration directory, if the service has one.
    #[must_use]
    pub fn config_dir(&self, kind: ProxyKind) -> Option<PathBuf> {
        match kind {
            ProxyKind::Anytls => None,
            ProxyKind::Snell => Some(self.config_root.join("snell")),
        }
    }

    /// Config file path, if the service has one.
    #[must_use]
    pub fn config_path(&self, kind: ProxyKind) -> Option<PathBuf> {
        self.config_dir(kind).map(|d| d.join("snell-server.conf"))
    }

    #[must_use]
    pub fn manifest_path(&self, kind: ProxyKind) -> PathBuf {
        self.manifest_dir.join(format!("{}.toml", kind.name()))
    }
}

// =============================================================================
// INSTALL MANIFEST
// =============================================================================

/// Record of one installed proxy service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InstallManifest {
    pub kind: ProxyKind,
    pub version: String,
    pub port: u16,
    /// PSK (snell) or password (anytls).
    pub secret: String,
    pub arch: Arch,
    pub ipv6: bool,
}

impl InstallManifest {
    /// Serialize to TOML.
    pub fn to_toml(&self) -> Result<String, HostkitError> {
        toml::to_string(self).map_err(|e| HostkitError::Io(format!("manifest encode: {}", e)))
    }

    /// Parse from TOML.
    pub fn from_toml(text: &str) -> Result<Self, HostkitError> {
        toml::from_str(text).map_err(|e| HostkitError::Install(format!("corrupt manifest: {}", e)))
    }

    /// The `ExecStart=` command line for this install.
    #[must_use]
    pub fn exec_start(&self, paths: &InstallPaths) -> String {
        let binary = paths.binary_path(self.kind);
        match self.kind {
            ProxyKind::Anytls => {
                let listen = if self.ipv6 {
                    format!("[::]:{}", self.port)
                } else {
                    format!("0.0.0.0:{}", self.port)
                };
                format!("{} -l {} -p {}", binary.display(), listen, self.secret)
            }
            ProxyKind::Snell => {
                let config = paths
                    .config_path(self.kind)
                    .unwrap_or_else(|| paths.config_root.join("snell-server.conf"));
                format!("{} -c {}", binary.display(), config.display())
            }
        }
    }

    /// Render the systemd unit.
    pub fn unit(&self, paths: &InstallPaths) -> Result<String, HostkitError> {
        ServiceUnit::new(
            self.kind.description(),
            paths.service_user.clone(),
            self.exec_start(paths),
        )
        .with_documentation(self.kind.documentation())
        .render()
    }

    /// Render the service's own config file, if it has one.
    pub fn config_file(&self, paths: &InstallPaths) -> Result<Option<(PathBuf, String)>, HostkitError> {
        match (self.kind, paths.config_path(self.kind)) {
            (ProxyKind::Snell, Some(path)) => {
                let text = SnellConfig {
                    port: self.port,
                    psk: self.secret.clone(),
                    ipv6: self.ipv6,
                }
                .render()?;
                Ok(Some((path, text)))
            }
            _ => Ok(None),
        }
    }

    /// Client-side config pointing at `server`: a Surge proxy line for snell,
    /// a share URI for anytls.
    #[must_use]
    pub fn client_line(&self, server: &str) -> String {
        match self.kind {
            ProxyKind::Snell => {
                let major = self.version.split('.').next().unwrap_or("4");
                format!(
                    "snell = snell, {}, {}, psk={}, version={}, reuse=true",
                    server, self.port, self.secret, major
                )
            }
            ProxyKind::Anytls => {
                let host = if server.contains(':') && !server.starts_with('[') {
                    format!("[{}]", server)
                } else {
                    server.to_string()
                };
                format!("anytls://{}@{}:{}/?insecure=1", self.secret, host, self.port)
            }
        }
    }
}

/// Check user-supplied install settings.
pub fn validate_settings(port: u16, secret: &str) -> Result<(), HostkitError> {
    if port == 0 {
        return Err(HostkitError::Install("port must be between 1 and 65535".to_string()));
    }
    if secret.len() < 8 || !secret.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(HostkitError::Install(
            "secret must be at least 8 ASCII letters or digits".to_string(),
        ));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
