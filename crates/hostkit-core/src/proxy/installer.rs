//! # Proxy Installer
//!
//! Install, update, uninstall and inspect a proxy service.
//!
//! ## Install Order
//!
//! ```text
//! resolve version -> download -> extract -> place binary -> config -> unit
//!                 -> daemon-reload -> enable -> restart -> manifest
//! ```
//!
//! The manifest is written last: an install interrupted before that point
//! leaves no manifest, so the next `install` starts over without `--force`.

use super::{InstallManifest, InstallPaths, ProxyKind, validate_settings};
use crate::release::{Arch, Fetcher, ReleaseResolver, compare_versions, validate_version};
use crate::{CommandOutput, HostkitError};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

// =============================================================================
// COLLABORATORS
// =============================================================================

/// systemctl verbs used by the installer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    DaemonReload,
    Enable,
    Disable,
    Start,
    Stop,
    Restart,
    IsActive,
}

impl ServiceAction {
    #[must_use]
    pub fn verb(&self) -> &'static str {
        match self {
            Self::DaemonReload => "daemon-reload",
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
            Self::IsActive => "is-active",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// Service manager adapter. `service` is ignored for `DaemonReload`.
pub trait ServiceManager {
    fn control(&self, action: ServiceAction, service: &str) -> Result<CommandOutput, HostkitError>;
}

/// File operations performed by the installer.
pub trait Filesystem {
    /// Read a file; `Ok(None)` if it does not exist.
    fn read_to_string(&self, path: &Path) -> Result<Option<String>, HostkitError>;

    /// Atomically replace `path` with `contents`, creating parent directories.
    fn write_file(&self, path: &Path, contents: &[u8], mode: u32) -> Result<(), HostkitError>;

    /// Copy `from` to `to` atomically with the given mode.
    fn install_file(&self, from: &Path, to: &Path, mode: u32) -> Result<(), HostkitError>;

    /// Remove a file or directory tree. Returns false if nothing was there.
    fn remove_path(&self, path: &Path) -> Result<bool, HostkitError>;
}

/// Unpacks a downloaded release archive.
pub trait ArchiveExtractor {
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), HostkitError>;
}

// =============================================================================
// OPTIONS AND OUTCOMES
// =============================================================================

/// Settings for a fresh install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallOptions {
    pub port: Option<u16>,
    pub secret: String,
    pub ipv6: bool,
    pub arch: Arch,
    /// Overwrite an existing install.
    pub force: bool,
}

/// Result of `update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UpdateOutcome {
    UpToDate { version: String },
    Updated { from: String, to: String },
}

/// Current state of one service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub kind: ProxyKind,
    pub manifest: Option<InstallManifest>,
    /// Output of `systemctl is-active`, e.g. `active` or `inactive`.
    pub active: String,
}

// =============================================================================
// INSTALLER
// =============================================================================

/// Proxy install workflow over injected collaborators.
pub struct Installer<'a> {
    fetcher: &'a dyn Fetcher,
    extractor: &'a dyn ArchiveExtractor,
    services: &'a dyn ServiceManager,
    fs: &'a dyn Filesystem,
    paths: InstallPaths,
}

impl<'a> Installer<'a> {
    #[must_use]
    pub fn new(
        fetcher: &'a dyn Fetcher,
        extractor: &'a dyn ArchiveExtractor,
        services: &'a dyn ServiceManager,
        fs: &'a dyn Filesystem,
        paths: InstallPaths,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            services,
            fs,
            paths,
        }
    }

    #[must_use]
    pub fn paths(&self) -> &InstallPaths {
        &self.paths
    }

    /// Load the manifest, if the service is installed.
    pub fn manifest(&self, kind: ProxyKind) -> Result<Option<InstallManifest>, HostkitError> {
        self.fs
            .read_to_string(&self.paths.manifest_path(kind))?
            .map(|text| InstallManifest::from_toml(&text))
            .transpose()
    }

    fn require_manifest(&self, kind: ProxyKind) -> Result<InstallManifest, HostkitError> {
        self.manifest(kind)?.ok_or_else(|| {
            HostkitError::Install(format!("{} is not installed; run `hostkit install {}`", kind, kind))
        })
    }

    fn service(&self, action: ServiceAction, kind: ProxyKind) -> Result<(), HostkitError> {
        let output = self.services.control(action, kind.service_name())?;
        if !output.success() {
            return Err(HostkitError::Install(format!(
                "systemctl {} {} failed: {}",
                action,
                kind.service_name(),
                output.failure_summary()
            )));
        }
        Ok(())
    }

    /// Download, unpack and place the binary for `manifest`.
    fn deploy_binary(&self, manifest: &InstallManifest, work_dir: &Path) -> Result<(), HostkitError> {
        let url = manifest.kind.asset_url(&manifest.version, manifest.arch)?;
        let archive = work_dir.join(format!("{}-{}.zip", manifest.kind, manifest.version));
        let unpacked = work_dir.join("unpacked");

        tracing::info!(%url, "downloading");
        let bytes = self.fetcher.download(&url, &archive)?;
        tracing::debug!(bytes, archive = %archive.display(), "downloaded");

        self.extractor.extract(&archive, &unpacked)?;

        let binary = unpacked.join(manifest.kind.binary_name());
        self.fs
            .install_file(&binary, &self.paths.binary_path(manifest.kind), 0o755)
            .map_err(|e| {
                HostkitError::Install(format!(
                    "archive did not provide {}: {}",
                    manifest.kind.binary_name(),
                    e
                ))
            })
    }

    fn write_manifest(&self, manifest: &InstallManifest) -> Result<(), HostkitError> {
        let text = manifest.to_toml()?;
        self.fs
            .write_file(&self.paths.manifest_path(manifest.kind), text.as_bytes(), 0o600)
    }

    /// Fresh install.
    pub fn install(
        &self,
        kind: ProxyKind,
        resolver: &dyn ReleaseResolver,
        options: &InstallOptions,
        work_dir: &Path,
    ) -> Result<InstallManifest, HostkitError> {
        if !options.force
            && let Some(existing) = self.manifest(kind)?
        {
            return Err(HostkitError::Install(format!(
                "{} {} is already installed; use `hostkit update {}` or --force",
                kind, existing.version, kind
            )));
        }

        let port = options.port.unwrap_or_else(|| kind.default_port());
        validate_settings(port, &options.secret)?;

        let version = resolver.latest_version()?;
        validate_version(&version)?;
        tracing::info!(%kind, %version, "installing");

        let manifest = InstallManifest {
            kind,
            version,
            port,
            secret: options.secret.clone(),
            arch: options.arch,
            ipv6: options.ipv6,
        };
        let unit = manifest.unit(&self.paths)?;
        let config = manifest.config_file(&self.paths)?;

        self.deploy_binary(&manifest, work_dir)?;
        if let Some((path, text)) = config {
            self.fs.write_file(&path, text.as_bytes(), 0o600)?;
        }
        self.fs
            .write_file(&self.paths.unit_path(kind), unit.as_bytes(), 0o644)?;

        self.service(ServiceAction::DaemonReload, kind)?;
        self.service(ServiceAction::Enable, kind)?;
        self.service(ServiceAction::Restart, kind)?;

        self.write_manifest(&manifest)?;
        tracing::info!(%kind, version = %manifest.version, port, "installed");
        Ok(manifest)
    }

    /// Replace the binary with the resolved version, keeping port and secret.
    ///
    /// With `exact`, any version different from the installed one is applied
    /// (pinned upgrades and downgrades); otherwise only newer versions are.
    pub fn update(
        &self,
        kind: ProxyKind,
        resolver: &dyn ReleaseResolver,
        work_dir: &Path,
        exact: bool,
    ) -> Result<UpdateOutcome, HostkitError> {
        let current = self.require_manifest(kind)?;
        let target = resolver.latest_version()?;
        validate_version(&target)?;

        let ordering = compare_versions(&target, &current.version);
        let apply = if exact {
            ordering != Ordering::Equal
        } else {
            ordering == Ordering::Greater
        };
        if !apply {
            tracing::info!(%kind, version = %current.version, latest = %target, "already current");
            return Ok(UpdateOutcome::UpToDate {
                version: current.version,
            });
        }

        let updated = InstallManifest {
            version: target.clone(),
            ..current.clone()
        };
        self.deploy_binary(&updated, work_dir)?;
        self.service(ServiceAction::Restart, kind)?;
        self.write_manifest(&updated)?;

        tracing::info!(%kind, from = %current.version, to = %target, "updated");
        Ok(UpdateOutcome::Updated {
            from: current.version,
            to: target,
        })
    }

    /// Stop the service and remove everything the install wrote.
    ///
    /// Stop/disable failures are logged and do not prevent removal.
    pub fn uninstall(&self, kind: ProxyKind) -> Result<Vec<PathBuf>, HostkitError> {
        for action in [ServiceAction::Stop, ServiceAction::Disable] {
            match self.services.control(action, kind.service_name()) {
                Ok(out) if out.success() => {}
                Ok(out) => {
                    tracing::warn!(%kind, %action, reason = %out.failure_summary(), "ignored during uninstall");
                }
                Err(e) => tracing::warn!(%kind, %action, error = %e, "ignored during uninstall"),
            }
        }

        let mut candidates = vec![
            self.paths.unit_path(kind),
            self.paths.binary_path(kind),
        ];
        candidates.extend(self.paths.config_dir(kind));
        candidates.push(self.paths.manifest_path(kind));

        let mut removed = Vec::new();
        for path in candidates {
            if self.fs.remove_path(&path)? {
                tracing::info!(path = %path.display(), "removed");
                removed.push(path);
            }
        }

        self.service(ServiceAction::DaemonReload, kind)?;
        Ok(removed)
    }

    /// Manifest plus live service state.
    pub fn status(&self, kind: ProxyKind) -> Result<ServiceStatus, HostkitError> {
        let manifest = self.manifest(kind)?;
        let output = self
            .services
            .control(ServiceAction::IsActive, kind.service_name())?;
        let active = match output.stdout.trim() {
            "" => "unknown".to_string(),
            state => state.to_string(),
        };
        Ok(ServiceStatus {
            kind,
            manifest,
            active,
        })
    }

    /// Client configuration line for the installed service.
    pub fn client_config(&self, kind: ProxyKind, server: &str) -> Result<String, HostkitError> {
        Ok(self.require_manifest(kind)?.client_line(server))
    }
}
