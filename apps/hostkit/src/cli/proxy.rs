//! # Proxy Commands
//!
//! install / update / uninstall / status / client-config for anytls and snell.

use super::print_json;
use crate::config::HostkitConfig;
use crate::system::{HttpFetcher, LocalFs, StdinConfirmer, Systemctl, SystemRunner, UnzipExtractor};
use hostkit_core::primitives::SECRET_LENGTH;
use hostkit_core::{
    Arch, Confirmer, Fetcher, GithubLatestResolver, HostkitError, InstallOptions, Installer,
    PageScrapeResolver, PinnedResolver, ProxyKind, ReleaseResolver, ReleaseSource,
    UpdateOutcome,
};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::net::IpAddr;

/// Echoes the caller's public address as plain text.
const PUBLIC_IP_URL: &str = "https://api.ipify.org";

/// Install flags from the command line.
#[derive(Debug, Clone, Default)]
pub struct InstallArgs {
    pub port: Option<u16>,
    pub secret: Option<String>,
    pub version: Option<String>,
    pub ipv6: bool,
    pub force: bool,
}

/// A random alphanumeric PSK / password.
#[must_use]
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SECRET_LENGTH)
        .map(char::from)
        .collect()
}

/// The resolver for `kind`: pinned if a version was given, upstream otherwise.
pub fn resolver_for<'a>(
    kind: ProxyKind,
    fetcher: &'a dyn Fetcher,
    pinned: Option<String>,
) -> Result<Box<dyn ReleaseResolver + 'a>, HostkitError> {
    if let Some(version) = pinned {
        return Ok(Box::new(PinnedResolver(version)));
    }
    match kind.release_source() {
        ReleaseSource::Github { owner, repo } => {
            Ok(Box::new(GithubLatestResolver::new(fetcher, owner, repo)))
        }
        ReleaseSource::Page { url, pattern } => {
            Ok(Box::new(PageScrapeResolver::new(fetcher, url, pattern)?))
        }
    }
}

/// Build the installer over the real host and hand it to `f`.
fn with_installer<T>(
    config: &HostkitConfig,
    f: impl FnOnce(&Installer<'_>, &HttpFetcher) -> Result<T, HostkitError>,
) -> Result<T, HostkitError> {
    let runner = SystemRunner;
    let fetcher = HttpFetcher::new()?;
    let extractor = UnzipExtractor::new(&runner);
    let services = Systemctl::new(&runner);
    let fs = LocalFs;
    let installer = Installer::new(&fetcher, &extractor, &services, &fs, config.proxy.clone());
    f(&installer, &fetcher)
}

fn work_dir() -> Result<tempfile::TempDir, HostkitError> {
    tempfile::Builder::new()
        .prefix("hostkit-")
        .tempdir()
        .map_err(|e| HostkitError::Io(format!("cannot create work directory: {}", e)))
}

// =============================================================================
// INSTALL / UPDATE / UNINSTALL
// =============================================================================

/// Install a proxy server.
pub fn cmd_install(
    config: &HostkitConfig,
    json_mode: bool,
    kind: ProxyKind,
    args: InstallArgs,
) -> Result<(), HostkitError> {
    let options = InstallOptions {
        port: args.port,
        secret: args.secret.unwrap_or_else(generate_secret),
        ipv6: args.ipv6,
        arch: Arch::current()?,
        force: args.force,
    };
    let work = work_dir()?;

    let manifest = with_installer(config, |installer, fetcher| {
        let resolver = resolver_for(kind, fetcher, args.version)?;
        installer.install(kind, resolver.as_ref(), &options, work.path())
    })?;

    if json_mode {
        print_json(&serde_json::json!({ "installed": manifest }));
        return Ok(());
    }

    println!("{} {} installed", kind, manifest.version);
    println!("==========================");
    println!("Port:    {}", manifest.port);
    println!("Secret:  {}", manifest.secret);
    println!("IPv6:    {}", manifest.ipv6);
    println!("Arch:    {}", manifest.arch);
    println!();
    println!("Client configuration: hostkit client-config {}", kind);
    Ok(())
}

/// Update to the latest (or a pinned) release.
pub fn cmd_update(
    config: &HostkitConfig,
    json_mode: bool,
    kind: ProxyKind,
    version: Option<String>,
) -> Result<(), HostkitError> {
    let exact = version.is_some();
    let work = work_dir()?;

    let outcome = with_installer(config, |installer, fetcher| {
        let resolver = resolver_for(kind, fetcher, version)?;
        installer.update(kind, resolver.as_ref(), work.path(), exact)
    })?;

    if json_mode {
        print_json(&serde_json::json!({ "kind": kind, "update": outcome }));
        return Ok(());
    }

    match outcome {
        UpdateOutcome::UpToDate { version } => {
            println!("{} {} is already the latest release.", kind, version);
        }
        UpdateOutcome::Updated { from, to } => {
            println!("{} updated: {} -> {}", kind, from, to);
        }
    }
    Ok(())
}

/// Remove a proxy server.
pub fn cmd_uninstall(
    config: &HostkitConfig,
    json_mode: bool,
    kind: ProxyKind,
    yes: bool,
) -> Result<(), HostkitError> {
    if !yes
        && !StdinConfirmer.confirm(&format!(
            "Remove {} (service, binary, config and manifest)?",
            kind
        ))
    {
        println!("Aborted; nothing was removed.");
        return Ok(());
    }

    let removed = with_installer(config, |installer, _| installer.uninstall(kind))?;

    if json_mode {
        print_json(&serde_json::json!({ "kind": kind, "removed": removed }));
        return Ok(());
    }

    if removed.is_empty() {
        println!("{} was not installed; nothing to remove.", kind);
    } else {
        println!("{} removed:", kind);
        for path in &removed {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

// =============================================================================
// STATUS / CLIENT CONFIG
// =============================================================================

/// Show manifest and service state.
pub fn cmd_status(config: &HostkitConfig, json_mode: bool, kind: ProxyKind) -> Result<(), HostkitError> {
    let status = with_installer(config, |installer, _| installer.status(kind))?;

    if json_mode {
        print_json(&serde_json::json!(status));
        return Ok(());
    }

    println!("{} Status", kind);
    println!("=============");
    match &status.manifest {
        Some(manifest) => {
            println!("Installed: {}", manifest.version);
            println!("Port:      {}", manifest.port);
            println!("IPv6:      {}", manifest.ipv6);
            println!("Arch:      {}", manifest.arch);
        }
        None => println!("Installed: no"),
    }
    println!("Service:   {}", status.active);
    Ok(())
}

/// Print the client configuration line.
pub fn cmd_client_config(
    config: &HostkitConfig,
    json_mode: bool,
    kind: ProxyKind,
    server: Option<String>,
) -> Result<(), HostkitError> {
    let line = with_installer(config, |installer, fetcher| {
        let server = match server {
            Some(s) => s,
            None => detect_public_address(fetcher)?,
        };
        installer.client_config(kind, &server)
    })?;

    if json_mode {
        print_json(&serde_json::json!({ "kind": kind, "client": line }));
    } else {
        println!("{}", line);
    }
    Ok(())
}

fn detect_public_address(fetcher: &dyn Fetcher) -> Result<String, HostkitError> {
    let text = fetcher.fetch_text(PUBLIC_IP_URL)?;
    let address = text.trim();
    address
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .map_err(|_| {
            HostkitError::Install(format!(
                "cannot detect the public address (got {:?}); pass --server",
                address
            ))
        })
}
