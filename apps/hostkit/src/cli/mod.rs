//! # hostkit CLI Module
//!
//! This module implements the CLI interface for hostkit.
//!
//! ## Available Commands
//!
//! - `upgrade` - Run, check, inspect, reset or continue the Debian upgrade
//! - `install` - Install anytls or snell as a systemd service
//! - `update` - Replace an installed proxy binary with a newer release
//! - `uninstall` - Remove an installed proxy service
//! - `status` - Show install manifest and service state
//! - `client-config` - Print the client configuration for an install

mod proxy;
mod upgrade;

use crate::config::HostkitConfig;
use clap::{Parser, Subcommand};
use hostkit_core::{HostkitError, ProxyKind};
use std::path::PathBuf;

pub use proxy::*;
pub use upgrade::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// hostkit - Debian release upgrades and proxy services
///
/// Upgrades a Debian host one release per invocation, resuming after each
/// reboot, and manages anytls / snell proxy servers under systemd.
#[derive(Parser, Debug)]
#[command(name = "hostkit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML config file (default: /etc/hostkit/hostkit.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upgrade Debian to the next release (one phase per run)
    Upgrade {
        /// Report readiness and pre-flight gates without changing anything
        #[arg(long, conflicts_with_all = ["status", "reset", "continue_"])]
        check: bool,

        /// Show detected version and recorded progress
        #[arg(long, conflicts_with_all = ["reset", "continue_"])]
        status: bool,

        /// Forget recorded progress
        #[arg(long, conflicts_with = "continue_")]
        reset: bool,

        /// Resume after the reboot that follows a completed phase
        #[arg(long = "continue")]
        continue_: bool,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Install a proxy server
    Install {
        /// anytls or snell
        kind: ProxyKind,

        /// Listen port (default: 8443 for anytls, 6160 for snell)
        #[arg(short, long)]
        port: Option<u16>,

        /// Password / PSK (default: 32 random alphanumerics)
        #[arg(short, long)]
        secret: Option<String>,

        /// Install this release instead of the latest
        #[arg(long)]
        version: Option<String>,

        /// Listen on IPv4 only
        #[arg(long)]
        no_ipv6: bool,

        /// Overwrite an existing install
        #[arg(short, long)]
        force: bool,
    },

    /// Update an installed proxy server
    Update {
        /// anytls or snell
        kind: ProxyKind,

        /// Move to this release (allows downgrades)
        #[arg(long)]
        version: Option<String>,
    },

    /// Remove an installed proxy server
    Uninstall {
        /// anytls or snell
        kind: ProxyKind,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show install and service state
    Status {
        /// anytls or snell
        kind: ProxyKind,
    },

    /// Print client configuration
    ClientConfig {
        /// anytls or snell
        kind: ProxyKind,

        /// Server address clients connect to (default: detected public IP)
        #[arg(long)]
        server: Option<String>,
    },
}

/// Which upgrade entry point the flags select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeMode {
    Run,
    Check,
    Status,
    Reset,
    Continue,
}

impl UpgradeMode {
    /// Flags are mutually exclusive at parse time.
    #[must_use]
    pub fn from_flags(check: bool, status: bool, reset: bool, continue_: bool) -> Self {
        if check {
            Self::Check
        } else if status {
            Self::Status
        } else if reset {
            Self::Reset
        } else if continue_ {
            Self::Continue
        } else {
            Self::Run
        }
    }
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), HostkitError> {
    let config = HostkitConfig::load(cli.config.as_deref())?;
    let json_mode = cli.json_mode;

    match cli.command {
        Commands::Upgrade {
            check,
            status,
            reset,
            continue_,
            yes,
        } => {
            let mode = UpgradeMode::from_flags(check, status, reset, continue_);
            cmd_upgrade(&config, mode, yes, json_mode)
        }
        Commands::Install {
            kind,
            port,
            secret,
            version,
            no_ipv6,
            force,
        } => cmd_install(
            &config,
            json_mode,
            kind,
            InstallArgs {
                port,
                secret,
                version,
                ipv6: !no_ipv6,
                force,
            },
        ),
        Commands::Update { kind, version } => cmd_update(&config, json_mode, kind, version),
        Commands::Uninstall { kind, yes } => cmd_uninstall(&config, json_mode, kind, yes),
        Commands::Status { kind } => cmd_status(&config, json_mode, kind),
        Commands::ClientConfig { kind, server } => {
            cmd_client_config(&config, json_mode, kind, server)
        }
    }
}

/// Print a JSON document to stdout.
pub(crate) fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_default()
    );
}
