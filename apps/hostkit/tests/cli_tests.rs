//! Argument parsing and configuration loading.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use clap::Parser;
use hostkit::cli::{Cli, Commands, UpgradeMode};
use hostkit::config::HostkitConfig;
use hostkit_core::{HostkitError, ProxyKind};
use std::path::PathBuf;

// =============================================================================
// UPGRADE FLAGS
// =============================================================================

#[test]
fn test_upgrade_defaults_to_run() {
    let cli = Cli::try_parse_from(["hostkit", "upgrade"]).unwrap();
    match cli.command {
        Commands::Upgrade {
            check,
            status,
            reset,
            continue_,
            yes,
        } => {
            assert_eq!(
                UpgradeMode::from_flags(check, status, reset, continue_),
                UpgradeMode::Run
            );
            assert!(!yes);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_upgrade_continue_flag() {
    let cli = Cli::try_parse_from(["hostkit", "upgrade", "--continue", "-y"]).unwrap();
    match cli.command {
        Commands::Upgrade {
            check,
            status,
            reset,
            continue_,
            yes,
        } => {
            assert_eq!(
                UpgradeMode::from_flags(check, status, reset, continue_),
                UpgradeMode::Continue
            );
            assert!(yes);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_upgrade_modes_are_exclusive() {
    for pair in [
        ["--check", "--status"],
        ["--check", "--reset"],
        ["--status", "--continue"],
        ["--reset", "--continue"],
    ] {
        let result = Cli::try_parse_from(["hostkit", "upgrade", pair[0], pair[1]]);
        assert!(result.is_err(), "{:?} should conflict", pair);
    }
}

#[test]
fn test_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "hostkit",
        "upgrade",
        "--status",
        "--json-mode",
        "-c",
        "/tmp/h.toml",
    ])
    .unwrap();
    assert!(cli.json_mode);
    assert_eq!(cli.config, Some(PathBuf::from("/tmp/h.toml")));
}

// =============================================================================
// PROXY COMMANDS
// =============================================================================

#[test]
fn test_install_arguments() {
    let cli = Cli::try_parse_from([
        "hostkit", "install", "snell", "--port", "7000", "--no-ipv6", "--version", "4.1.1",
    ])
    .unwrap();
    match cli.command {
        Commands::Install {
            kind,
            port,
            secret,
            version,
            no_ipv6,
            force,
        } => {
            assert_eq!(kind, ProxyKind::Snell);
            assert_eq!(port, Some(7000));
            assert_eq!(secret, None);
            assert_eq!(version.as_deref(), Some("4.1.1"));
            assert!(no_ipv6);
            assert!(!force);
        }
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_unknown_proxy_kind_rejected() {
    assert!(Cli::try_parse_from(["hostkit", "install", "wireguard"]).is_err());
    assert!(Cli::try_parse_from(["hostkit", "status"]).is_err());
}

#[test]
fn test_client_config_server() {
    let cli = Cli::try_parse_from([
        "hostkit",
        "client-config",
        "anytls",
        "--server",
        "vpn.example.net",
    ])
    .unwrap();
    match cli.command {
        Commands::ClientConfig { kind, server } => {
            assert_eq!(kind, ProxyKind::Anytls);
            assert_eq!(server.as_deref(), Some("vpn.example.net"));
        }
        other => panic!("unexpected command {:?}", other),
    }
}

// =============================================================================
// CONFIGURATION
// =============================================================================

#[test]
fn test_config_file_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hostkit.toml");
    std::fs::write(
        &path,
        "[upgrade]\nstate_file = \"/srv/state\"\nassume_yes = true\n\n[proxy]\nmanifest_dir = \"/srv/manifests\"\n",
    )
    .unwrap();

    let config = HostkitConfig::load(Some(&path)).unwrap();
    assert_eq!(config.upgrade.state_file, PathBuf::from("/srv/state"));
    assert!(config.upgrade.assume_yes);
    assert_eq!(config.proxy.manifest_dir, PathBuf::from("/srv/manifests"));
    assert_eq!(
        config.proxy.manifest_path(ProxyKind::Snell),
        PathBuf::from("/srv/manifests/snell.toml")
    );
}

#[test]
fn test_invalid_config_is_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("hostkit.toml");
    std::fs::write(&path, "[upgrade]\nmin_free_space_mb = \"lots\"\n").unwrap();

    let err = HostkitConfig::load(Some(&path)).unwrap_err();
    assert!(matches!(err, HostkitError::Config(_)));
    assert!(err.to_string().contains("hostkit.toml"));
}
