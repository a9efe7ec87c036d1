//! # hostkit
//!
//! Resumable Debian release upgrades and anytls / snell proxy services.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                   apps/hostkit (THE BINARY)                  │
//! │                                                              │
//! │  ┌─────────────┐   ┌─────────────┐   ┌───────────────────┐   │
//! │  │    CLI      │   │   Config    │   │   Host adapters   │   │
//! │  │   (clap)    │   │   (toml)    │   │ apt/systemctl/... │   │
//! │  └──────┬──────┘   └──────┬──────┘   └─────────┬─────────┘   │
//! │         └─────────────────┼────────────────────┘             │
//! │                           ▼                                  │
//! │                   ┌───────────────┐                          │
//! │                   │ hostkit-core  │                          │
//! │                   │  (THE LOGIC)  │                          │
//! │                   └───────────────┘                          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Upgrade one release, reboot, continue
//! hostkit upgrade --check
//! hostkit upgrade
//! hostkit upgrade --continue
//!
//! # Proxy services
//! hostkit install snell --port 6160
//! hostkit client-config snell
//! ```

use clap::Parser;
use hostkit::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // HOSTKIT_LOG_FORMAT=json enables machine-parseable logs. Logs go to
    // stderr so stdout carries only command output.
    let log_format = std::env::var("HOSTKIT_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "hostkit=debug,hostkit_core=debug"
    } else {
        "hostkit=info,hostkit_core=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        eprintln!("error: {}", e);
        eprintln!("hint:  {}", e.remedy());
        std::process::exit(1);
    }
}

/// Print the hostkit startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗  ██╗ ██████╗ ███████╗████████╗██╗  ██╗██╗████████╗
  ██║  ██║██╔═══██╗██╔════╝╚══██╔══╝██║ ██╔╝██║╚══██╔══╝
  ███████║██║   ██║███████╗   ██║   █████╔╝ ██║   ██║
  ██╔══██║██║   ██║╚════██║   ██║   ██╔═██╗ ██║   ██║
  ██║  ██║╚██████╔╝███████║   ██║   ██║  ██╗██║   ██║
  ╚═╝  ╚═╝ ╚═════╝ ╚══════╝   ╚═╝   ╚═╝  ╚═╝╚═╝   ╚═╝

  hostkit v{}

  One release per run • Resumable • Verifiable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
