//! # Host Adapters
//!
//! Implementations of the `hostkit-core` collaborator traits against a real
//! Debian host.
//!
//! | Core trait        | Adapter               | Backed by                    |
//! |-------------------|-----------------------|------------------------------|
//! | `VersionDetector` | `OsReleaseDetector`   | `/etc/os-release`            |
//! | `SourcesWriter`   | `AptSourcesWriter`    | `/etc/apt/sources.list(.d)`  |
//! | `PackageManager`  | `AptGet`              | `apt-get`, `update-grub`     |
//! | `HostProbe`       | `SystemProbe`         | `df`, `fuser`, HTTP HEAD     |
//! | `Confirmer`       | `StdinConfirmer`      | terminal prompt              |
//! | `ServiceManager`  | `Systemctl`           | `systemctl`                  |
//! | `Fetcher`         | `HttpFetcher`         | reqwest blocking client      |
//! | `ArchiveExtractor`| `UnzipExtractor`      | `unzip`                      |
//! | `Filesystem`      | `LocalFs`             | atomic temp-file writes      |

mod apt;
mod archive;
mod confirm;
mod fs;
mod host;
mod http;
mod os;
mod runner;
mod sources;
mod systemd;

pub use apt::*;
pub use archive::*;
pub use confirm::*;
pub use fs::*;
pub use host::*;
pub use http::*;
pub use os::*;
pub use runner::*;
pub use sources::*;
pub use systemd::*;
