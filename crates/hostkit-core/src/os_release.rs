//! # OS Identification
//!
//! Pure parsing of `/etc/os-release` and `/etc/debian_version`.
//! Reading the files is the app layer's job; this module only turns their
//! contents into a [`HostVersion`].

use crate::{Codename, HostkitError, VersionId};
use serde::Serialize;

/// Fields of interest from an os-release file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub id: Option<String>,
    pub version_id: Option<String>,
    pub version_codename: Option<String>,
    pub pretty_name: Option<String>,
}

impl OsRelease {
    /// Parse os-release `KEY=value` lines. Unknown keys and comments are ignored.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut release = Self::default();

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, raw)) = line.split_once('=') else {
                continue;
            };
            let value = unquote(raw.trim());
            if value.is_empty() {
                continue;
            }
            match key.trim() {
                "ID" => release.id = Some(value.to_ascii_lowercase()),
                "VERSION_ID" => release.version_id = Some(value),
                "VERSION_CODENAME" => release.version_codename = Some(value),
                "PRETTY_NAME" => release.pretty_name = Some(value),
                _ => {}
            }
        }

        release
    }
}

fn unquote(value: &str) -> String {
    let stripped = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .or_else(|| value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')))
        .unwrap_or(value);
    stripped.replace("\\\"", "\"")
}

/// The host's release as seen by the sequencer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HostVersion {
    /// Normalized version id (major release number for Debian).
    pub version: VersionId,
    /// Release codename, when the host reports one.
    pub codename: Option<Codename>,
    /// Display name, when the host reports one.
    pub pretty_name: Option<String>,
}

/// Major component of a Debian point release (`"11.9"` -> `"11"`).
fn debian_major(raw: &str) -> &str {
    raw.split('.').next().unwrap_or(raw).trim()
}

/// Derive the host version from the raw file contents.
///
/// `os_release` wins when it carries a `VERSION_ID`. Debian testing/sid has
/// none, in which case `debian_version` is consulted. A non-Debian `ID` is
/// reported verbatim as `<id>-<version>` so the plan treats it as unsupported
/// instead of failing detection.
pub fn detect_host_version(
    os_release: Option<&str>,
    debian_version: Option<&str>,
) -> Result<HostVersion, HostkitError> {
    let release = os_release.map(OsRelease::parse).unwrap_or_default();
    let codename = release.version_codename.clone().map(Codename::new);
    let pretty_name = release.pretty_name.clone();

    if let Some(id) = release.id.as_deref()
        && id != "debian"
    {
        let version = release.version_id.as_deref().unwrap_or("unknown");
        return Ok(HostVersion {
            version: VersionId::new(format!("{}-{}", id, version)),
            codename,
            pretty_name,
        });
    }

    if let Some(version_id) = release.version_id.as_deref() {
        return Ok(HostVersion {
            version: VersionId::new(debian_major(version_id)),
            codename,
            pretty_name,
        });
    }

    match debian_version.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => Ok(HostVersion {
            version: VersionId::new(debian_major(raw)),
            codename,
            pretty_name,
        }),
        None => Err(HostkitError::Detection(
            "neither os-release VERSION_ID nor debian_version is available".to_string(),
        )),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const BULLSEYE: &str = r#"PRETTY_NAME="Debian GNU/Linux 11 (bullseye)"
NAME="Debian GNU/Linux"
VERSION_ID="11"
VERSION="11 (bullseye)"
VERSION_CODENAME=bullseye
ID=debian
HOME_URL="https://www.debian.org/"
"#;

    #[test]
    fn parses_quoted_and_bare_values() {
        let release = OsRelease::parse(BULLSEYE);
        assert_eq!(release.id.as_deref(), Some("debian"));
        assert_eq!(release.version_id.as_deref(), Some("11"));
        assert_eq!(release.version_codename.as_deref(), Some("bullseye"));
        assert_eq!(
            release.pretty_name.as_deref(),
            Some("Debian GNU/Linux 11 (bullseye)")
        );
    }

    #[test]
    fn detects_debian_from_os_release() {
        let host = detect_host_version(Some(BULLSEYE), None).expect("detect");
        assert_eq!(host.version, VersionId::new("11"));
        assert_eq!(host.codename, Some(Codename::new("bullseye")));
    }

    #[test]
    fn falls_back_to_debian_version() {
        let sid = "ID=debian\nVERSION_CODENAME=trixie\n";
        let host = detect_host_version(Some(sid), Some("12.5\n")).expect("detect");
        assert_eq!(host.version, VersionId::new("12"));
    }

    #[test]
    fn missing_everything_is_detection_error() {
        let result = detect_host_version(None, None);
        assert!(matches!(result, Err(HostkitError::Detection(_))));

        let result = detect_host_version(Some("# empty\n"), Some("   "));
        assert!(matches!(result, Err(HostkitError::Detection(_))));
    }

    #[test]
    fn non_debian_is_reported_verbatim() {
        let ubuntu = "ID=ubuntu\nVERSION_ID=\"22.04\"\n";
        let host = detect_host_version(Some(ubuntu), None).expect("detect");
        assert_eq!(host.version, VersionId::new("ubuntu-22.04"));
    }
}
