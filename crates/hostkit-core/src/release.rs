//! # Release Resolution
//!
//! Finding the latest upstream version of a proxy server and naming the
//! asset to download for the host CPU.
//!
//! Network access goes through [`Fetcher`]; resolvers only parse what it
//! returns, so tests can feed canned pages instead of touching the network.

use crate::HostkitError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::Path;

// =============================================================================
// FETCHER
// =============================================================================

/// HTTP access used by resolvers and installers.
pub trait Fetcher {
    /// GET `url` and return the body as text.
    fn fetch_text(&self, url: &str) -> Result<String, HostkitError>;

    /// GET `url` and stream the body into `dest`. Returns bytes written.
    fn download(&self, url: &str, dest: &Path) -> Result<u64, HostkitError>;
}

// =============================================================================
// RESOLVERS
// =============================================================================

/// Source of "the latest version" for one product.
pub trait ReleaseResolver {
    fn latest_version(&self) -> Result<String, HostkitError>;
}

/// Always returns the version it was built with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedResolver(pub String);

impl ReleaseResolver for PinnedResolver {
    fn latest_version(&self) -> Result<String, HostkitError> {
        let version = strip_v(&self.0);
        validate_version(version)?;
        Ok(version.to_string())
    }
}

/// Reads `tag_name` from the GitHub "latest release" API.
pub struct GithubLatestResolver<'a> {
    fetcher: &'a dyn Fetcher,
    owner: String,
    repo: String,
}

impl<'a> GithubLatestResolver<'a> {
    #[must_use]
    pub fn new(fetcher: &'a dyn Fetcher, owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            fetcher,
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// API URL queried by this resolver.
    #[must_use]
    pub fn url(&self) -> String {
        format!(
            "https://api.github.com/repos/{}/{}/releases/latest",
            self.owner, self.repo
        )
    }
}

impl ReleaseResolver for GithubLatestResolver<'_> {
    fn latest_version(&self) -> Result<String, HostkitError> {
        let body = self.fetcher.fetch_text(&self.url())?;
        parse_github_tag(&body)
    }
}

/// Scrapes the highest version matching a pattern out of a web page.
pub struct PageScrapeResolver<'a> {
    fetcher: &'a dyn Fetcher,
    url: String,
    pattern: Regex,
}

impl<'a> PageScrapeResolver<'a> {
    /// `pattern` must contain one capture group holding the version.
    pub fn new(
        fetcher: &'a dyn Fetcher,
        url: impl Into<String>,
        pattern: &str,
    ) -> Result<Self, HostkitError> {
        let pattern = Regex::new(pattern)
            .map_err(|e| HostkitError::Download(format!("bad version pattern: {}", e)))?;
        Ok(Self {
            fetcher,
            url: url.into(),
            pattern,
        })
    }
}

impl ReleaseResolver for PageScrapeResolver<'_> {
    fn latest_version(&self) -> Result<String, HostkitError> {
        let page = self.fetcher.fetch_text(&self.url)?;
        scrape_latest(&page, &self.pattern).ok_or_else(|| {
            HostkitError::Download(format!("no release version found on {}", self.url))
        })
    }
}

#[derive(Deserialize)]
struct GithubRelease {
    tag_name: String,
}

/// Extract the version from a GitHub release JSON document.
pub fn parse_github_tag(body: &str) -> Result<String, HostkitError> {
    let release: GithubRelease = serde_json::from_str(body)
        .map_err(|e| HostkitError::Download(format!("unexpected GitHub response: {}", e)))?;
    let version = strip_v(release.tag_name.trim());
    if version.is_empty() {
        return Err(HostkitError::Download("empty tag_name".to_string()));
    }
    Ok(version.to_string())
}

/// Highest version captured by `pattern` anywhere in `page`.
#[must_use]
pub fn scrape_latest(page: &str, pattern: &Regex) -> Option<String> {
    pattern
        .captures_iter(page)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .max_by(|a, b| compare_versions(a, b))
}

fn strip_v(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// A version ends up in download URLs and file names, so only ASCII
/// letters, digits and dots are accepted.
pub fn validate_version(version: &str) -> Result<(), HostkitError> {
    let valid = !version.is_empty()
        && version.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'.')
        && version.bytes().any(|b| b.is_ascii_digit());
    if valid {
        Ok(())
    } else {
        Err(HostkitError::Download(format!(
            "invalid release version {:?}: expected digits, letters and dots",
            version
        )))
    }
}

// =============================================================================
// VERSION ORDERING
// =============================================================================

/// Split `"0b3"` into `(0, "b3")`.
fn split_segment(segment: &str) -> (u64, &str) {
    let digits = segment
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(segment.len());
    let number = segment[..digits].parse().unwrap_or(0);
    (number, &segment[digits..])
}

/// Order dotted versions numerically.
///
/// A pre-release suffix sorts before the plain release: `5.0.0b3 < 5.0.0`.
/// Missing trailing segments count as zero: `4.1 == 4.1.0`.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a: Vec<&str> = strip_v(a.trim()).split('.').collect();
    let b: Vec<&str> = strip_v(b.trim()).split('.').collect();

    for i in 0..a.len().max(b.len()) {
        let (na, sa) = a.get(i).map(|s| split_segment(s)).unwrap_or((0, ""));
        let (nb, sb) = b.get(i).map(|s| split_segment(s)).unwrap_or((0, ""));

        let ordering = na.cmp(&nb).then_with(|| match (sa.is_empty(), sb.is_empty()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) => compare_suffix(sa, sb),
        });
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

/// `b3` vs `b10`: compare the letters, then the trailing number.
fn compare_suffix(a: &str, b: &str) -> Ordering {
    let split = |s: &str| {
        let idx = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
        let (tag, num) = s.split_at(idx);
        (tag.to_string(), num.parse::<u64>().unwrap_or(0))
    };
    split(a).cmp(&split(b))
}

// =============================================================================
// ARCHITECTURE
// =============================================================================

/// Host CPU families with published proxy builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
    Armv7,
    I386,
}

impl Arch {
    /// Map a `uname -m` value.
    pub fn from_machine(machine: &str) -> Result<Self, HostkitError> {
        match machine.trim() {
            "x86_64" | "amd64" => Ok(Self::Amd64),
            "aarch64" | "arm64" => Ok(Self::Arm64),
            "armv7l" | "armv7" | "armhf" | "arm" => Ok(Self::Armv7),
            "i386" | "i686" | "x86" => Ok(Self::I386),
            other => Err(HostkitError::Download(format!(
                "no release is published for CPU architecture '{}'",
                other
            ))),
        }
    }

    /// The architecture of the running binary.
    pub fn current() -> Result<Self, HostkitError> {
        Self::from_machine(std::env::consts::ARCH)
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Amd64 => "amd64",
            Self::Arm64 => "arm64",
            Self::Armv7 => "armv7",
            Self::I386 => "i386",
        };
        f.write_str(name)
    }
}

// =============================================================================
// TESTS
// =============================================================================
