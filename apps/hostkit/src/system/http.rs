//! HTTP fetcher over reqwest's blocking client.

use hostkit_core::{Fetcher, HostkitError};
use std::path::Path;
use std::time::Duration;

const USER_AGENT: &str = concat!("hostkit/", env!("CARGO_PKG_VERSION"));

/// Plain HTTP(S) GETs for release lookups and downloads.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// Build the client. Transfers have no overall timeout; release archives
    /// can be slow to download.
    pub fn new() -> Result<Self, HostkitError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Option::<Duration>::None)
            .build()
            .map_err(|e| HostkitError::Download(format!("http client: {}", e)))?;
        Ok(Self { client })
    }

    fn get(&self, url: &str) -> Result<reqwest::blocking::Response, HostkitError> {
        tracing::debug!(%url, "GET");
        self.client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| HostkitError::Download(format!("{}: {}", url, e)))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch_text(&self, url: &str) -> Result<String, HostkitError> {
        self.get(url)?
            .text()
            .map_err(|e| HostkitError::Download(format!("{}: {}", url, e)))
    }

    fn download(&self, url: &str, dest: &Path) -> Result<u64, HostkitError> {
        let mut response = self.get(url)?;
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = std::fs::File::create(dest)
            .map_err(|e| HostkitError::Io(format!("cannot create {}: {}", dest.display(), e)))?;
        response
            .copy_to(&mut file)
            .map_err(|e| HostkitError::Download(format!("{}: {}", url, e)))
    }
}
