//! systemd service unit rendering.

use super::single_line;
use crate::HostkitError;

/// A `simple` service unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub description: String,
    pub documentation: Option<String>,
    pub user: String,
    pub exec_start: String,
    pub restart_sec: u32,
    pub limit_nofile: u32,
}

impl ServiceUnit {
    /// A unit running `exec_start` as `user` with the usual restart policy.
    #[must_use]
    pub fn new(
        description: impl Into<String>,
        user: impl Into<String>,
        exec_start: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            documentation: None,
            user: user.into(),
            exec_start: exec_start.into(),
            restart_sec: 5,
            limit_nofile: 65535,
        }
    }

    /// Set the Documentation= URL.
    #[must_use]
    pub fn with_documentation(mut self, url: impl Into<String>) -> Self {
        self.documentation = Some(url.into());
        self
    }

    /// Render the unit file.
    pub fn render(&self) -> Result<String, HostkitError> {
        single_line("description", &self.description)?;
        single_line("user", &self.user)?;
        single_line("exec_start", &self.exec_start)?;
        if self.exec_start.trim().is_empty() {
            return Err(HostkitError::Template("exec_start is empty".to_string()));
        }
        if self.user.trim().is_empty() {
            return Err(HostkitError::Template("user is empty".to_string()));
        }

        let mut out = String::new();
        out.push_str("[Unit]\n");
        out.push_str(&format!("Description={}\n", self.description));
        if let Some(ref doc) = self.documentation {
            single_line("documentation", doc)?;
            out.push_str(&format!("Documentation={}\n", doc));
        }
        out.push_str("After=network-online.target\n");
        out.push_str("Wants=network-online.target\n");
        out.push('\n');

        out.push_str("[Service]\n");
        out.push_str("Type=simple\n");
        out.push_str(&format!("User={}\n", self.user));
        if self.user != "root" {
            // low ports without root
            out.push_str("AmbientCapabilities=CAP_NET_BIND_SERVICE\n");
        }
        out.push_str(&format!("ExecStart={}\n", self.exec_start));
        out.push_str("Restart=on-failure\n");
        out.push_str(&format!("RestartSec={}s\n", self.restart_sec));
        out.push_str(&format!("LimitNOFILE={}\n", self.limit_nofile));
        out.push('\n');

        out.push_str("[Install]\n");
        out.push_str("WantedBy=multi-user.target\n");
        Ok(out)
    }
}
