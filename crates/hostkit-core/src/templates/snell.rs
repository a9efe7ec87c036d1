//! snell-server configuration rendering.

use crate::HostkitError;

/// Contents of `snell-server.conf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnellConfig {
    pub port: u16,
    pub psk: String,
    pub ipv6: bool,
}

impl SnellConfig {
    /// Render the `[snell-server]` section.
    pub fn render(&self) -> Result<String, HostkitError> {
        if self.port == 0 {
            return Err(HostkitError::Template("port must not be 0".to_string()));
        }
        if self.psk.is_empty() || self.psk.chars().any(|c| c.is_whitespace() || c == '=') {
            return Err(HostkitError::Template(
                "psk must be non-empty and contain no whitespace or '='".to_string(),
            ));
        }

        let listen = if self.ipv6 {
            format!("::0:{}", self.port)
        } else {
            format!("0.0.0.0:{}", self.port)
        };

        Ok(format!(
            "[snell-server]\nlisten = {}\npsk = {}\nipv6 = {}\n",
            listen, self.psk, self.ipv6
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_dual_stack_listener() {
        let config = SnellConfig {
            port: 6160,
            psk: "abc123".to_string(),
            ipv6: true,
        };
        assert_eq!(
            config.render().expect("render"),
            "[snell-server]\nlisten = ::0:6160\npsk = abc123\nipv6 = true\n"
        );
    }

    #[test]
    fn renders_ipv4_listener() {
        let config = SnellConfig {
            port: 443,
            psk: "k".to_string(),
            ipv6: false,
        };
        let text = config.render().expect("render");
        assert!(text.contains("listen = 0.0.0.0:443\n"));
        assert!(text.contains("ipv6 = false\n"));
    }

    #[test]
    fn rejects_bad_input() {
        let zero_port = SnellConfig {
            port: 0,
            psk: "k".to_string(),
            ipv6: true,
        };
        assert!(zero_port.render().is_err());

        let bad_psk = SnellConfig {
            port: 1,
            psk: "a b".to_string(),
            ipv6: true,
        };
        assert!(bad_psk.render().is_err());
    }
}
