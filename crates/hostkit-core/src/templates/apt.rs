//! apt `sources.list` rendering and codename retargeting.

use super::single_line;
use crate::{Codename, HostkitError};
use regex::Regex;

/// Releases that predate the `non-free-firmware` component.
const PRE_FIRMWARE_COMPONENT: &[&str] = &["stretch", "buster", "bullseye"];

/// The main `sources.list` for one release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AptSources {
    pub mirror: String,
    pub security_mirror: String,
    pub codename: Codename,
    pub components: Vec<String>,
}

impl AptSources {
    /// Sources for `codename` with the components that release ships.
    #[must_use]
    pub fn for_release(
        codename: &Codename,
        mirror: impl Into<String>,
        security_mirror: impl Into<String>,
    ) -> Self {
        let mut components = vec![
            "main".to_string(),
            "contrib".to_string(),
            "non-free".to_string(),
        ];
        if !PRE_FIRMWARE_COMPONENT.contains(&codename.as_str()) {
            components.push("non-free-firmware".to_string());
        }
        Self {
            mirror: mirror.into(),
            security_mirror: security_mirror.into(),
            codename: codename.clone(),
            components,
        }
    }

    /// Render the file.
    pub fn render(&self) -> Result<String, HostkitError> {
        single_line("mirror", &self.mirror)?;
        single_line("security_mirror", &self.security_mirror)?;
        if self.codename.as_str().is_empty()
            || !self
                .codename
                .as_str()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(HostkitError::Template(format!(
                "invalid codename {:?}",
                self.codename.as_str()
            )));
        }

        let mirror = self.mirror.trim_end_matches('/');
        let security = self.security_mirror.trim_end_matches('/');
        let components = self.components.join(" ");
        let codename = &self.codename;

        Ok(format!(
            "# Generated by hostkit for Debian {codename}\n\
             deb {mirror} {codename} {components}\n\
             deb {mirror} {codename}-updates {components}\n\
             deb {security} {codename}-security {components}\n"
        ))
    }
}

/// Replace whole-word occurrences of `from` with `to` in an apt source file.
///
/// Suite suffixes follow along (`bullseye-backports` -> `bookworm-backports`);
/// longer words containing the codename are left alone.
pub fn retarget_codename(text: &str, from: &Codename, to: &Codename) -> Result<String, HostkitError> {
    let pattern = Regex::new(&format!(r"\b{}\b", regex::escape(from.as_str())))
        .map_err(|e| HostkitError::Template(e.to_string()))?;
    Ok(pattern.replace_all(text, to.as_str()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bookworm_gets_firmware_component() {
        let sources = AptSources::for_release(
            &Codename::new("bookworm"),
            "http://deb.debian.org/debian/",
            "http://security.debian.org/debian-security",
        );
        let text = sources.render().expect("render");
        assert!(text.contains(
            "deb http://deb.debian.org/debian bookworm main contrib non-free non-free-firmware\n"
        ));
        assert!(text.contains("bookworm-updates"));
        assert!(text.contains(
            "deb http://security.debian.org/debian-security bookworm-security main"
        ));
    }

    #[test]
    fn bullseye_has_no_firmware_component() {
        let sources = AptSources::for_release(&Codename::new("bullseye"), "m", "s");
        assert!(!sources.components.iter().any(|c| c == "non-free-firmware"));
    }

    #[test]
    fn invalid_codename_rejected() {
        let sources = AptSources::for_release(&Codename::new("book worm"), "m", "s");
        assert!(matches!(sources.render(), Err(HostkitError::Template(_))));
    }

    #[test]
    fn retarget_replaces_whole_words_only() {
        let text = "deb http://x bullseye-backports main\n# mybullseyes stays\ndeb http://y bullseye main\n";
        let out = retarget_codename(text, &Codename::new("bullseye"), &Codename::new("bookworm"))
            .expect("retarget");
        assert_eq!(
            out,
            "deb http://x bookworm-backports main\n# mybullseyes stays\ndeb http://y bookworm main\n"
        );
    }
}
