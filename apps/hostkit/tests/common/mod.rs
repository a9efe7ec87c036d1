#![allow(dead_code)]

use assert_cmd::Command;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

/// A fake host root: os-release, debian_version, state file and a config
/// pointing at them. Nothing outside the temp dir is touched.
pub struct TestHost {
    pub dir: TempDir,
    pub config: PathBuf,
    pub state_file: PathBuf,
    pub os_release: PathBuf,
}

impl TestHost {
    /// A Debian host reporting `version_id`.
    pub fn debian(version_id: &str, codename: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let os_release = dir.path().join("os-release");
        let state_file = dir.path().join("state").join("debian-upgrade.state");
        let config = dir.path().join("hostkit.toml");

        std::fs::write(
            &os_release,
            format!(
                "PRETTY_NAME=\"Debian GNU/Linux {v} ({c})\"\nNAME=\"Debian GNU/Linux\"\n\
                 VERSION_ID=\"{v}\"\nVERSION_CODENAME={c}\nID=debian\n",
                v = version_id,
                c = codename
            ),
        )
        .unwrap();

        let toml = format!(
            "[upgrade]\n\
             state_file = {state:?}\n\
             os_release_path = {os:?}\n\
             debian_version_path = {deb:?}\n\
             sources_list = {list:?}\n\
             sources_dir = {list_d:?}\n\
             network_probe_url = \"http://127.0.0.1:9/\"\n\
             \n\
             [proxy]\n\
             install_dir = {bin:?}\n\
             unit_dir = {units:?}\n\
             config_root = {etc:?}\n\
             manifest_dir = {manifests:?}\n",
            state = state_file.display().to_string(),
            os = os_release.display().to_string(),
            deb = dir.path().join("debian_version").display().to_string(),
            list = dir.path().join("sources.list").display().to_string(),
            list_d = dir.path().join("sources.list.d").display().to_string(),
            bin = dir.path().join("bin").display().to_string(),
            units = dir.path().join("units").display().to_string(),
            etc = dir.path().join("etc").display().to_string(),
            manifests = dir.path().join("manifests").display().to_string(),
        );
        std::fs::write(&config, toml).unwrap();

        Self {
            dir,
            config,
            state_file,
            os_release,
        }
    }

    /// Record `marker` as the last completed phase.
    pub fn with_marker(self, marker: &str) -> Self {
        std::fs::create_dir_all(self.state_file.parent().unwrap()).unwrap();
        std::fs::write(&self.state_file, format!("{}\n", marker)).unwrap();
        self
    }

    pub fn marker(&self) -> Option<String> {
        std::fs::read_to_string(&self.state_file)
            .ok()
            .map(|s| s.trim().to_string())
    }

    /// `hostkit -q -c <config>` ready for more arguments.
    pub fn hostkit(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_hostkit"));
        cmd.timeout(Duration::from_secs(30));
        cmd.env_remove("RUST_LOG");
        cmd.arg("-q").arg("-c").arg(&self.config);
        cmd
    }
}
