//! Common fixtures for terra integration tests
//!
//! [`TestRepo`] lays out a throwaway config repository (fleet YAML, chart
//! source tree) plus a terra home directory, and builds `terra` commands
//! pointed at them.

// Not every helper is used by every test file
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::TempDir;
use terra_cli::config::ConfigRepo;

/// A config repository and terra home inside a temp directory.
pub struct TestRepo {
    temp: TempDir,
}

impl TestRepo {
    /// An empty repository with `environments/`, `clusters/` and `charts/`.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("create temp dir");
        let repo = Self {
            temp,
        };
        for dir in ["environments", "clusters", "charts", "argocd/app", "argocd/project"] {
            fs::create_dir_all(repo.root().join(dir)).expect("create repo dir");
        }
        fs::create_dir_all(repo.home()).expect("create home");
        repo
    }

    /// A repository with a small fleet:
    ///
    /// - `dev` (static): leonardo, cromwell, sam
    /// - `prod` (static): datarepo, leonardo, sam
    /// - `swatomation` (template, bee): leonardo
    /// - `fiab-one` (dynamic from swatomation): leonardo
    /// - cluster `terra-dev`: yale
    pub fn with_sample_fleet() -> Self {
        let repo = Self::new();
        repo.write_environment(
            "dev",
            "base: live\ndefaultCluster: terra-dev\nreleases:\n  leonardo:\n    chartVersion: 1.0.0\n    appVersion: leo-dev\n  cromwell:\n    chartVersion: 2.0.0\n    appVersion: crom-dev\n  sam:\n    chartVersion: 3.0.0\n    appVersion: sam-dev\n  rawls:\n    enabled: false\n",
        );
        repo.write_environment(
            "prod",
            "base: live\ndefaultCluster: terra-prod\nreleases:\n  datarepo:\n    chartVersion: 4.0.0\n    appVersion: dr-prod\n  leonardo:\n    chartVersion: 1.0.0\n    appVersion: leo-prod\n  sam:\n    chartVersion: 3.0.0\n    appVersion: sam-prod\n",
        );
        repo.write_environment(
            "swatomation",
            "base: bee\ndefaultCluster: terra-qa\nlifecycle: template\nreleases:\n  leonardo:\n    chartVersion: 1.0.0\n    appVersion: leo-bee\n",
        );
        repo.write_environment(
            "fiab-one",
            "base: bee\ndefaultCluster: terra-qa\nlifecycle: dynamic\ntemplate: swatomation\nreleases:\n  leonardo:\n    chartVersion: 1.0.0\n    appVersion: leo-fiab\n",
        );
        repo.write_cluster(
            "terra-dev",
            "base: terra\nproject: terra-dev-project\nlocation: us-central1-a\naddress: https://10.0.0.1\nreleases:\n  yale:\n    chartVersion: 0.3.0\n",
        );
        repo
    }

    /// Temp directory root.
    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    /// Config repository root.
    pub fn root(&self) -> PathBuf {
        self.temp.path().join("terra-helmfile")
    }

    /// Terra home.
    pub fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    /// Chart source tree.
    pub fn charts(&self) -> PathBuf {
        self.root().join("charts")
    }

    /// Default output directory.
    pub fn output(&self) -> PathBuf {
        self.home().join("output")
    }

    /// Resolved paths for library-level tests.
    pub fn config_repo(&self) -> ConfigRepo {
        ConfigRepo::at(&self.root(), &self.home())
    }

    pub fn write_environment(&self, name: &str, yaml: &str) {
        fs::write(self.root().join("environments").join(format!("{name}.yaml")), yaml)
            .expect("write environment");
    }

    pub fn write_cluster(&self, name: &str, yaml: &str) {
        fs::write(self.root().join("clusters").join(format!("{name}.yaml")), yaml)
            .expect("write cluster");
    }

    /// Write `$TERRA_HOME/config.toml`.
    pub fn write_config(&self, toml: &str) {
        fs::write(self.home().join("config.toml"), toml).expect("write config");
    }

    /// `terra` with its environment pointed at this repository.
    pub fn terra(&self) -> Command {
        let mut cmd = Command::cargo_bin("terra").expect("terra binary");
        cmd.env("TERRA_HOME", self.home())
            .env("TERRA_HELMFILE_ROOT", self.root())
            .env("TERRA_NO_PROGRESS", "1")
            .env_remove("TERRA_CONFIG")
            .env_remove("ARGOCD_APP_SOURCE_TARGET_REVISION")
            .env_remove("RUST_LOG");
        cmd
    }
}
