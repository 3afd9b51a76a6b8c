//! Chart, fleet, and fake-subprocess fixtures.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::constants::{CHART_MANIFEST, DEFAULT_CHART_REPO, HELMFILE_OUTPUT_PREFIX};
use crate::fleet::{Cluster, Destination, Environment, FleetState, Lifecycle, Release, ReleaseKind};
use crate::shell::{ShellCommand, ShellOutput};

/// Write `<source>/<name>/Chart.yaml` with `file://` dependencies on `local_deps`.
pub fn write_chart(source: &Path, name: &str, version: &str, local_deps: &[&str]) -> PathBuf {
    let dir = source.join(name);
    std::fs::create_dir_all(dir.join("templates")).expect("create chart dir");

    let mut manifest = format!("apiVersion: v2\nname: {name}\nversion: {version}\n");
    if !local_deps.is_empty() {
        manifest.push_str("dependencies:\n");
        for dep in local_deps {
            manifest.push_str(&format!(
                "  - name: {dep}\n    version: \">0.0.0\"\n    repository: \"file://../{dep}\"\n"
            ));
        }
    }
    std::fs::write(dir.join(CHART_MANIFEST), manifest).expect("write Chart.yaml");
    dir
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter().position(|a| a == flag).and_then(|i| args.get(i + 1)).map(String::as_str)
}

fn prefixed_value<'a>(args: &'a [String], prefix: &str) -> Option<&'a str> {
    args.iter().find_map(|a| a.strip_prefix(prefix))
}

/// Fake `helm fetch <repo>/<name> --version <v> --untar -d <dest>`: unpack a
/// minimal chart into `<dest>/<name>`. Other commands succeed untouched.
pub fn fake_helm_fetch(cmd: &ShellCommand) -> Result<ShellOutput> {
    let args = cmd.arguments();
    if args.first().map(String::as_str) != Some("fetch") {
        return Ok(ShellOutput::default());
    }

    let reference = args.get(1).context("fetch without chart reference")?;
    let name = reference.rsplit('/').next().unwrap_or(reference);
    let version = flag_value(args, "--version").unwrap_or("0.0.0");
    let dest = flag_value(args, "-d").context("fetch without -d")?;

    write_chart(Path::new(dest), name, version, &[]);
    Ok(ShellOutput::default())
}

/// Fake `helmfile ... template --output-dir=<dir>`: write one rendered chart
/// under a `helmfile-*` subdirectory the way helmfile does. The chart
/// directory is named after `Release.ChartName` from the state values file,
/// or `terra-argocd` when the state values carry no release chart.
pub fn fake_helmfile_template(cmd: &ShellCommand) -> Result<ShellOutput> {
    let args = cmd.arguments();
    if !args.iter().any(|a| a == "template") {
        return Ok(ShellOutput::default());
    }
    let Some(output_dir) = prefixed_value(args, "--output-dir=") else {
        return Ok(ShellOutput {
            stdout: "---\nkind: ConfigMap\n".to_string(),
            stderr: String::new(),
        });
    };

    let chart = prefixed_value(args, "--state-values-file=")
        .and_then(|path| std::fs::read_to_string(path).ok())
        .and_then(|content| serde_yaml::from_str::<serde_yaml::Value>(&content).ok())
        .and_then(|values| {
            values
                .get("Release")
                .and_then(|r| r.get("ChartName"))
                .and_then(|n| n.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| "terra-argocd".to_string());

    let rendered = Path::new(output_dir)
        .join(format!("{HELMFILE_OUTPUT_PREFIX}3f9a2c"))
        .join(&chart)
        .join("templates");
    std::fs::create_dir_all(&rendered)?;
    std::fs::write(rendered.join("deployment.yaml"), format!("kind: Deployment\nname: {chart}\n"))?;
    Ok(ShellOutput::default())
}

/// Programmatic [`FleetState`] builder.
#[derive(Debug, Default)]
pub struct FleetFixture {
    environments: Vec<Environment>,
    clusters: Vec<Cluster>,
    releases: Vec<Release>,
}

impl FleetFixture {
    /// Empty fixture.
    pub fn new() -> Self {
        Self::default()
    }

    /// An environment value on the `live` base.
    pub fn env(name: &str, lifecycle: Lifecycle) -> Environment {
        Environment {
            name: name.to_string(),
            base: "live".to_string(),
            namespace: format!("terra-{name}"),
            default_cluster: format!("terra-{name}"),
            lifecycle,
            template: None,
        }
    }

    /// An app release value.
    pub fn app(name: &str, env: &Environment, chart_version: &str, app_version: &str) -> Release {
        Release {
            name: name.to_string(),
            chart_name: name.to_string(),
            repo: DEFAULT_CHART_REPO.to_string(),
            chart_version: chart_version.to_string(),
            namespace: env.namespace.clone(),
            destination: Destination::Environment(env.clone()),
            kind: ReleaseKind::App {
                app_version: app_version.to_string(),
            },
        }
    }

    /// Add an environment.
    pub fn environment(self, name: &str, lifecycle: Lifecycle) -> Self {
        self.with_environment(Self::env(name, lifecycle))
    }

    /// Add a fully specified environment.
    pub fn with_environment(mut self, env: Environment) -> Self {
        self.environments.push(env);
        self
    }

    /// Add a cluster on the `terra` base.
    pub fn cluster(mut self, name: &str) -> Self {
        self.clusters.push(Cluster {
            name: name.to_string(),
            base: "terra".to_string(),
            project: format!("{name}-project"),
            location: "us-central1-a".to_string(),
            address: format!("https://{name}.example.com"),
        });
        self
    }

    /// Add an app release to an existing environment.
    pub fn app_release(mut self, env: &str, name: &str, chart_version: &str, app_version: &str) -> Self {
        let environment =
            self.environments.iter().find(|e| e.name == env).expect("environment added first");
        let release = Self::app(name, environment, chart_version, app_version);
        self.releases.push(release);
        self
    }

    /// Add a cluster release to an existing cluster.
    pub fn cluster_release(mut self, cluster: &str, name: &str, chart_version: &str) -> Self {
        let cluster = self.clusters.iter().find(|c| c.name == cluster).expect("cluster added first");
        let release = Release {
            name: name.to_string(),
            chart_name: name.to_string(),
            repo: DEFAULT_CHART_REPO.to_string(),
            chart_version: chart_version.to_string(),
            namespace: name.to_string(),
            destination: Destination::Cluster(cluster.clone()),
            kind: ReleaseKind::Cluster,
        };
        self.releases.push(release);
        self
    }

    /// Build the fleet.
    pub fn build(self) -> FleetState {
        FleetState::new(self.environments, self.clusters, self.releases).expect("valid fleet fixture")
    }

    /// A fleet shaped like a small Terra deployment:
    ///
    /// - `dev`: agora, buffer, cromwell, externalcreds, leonardo, rawls, sam, workspacemanager
    /// - `alpha`, `staging`, `prod`: datarepo, leonardo, sam
    /// - `swatomation` (template, bee): leonardo, sam
    /// - `fiab-funky`, `fiab-nerdy` (dynamic from swatomation): leonardo, sam
    /// - clusters `terra-dev` (yale, diskmanager) and `terra-prod` (yale)
    pub fn sample() -> FleetState {
        let mut fixture = Self::new();

        fixture = fixture.environment("dev", Lifecycle::Static);
        for name in [
            "agora",
            "buffer",
            "cromwell",
            "externalcreds",
            "leonardo",
            "rawls",
            "sam",
            "workspacemanager",
        ] {
            fixture = fixture.app_release("dev", name, "1.0.0", "dev-1");
        }

        for env in ["alpha", "staging", "prod"] {
            fixture = fixture
                .environment(env, Lifecycle::Static)
                .app_release(env, "datarepo", "2.0.0", "dr-1")
                .app_release(env, "leonardo", "1.0.0", "leo-1")
                .app_release(env, "sam", "1.0.0", "sam-1");
        }

        let bee = |name: &str, lifecycle: Lifecycle, template: Option<&str>| Environment {
            base: "bee".to_string(),
            template: template.map(str::to_string),
            ..Self::env(name, lifecycle)
        };
        fixture = fixture.with_environment(bee("swatomation", Lifecycle::Template, None));
        fixture = fixture.with_environment(bee("fiab-funky", Lifecycle::Dynamic, Some("swatomation")));
        fixture = fixture.with_environment(bee("fiab-nerdy", Lifecycle::Dynamic, Some("swatomation")));
        for env in ["swatomation", "fiab-funky", "fiab-nerdy"] {
            fixture = fixture
                .app_release(env, "leonardo", "1.0.0", "leo-bee")
                .app_release(env, "sam", "1.0.0", "sam-bee");
        }

        fixture
            .cluster("terra-dev")
            .cluster_release("terra-dev", "yale", "0.3.0")
            .cluster_release("terra-dev", "diskmanager", "0.1.0")
            .cluster("terra-prod")
            .cluster_release("terra-prod", "yale", "0.3.0")
            .build()
    }
}
