use std::sync::Arc;

use terra_cli::fleet::FleetState;
use terra_cli::render::{RenderOptions, Renderer};
use terra_cli::resolver::ResolverMode;
use terra_cli::selector::SelectorArgs;
use terra_cli::shell::ShellRunner;
use terra_cli::test_utils::{MockRunner, fake_helm_fetch, fake_helmfile_template};

use crate::common::TestRepo;

fn fake_runner() -> Arc<MockRunner> {
    Arc::new(MockRunner::with_handler(|cmd| {
        fake_helm_fetch(cmd)?;
        fake_helmfile_template(cmd)
    }))
}

fn renderer(repo: &TestRepo, options: RenderOptions, runner: &Arc<MockRunner>) -> Renderer {
    let runner: Arc<dyn ShellRunner> = Arc::clone(runner) as Arc<dyn ShellRunner>;
    Renderer::new(repo.config_repo(), options, runner)
}

fn options(repo: &TestRepo) -> RenderOptions {
    RenderOptions {
        output_dir: repo.output(),
        chart_source_dir: repo.charts(),
        show_progress: false,
        ..RenderOptions::default()
    }
}

fn args() -> SelectorArgs {
    SelectorArgs {
        parallel_workers: 1,
        ..SelectorArgs::default()
    }
}

#[test]
fn test_load_sample_fleet() {
    let repo = TestRepo::with_sample_fleet();
    let fleet = FleetState::load(&repo.root()).unwrap();

    let mut names: Vec<String> = fleet.releases().iter().map(|r| r.full_name()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "cromwell-dev",
            "datarepo-prod",
            "leonardo-dev",
            "leonardo-fiab-one",
            "leonardo-prod",
            "leonardo-swatomation",
            "sam-dev",
            "sam-prod",
            "yale-terra-dev",
        ]
    );
    assert!(fleet.environment("fiab-one").is_some());
    assert!(fleet.cluster("terra-dev").is_some());
}

#[tokio::test]
async fn test_render_environment_from_disk() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();

    let summary = renderer(&repo, options(&repo), &runner)
        .run(&SelectorArgs {
            environments: vec!["dev".into()],
            ..args()
        })
        .await
        .unwrap();

    assert_eq!(summary.jobs.len(), 3);
    for release in ["leonardo", "cromwell", "sam"] {
        let rendered = repo.output().join("dev").join(release).join(release);
        assert!(rendered.join("templates/deployment.yaml").exists(), "{release} not rendered");
    }
    assert!(!repo.output().join("prod").exists());

    let lines = runner.command_lines();
    assert_eq!(lines.first().map(String::as_str), Some("helmfile repos"));
    let templates = lines.iter().filter(|l| l.contains(" template ")).count();
    assert_eq!(templates, 3);
}

#[tokio::test]
async fn test_default_selection_skips_dynamic_environments() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();

    let summary = renderer(&repo, options(&repo), &runner)
        .run(&SelectorArgs {
            releases: vec!["leonardo".into()],
            ..args()
        })
        .await
        .unwrap();

    let mut jobs = summary.jobs.clone();
    jobs.sort();
    assert_eq!(jobs, vec!["leonardo in dev", "leonardo in prod", "leonardo in swatomation"]);
    assert!(!repo.output().join("fiab-one").exists());
}

#[tokio::test]
async fn test_dynamic_environment_selected_by_template() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();

    let summary = renderer(&repo, options(&repo), &runner)
        .run(&SelectorArgs {
            templates: vec!["swatomation".into()],
            ..args()
        })
        .await
        .unwrap();

    assert_eq!(summary.jobs, vec!["leonardo in fiab-one"]);
    assert!(repo.output().join("fiab-one/leonardo/leonardo").exists());
}

#[tokio::test]
async fn test_cluster_release_rendered() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();

    renderer(&repo, options(&repo), &runner)
        .run(&SelectorArgs {
            clusters: vec!["terra-dev".into()],
            ..args()
        })
        .await
        .unwrap();

    assert!(repo.output().join("terra-dev/yale/yale/templates/deployment.yaml").exists());
}

#[tokio::test]
async fn test_deploy_mode_fetches_each_chart_version_once() {
    let repo = TestRepo::with_sample_fleet();
    terra_cli::test_utils::write_chart(&repo.charts(), "sam", "9.9.9", &[]);
    let runner = fake_runner();

    renderer(
        &repo,
        RenderOptions {
            mode: ResolverMode::Deploy,
            parallel_workers: 3,
            ..options(&repo)
        },
        &runner,
    )
    .run(&SelectorArgs {
        releases: vec!["sam".into(), "leonardo".into()],
        environments: vec!["dev".into(), "prod".into()],
        parallel_workers: 3,
        ..args()
    })
    .await
    .unwrap();

    let lines = runner.command_lines();
    let fetches: Vec<&String> = lines.iter().filter(|l| l.starts_with("helm fetch")).collect();
    assert_eq!(fetches.len(), 2, "one fetch per chart version: {fetches:?}");
    assert!(fetches.iter().any(|l| l.contains("terra-helm/sam") && l.contains("3.0.0")));
    assert!(!lines.iter().any(|l| l.contains("dependency update")));
}

#[tokio::test]
async fn test_stdout_mode_writes_nothing() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();

    renderer(
        &repo,
        RenderOptions {
            stdout: true,
            ..options(&repo)
        },
        &runner,
    )
    .run(&SelectorArgs {
        exact_releases: vec!["leonardo-dev".into()],
        stdout: true,
        ..args()
    })
    .await
    .unwrap();

    assert!(!repo.output().join("dev").exists());
    let template = runner
        .command_lines()
        .into_iter()
        .find(|l| l.contains(" template "))
        .unwrap();
    assert!(!template.contains("--output-dir"));
}

#[tokio::test]
async fn test_release_failure_reported_with_description() {
    let repo = TestRepo::with_sample_fleet();
    let runner = Arc::new(MockRunner::failing_matching("helmfile --state-values-file", "boom"));

    let err = renderer(&repo, options(&repo), &runner)
        .run(&SelectorArgs {
            exact_releases: vec!["sam-prod".into()],
            ..args()
        })
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("sam in prod"), "{message}");
}

#[tokio::test]
async fn test_malformed_fleet_file() {
    let repo = TestRepo::with_sample_fleet();
    repo.write_environment("broken", "releases: [not, a, map]\n");
    let runner = fake_runner();

    let err = renderer(&repo, options(&repo), &runner).run(&args()).await.unwrap_err();

    assert!(format!("{err:#}").contains("broken.yaml"));
    assert!(runner.commands().is_empty());
}

#[tokio::test]
async fn test_output_dir_with_glob_characters() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();
    let output = repo.path().join("out[1]");

    renderer(
        &repo,
        RenderOptions {
            output_dir: output.clone(),
            ..options(&repo)
        },
        &runner,
    )
    .run(&SelectorArgs {
        exact_releases: vec!["sam-prod".into()],
        ..args()
    })
    .await
    .unwrap();

    assert!(output.join("prod/sam/sam/templates/deployment.yaml").exists());
}
