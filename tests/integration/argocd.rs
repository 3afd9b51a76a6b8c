use std::sync::Arc;

use terra_cli::render::{RenderOptions, Renderer, Scope};
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

fn renderer(repo: &TestRepo, runner: &Arc<MockRunner>, scope: Option<Scope>) -> Renderer {
    let runner: Arc<dyn ShellRunner> = Arc::clone(runner) as Arc<dyn ShellRunner>;
    Renderer::new(
        repo.config_repo(),
        RenderOptions {
            output_dir: repo.output(),
            chart_source_dir: repo.charts(),
            argocd: true,
            scope,
            show_progress: false,
            ..RenderOptions::default()
        },
        runner,
    )
}

fn dev_args() -> SelectorArgs {
    SelectorArgs {
        environments: vec!["dev".into()],
        parallel_workers: 1,
        ..SelectorArgs::default()
    }
}

#[tokio::test]
async fn test_argocd_environment_render() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();

    let summary = renderer(&repo, &runner, None).run(&dev_args()).await.unwrap();

    // 3 releases, 3 apps, 1 project
    assert_eq!(summary.jobs.len(), 7, "{:?}", summary.jobs);
    let dev = repo.output().join("dev");
    for release in ["leonardo", "cromwell", "sam"] {
        assert!(dev.join(release).join(release).exists());
        assert!(dev.join(format!("terra-argocd-app-{release}")).join(release).exists());
    }
    assert!(dev.join("terra-argocd-project/terra-argocd").exists());

    let argocd_dirs: Vec<_> = runner
        .commands()
        .iter()
        .filter(|c| c.display().contains(" template "))
        .filter_map(|c| c.dir_path().map(std::path::Path::to_path_buf))
        .filter(|d| d.starts_with(repo.root().join("argocd")))
        .collect();
    assert_eq!(argocd_dirs.len(), 4);
}

#[tokio::test]
async fn test_release_scope_skips_project() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();

    let summary = renderer(&repo, &runner, Some(Scope::Release)).run(&dev_args()).await.unwrap();

    assert_eq!(summary.jobs.len(), 6);
    assert!(!repo.output().join("dev/terra-argocd-project").exists());
}

#[tokio::test]
async fn test_destination_scope_renders_only_projects() {
    let repo = TestRepo::with_sample_fleet();
    let runner = fake_runner();

    let summary = renderer(&repo, &runner, Some(Scope::Destination))
        .run(&SelectorArgs {
            environments: vec!["dev".into(), "prod".into()],
            parallel_workers: 1,
            ..SelectorArgs::default()
        })
        .await
        .unwrap();

    let mut jobs = summary.jobs.clone();
    jobs.sort();
    assert_eq!(jobs, vec!["argocd project for dev", "argocd project for prod"]);
    assert!(!repo.output().join("dev/leonardo").exists());
    assert!(repo.output().join("prod/terra-argocd-project/terra-argocd").exists());
}
