use std::path::Path;
use std::sync::Arc;

use terra_cli::render::{RenderOptions, Renderer};
use terra_cli::selector::SelectorArgs;
use terra_cli::shell::ShellRunner;
use terra_cli::test_utils::{MockRunner, fake_helm_fetch, fake_helmfile_template, write_chart};

use crate::common::TestRepo;

fn run_renderer(repo: &TestRepo, runner: &Arc<MockRunner>, workers: usize) -> Renderer {
    let runner: Arc<dyn ShellRunner> = Arc::clone(runner) as Arc<dyn ShellRunner>;
    Renderer::new(
        repo.config_repo(),
        RenderOptions {
            output_dir: repo.output(),
            chart_source_dir: repo.charts(),
            parallel_workers: workers,
            show_progress: false,
            ..RenderOptions::default()
        },
        runner,
    )
}

/// Chart directory names passed to `helm dependency update`, in call order.
fn updated_charts(runner: &MockRunner) -> Vec<String> {
    runner
        .commands()
        .iter()
        .filter(|c| c.display().contains("dependency update"))
        .filter_map(|c| c.dir_path().and_then(Path::file_name))
        .map(|n| n.to_string_lossy().into_owned())
        .collect()
}

fn position(list: &[String], name: &str) -> usize {
    list.iter().position(|n| n == name).unwrap_or_else(|| panic!("{name} not in {list:?}"))
}

#[tokio::test]
async fn test_shared_dependency_updated_once_before_dependents() {
    let repo = TestRepo::with_sample_fleet();
    write_chart(&repo.charts(), "terra-lib", "0.1.0", &[]);
    write_chart(&repo.charts(), "leonardo", "1.0.0", &["terra-lib"]);
    write_chart(&repo.charts(), "cromwell", "2.0.0", &["terra-lib"]);
    let runner = Arc::new(MockRunner::with_handler(|cmd| {
        fake_helm_fetch(cmd)?;
        fake_helmfile_template(cmd)
    }));

    let summary = run_renderer(&repo, &runner, 3)
        .run(&SelectorArgs {
            environments: vec!["dev".into()],
            parallel_workers: 3,
            ..SelectorArgs::default()
        })
        .await
        .unwrap();
    assert_eq!(summary.jobs.len(), 3);

    let updated = updated_charts(&runner);
    assert_eq!(updated.iter().filter(|n| *n == "terra-lib").count(), 1, "{updated:?}");
    assert!(position(&updated, "terra-lib") < position(&updated, "leonardo"));
    assert!(position(&updated, "terra-lib") < position(&updated, "cromwell"));
    assert!(!updated.contains(&"sam".to_string()));

    // sam has no source chart, so it comes from the repository
    let lines = runner.command_lines();
    assert!(lines.iter().any(|l| l.starts_with("helm fetch terra-helm/sam")));
}

#[tokio::test]
async fn test_local_chart_cycle_fails_render() {
    let repo = TestRepo::with_sample_fleet();
    write_chart(&repo.charts(), "leonardo", "1.0.0", &["terra-lib"]);
    write_chart(&repo.charts(), "terra-lib", "0.1.0", &["leonardo"]);
    let runner = Arc::new(MockRunner::with_handler(|cmd| {
        fake_helm_fetch(cmd)?;
        fake_helmfile_template(cmd)
    }));

    let err = run_renderer(&repo, &runner, 1)
        .run(&SelectorArgs {
            exact_releases: vec!["leonardo-dev".into()],
            parallel_workers: 1,
            ..SelectorArgs::default()
        })
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("leonardo in dev"), "{message}");
    assert!(message.contains("cycle detected"), "{message}");
    assert!(updated_charts(&runner).is_empty());
}

#[tokio::test]
async fn test_dependency_update_failure_names_chart() {
    let repo = TestRepo::with_sample_fleet();
    write_chart(&repo.charts(), "cromwell", "2.0.0", &[]);
    let runner = Arc::new(MockRunner::failing_matching("helm dependency update", "no repo"));

    let err = run_renderer(&repo, &runner, 1)
        .run(&SelectorArgs {
            exact_releases: vec!["cromwell-dev".into()],
            parallel_workers: 1,
            ..SelectorArgs::default()
        })
        .await
        .unwrap_err();

    let message = format!("{err:#}");
    assert!(message.contains("cromwell"), "{message}");
    assert!(!repo.output().join("dev/cromwell/cromwell").exists());
}
