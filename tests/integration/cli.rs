use predicates::prelude::*;

use crate::common::TestRepo;

#[test]
fn test_help_lists_render() {
    let repo = TestRepo::new();
    repo.terra()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("render"));
}

#[test]
fn test_render_help_lists_selectors() {
    let repo = TestRepo::new();
    repo.terra()
        .args(["render", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--environment"))
        .stdout(predicate::str::contains("--exact-release"))
        .stdout(predicate::str::contains("--parallel-workers"));
}

#[test]
fn test_stdout_with_output_dir_rejected() {
    let repo = TestRepo::with_sample_fleet();
    let out = repo.path().join("elsewhere");
    repo.terra()
        .args(["render", "--stdout", "-d"])
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("--stdout cannot be used with --output-dir"));
    assert!(!out.exists());
}

#[test]
fn test_unknown_release_suggests_closest() {
    let repo = TestRepo::with_sample_fleet();
    repo.terra()
        .args(["render", "-r", "leonard"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown release \"leonard\""))
        .stderr(predicate::str::contains("Did you mean 'leonardo'?"));
}

#[test]
fn test_single_chart_flag_with_many_charts() {
    let repo = TestRepo::with_sample_fleet();
    repo.terra()
        .args(["render", "-r", "leonardo,sam", "--app-version", "1.2.3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "--app-version cannot be used with selectors that match multiple charts",
        ));
}

#[test]
fn test_empty_selection() {
    let repo = TestRepo::with_sample_fleet();
    repo.terra()
        .args(["render", "-r", "datarepo", "-e", "dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no releases matched"));

    repo.terra()
        .args(["render", "-r", "datarepo", "-e", "dev", "--exit-zero-no-matching-releases"])
        .assert()
        .success()
        .stderr(predicate::str::contains("nothing rendered"));
}

#[test]
fn test_missing_helmfile_reported() {
    let repo = TestRepo::with_sample_fleet();
    repo.write_config("helmfile_bin = \"terra-test-helmfile-missing\"\n");
    repo.terra()
        .args(["render", "--exact-release", "leonardo-dev"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("terra-test-helmfile-missing is not installed"));
}

#[test]
fn test_invalid_config_reported() {
    let repo = TestRepo::with_sample_fleet();
    repo.write_config("no_such_setting = true\n");
    repo.terra()
        .args(["render", "-r", "leonardo"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn test_invalid_mode_rejected_by_parser() {
    let repo = TestRepo::new();
    repo.terra()
        .args(["render", "--mode", "production"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'production'"));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    let repo = TestRepo::new();
    repo.terra().args(["-q", "-v", "render"]).assert().failure();
}
