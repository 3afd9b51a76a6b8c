//! Manifest validation with kubeconform.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;

use super::options::ValidateMode;
use crate::core::TerraError;
use crate::shell::{ShellCommand, ShellRunner};

/// `<validator> -strict -summary -ignore-missing-schemas -kubernetes-version <v> <dir>`
pub fn validator_command(
    validator_bin: &str,
    kube_version: &str,
    dir: &Path,
    timeout: Option<Duration>,
) -> ShellCommand {
    ShellCommand::new(validator_bin)
        .args([
            "-strict".to_string(),
            "-summary".to_string(),
            "-ignore-missing-schemas".to_string(),
            "-kubernetes-version".to_string(),
            kube_version.to_string(),
            dir.display().to_string(),
        ])
        .with_timeout(timeout)
}

/// Validate the manifests under `dir` according to `mode`.
///
/// In [`ValidateMode::Warn`] failures are logged and swallowed; in
/// [`ValidateMode::Fail`] they become [`TerraError::ValidationFailed`].
pub async fn validate_output(
    runner: &dyn ShellRunner,
    command: ShellCommand,
    dir: &Path,
    mode: ValidateMode,
) -> Result<()> {
    if mode == ValidateMode::Skip {
        return Ok(());
    }

    let Err(err) = runner.run(command).await else {
        tracing::debug!(target: "render", "Validated {}", dir.display());
        return Ok(());
    };

    let reason = match err.downcast_ref::<TerraError>() {
        Some(TerraError::CommandFailed {
            stderr,
            ..
        }) => stderr.clone(),
        _ => format!("{err:#}"),
    };

    match mode {
        ValidateMode::Fail => Err(TerraError::ValidationFailed {
            dir: dir.display().to_string(),
            reason,
        }
        .into()),
        _ => {
            tracing::warn!(target: "render", "Validation failed for {}: {}", dir.display(), reason);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockRunner;

    fn command() -> ShellCommand {
        validator_command("kubeconform", "1.25.0", Path::new("/out/dev/sam"), None)
    }

    #[test]
    fn test_validator_args() {
        assert_eq!(
            command().display(),
            "kubeconform -strict -summary -ignore-missing-schemas -kubernetes-version 1.25.0 /out/dev/sam"
        );
    }

    #[tokio::test]
    async fn test_skip_runs_nothing() {
        let runner = MockRunner::failing("bad");
        validate_output(&runner, command(), Path::new("/out"), ValidateMode::Skip).await.unwrap();
        assert!(runner.commands().is_empty());
    }

    #[tokio::test]
    async fn test_warn_swallows_failure() {
        let runner = MockRunner::failing("Deployment is invalid");
        validate_output(&runner, command(), Path::new("/out"), ValidateMode::Warn).await.unwrap();
        assert_eq!(runner.commands().len(), 1);
    }

    #[tokio::test]
    async fn test_fail_surfaces_reason() {
        let runner = MockRunner::failing("Deployment is invalid");
        let err = validate_output(&runner, command(), Path::new("/out"), ValidateMode::Fail)
            .await
            .unwrap_err();
        match err.downcast_ref::<TerraError>() {
            Some(TerraError::ValidationFailed {
                reason,
                ..
            }) => assert_eq!(reason, "Deployment is invalid"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
