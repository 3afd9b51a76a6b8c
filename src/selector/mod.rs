//! Release selection: turning render flags into the set of releases to render.
//!
//! Flags map onto [`Filter`] primitives. Values within one flag are unioned
//! (`-e dev -e prod` selects either), and different flags intersect
//! (`-r leonardo -e dev` selects leonardo in dev). Without any destination
//! flag, dynamic environments are excluded.
//!
//! Every validation problem is a [`TerraError::SelectorError`] and is raised
//! before any rendering work starts.

pub mod filter;

pub use filter::Filter;

use std::collections::HashSet;
use std::path::PathBuf;

use anyhow::Result;

use crate::constants::{ALL_RELEASES, SUGGESTION_THRESHOLD};
use crate::core::TerraError;
use crate::fleet::{DestinationType, FleetState, Lifecycle, Release};

/// Selector-relevant render flags.
#[derive(Debug, Clone, Default)]
pub struct SelectorArgs {
    /// Positional release argument (a release name or `ALL`)
    pub positional: Option<String>,
    /// `--release`
    pub releases: Vec<String>,
    /// `--environment`
    pub environments: Vec<String>,
    /// `--cluster`
    pub clusters: Vec<String>,
    /// `--destination-type`
    pub destination_types: Vec<String>,
    /// `--destination-base`
    pub destination_bases: Vec<String>,
    /// `--environment-lifecycle`
    pub lifecycles: Vec<String>,
    /// `--environment-template`
    pub templates: Vec<String>,
    /// `--exact-release`
    pub exact_releases: Vec<String>,
    /// `--exit-zero-no-matching-releases`
    pub exit_zero_no_matching: bool,

    /// `--chart-version` (single chart only)
    pub chart_version: Option<String>,
    /// `--app-version` (single chart only)
    pub app_version: Option<String>,
    /// `--values-file` (single chart only)
    pub values_files: Vec<PathBuf>,
    /// `--chart-dir`
    pub chart_dir: Option<PathBuf>,

    /// `--stdout`
    pub stdout: bool,
    /// `--output-dir`, when given explicitly
    pub output_dir: Option<PathBuf>,
    /// `--parallel-workers`
    pub parallel_workers: usize,
}

/// The releases a render run targets.
#[derive(Debug, Clone, Default)]
pub struct RenderSelection {
    /// Selected releases, ordered by destination then name
    pub releases: Vec<Release>,
    /// At least one release name was given (`--release` or positional)
    pub is_release_scoped: bool,
    /// All selected releases share one chart
    pub single_chart: bool,
}

impl RenderSelection {
    /// Returns `true` if nothing matched.
    pub fn is_empty(&self) -> bool {
        self.releases.is_empty()
    }
}

/// Validate `args` against `fleet` and select matching releases.
///
/// # Errors
///
/// Returns [`TerraError::SelectorError`] for unknown names or values,
/// conflicting flags, single-chart flags on a multi-chart selection, and an
/// empty selection unless `exit_zero_no_matching` is set.
pub fn select(fleet: &FleetState, args: &SelectorArgs) -> Result<RenderSelection> {
    validate_flag_combinations(args)?;

    let names = release_names(args);
    let filter = build_filter(fleet, args, &names)?;

    let releases: Vec<Release> = filter.apply(fleet.releases()).into_iter().cloned().collect();
    tracing::debug!(target: "selector", "Filter {:?} matched {} releases", filter, releases.len());

    let chart_names: HashSet<&str> = releases.iter().map(|r| r.chart_name.as_str()).collect();
    let selection = RenderSelection {
        is_release_scoped: !names.is_empty(),
        single_chart: chart_names.len() == 1,
        releases,
    };

    if selection.is_empty() {
        if args.exit_zero_no_matching {
            tracing::warn!(target: "selector", "No releases matched the given selectors");
            return Ok(selection);
        }
        return Err(TerraError::selector(
            "no releases matched the given selectors (use --exit-zero-no-matching-releases to allow this)",
        )
        .into());
    }

    if !selection.single_chart {
        validate_single_chart_flags(args)?;
    }

    Ok(selection)
}

/// Release names from `--release` and the positional argument, excluding `ALL`.
fn release_names(args: &SelectorArgs) -> Vec<String> {
    args.positional
        .iter()
        .filter(|p| p.as_str() != ALL_RELEASES)
        .chain(args.releases.iter())
        .cloned()
        .collect()
}

fn validate_flag_combinations(args: &SelectorArgs) -> Result<()> {
    let conflict = |message: &str| Err(TerraError::selector(message).into());

    if args.stdout && args.output_dir.is_some() {
        return conflict("--stdout cannot be used with --output-dir");
    }
    if args.stdout && args.parallel_workers > 1 {
        return conflict("--parallel-workers cannot be greater than 1 with --stdout");
    }
    if args.positional.is_some() && !args.releases.is_empty() {
        return conflict("a positional release argument cannot be used with --release");
    }
    if !args.environments.is_empty() && !args.templates.is_empty() {
        return conflict("--environment cannot be used with --environment-template");
    }
    if !args.exact_releases.is_empty() {
        if args.positional.as_deref() == Some(ALL_RELEASES) {
            return conflict("--exact-release cannot be used with ALL");
        }
        if args.positional.is_some() || !args.releases.is_empty() {
            return conflict("--exact-release cannot be used with release names");
        }
    }
    if args.chart_dir.is_some() && args.chart_version.is_some() {
        return conflict("--chart-dir cannot be used with --chart-version");
    }
    Ok(())
}

fn validate_single_chart_flags(args: &SelectorArgs) -> Result<()> {
    let flag = if args.chart_version.is_some() {
        Some("--chart-version")
    } else if args.app_version.is_some() {
        Some("--app-version")
    } else if !args.values_files.is_empty() {
        Some("--values-file")
    } else {
        None
    };

    match flag {
        Some(flag) => Err(TerraError::selector(format!(
            "{flag} cannot be used with selectors that match multiple charts"
        ))
        .into()),
        None => Ok(()),
    }
}

fn has_destination_flags(args: &SelectorArgs) -> bool {
    !args.environments.is_empty()
        || !args.clusters.is_empty()
        || !args.destination_types.is_empty()
        || !args.destination_bases.is_empty()
        || !args.lifecycles.is_empty()
        || !args.templates.is_empty()
        || !args.exact_releases.is_empty()
}

fn build_filter(fleet: &FleetState, args: &SelectorArgs, names: &[String]) -> Result<Filter> {
    let mut filter = Filter::Any;

    if !names.is_empty() {
        check_known("release", names, fleet.release_names())?;
        filter = filter.and(Filter::Name(names.iter().cloned().collect()));
    }

    if !args.environments.is_empty() || !args.clusters.is_empty() {
        check_known(
            "environment",
            &args.environments,
            fleet.environments().map(|e| e.name.as_str()).collect(),
        )?;
        check_known("cluster", &args.clusters, fleet.clusters().map(|c| c.name.as_str()).collect())?;

        // -e and -c both name destinations, so they union rather than intersect
        let destinations = args.environments.iter().chain(&args.clusters).cloned().collect();
        filter = filter.and(Filter::DestinationName(destinations));
    }

    if !args.destination_types.is_empty() {
        let types = args
            .destination_types
            .iter()
            .map(|t| t.parse::<DestinationType>())
            .collect::<Result<HashSet<_>, _>>()?;
        filter = filter.and(Filter::DestinationType(types));
    }

    if !args.destination_bases.is_empty() {
        let mut bases: Vec<&str> = fleet
            .environments()
            .map(|e| e.base.as_str())
            .chain(fleet.clusters().map(|c| c.base.as_str()))
            .collect();
        bases.sort_unstable();
        bases.dedup();
        check_known("destination base", &args.destination_bases, bases)?;
        filter = filter.and(Filter::DestinationBase(args.destination_bases.iter().cloned().collect()));
    }

    if !args.lifecycles.is_empty() {
        let lifecycles = args
            .lifecycles
            .iter()
            .map(|l| l.parse::<Lifecycle>())
            .collect::<Result<HashSet<_>, _>>()?;
        filter = filter.and(Filter::EnvironmentLifecycle(lifecycles));
    }

    if !args.templates.is_empty() {
        let templates: Vec<&str> = fleet
            .environments()
            .filter(|e| e.lifecycle == Lifecycle::Template)
            .map(|e| e.name.as_str())
            .collect();
        check_known("environment template", &args.templates, templates)?;
        filter = filter.and(Filter::EnvironmentTemplate(args.templates.iter().cloned().collect()));
    }

    if !args.exact_releases.is_empty() {
        let full_names: Vec<String> = fleet.releases().iter().map(Release::full_name).collect();
        check_known(
            "release",
            &args.exact_releases,
            full_names.iter().map(String::as_str).collect(),
        )?;
        filter = filter.and(Filter::ExactFullName(args.exact_releases.iter().cloned().collect()));
    }

    if !has_destination_flags(args) {
        filter = filter.and(Filter::default_destinations());
    }

    Ok(filter)
}

/// Fail with a did-you-mean suggestion if any of `given` is not in `known`.
fn check_known(kind: &str, given: &[String], known: Vec<&str>) -> Result<()> {
    let unknown: Vec<&String> = given.iter().filter(|g| !known.contains(&g.as_str())).collect();
    match unknown.as_slice() {
        [] => Ok(()),
        [single] => Err(TerraError::SelectorError {
            message: format!("unknown {kind} {single:?}"),
            suggestion: closest_match(single, &known),
        }
        .into()),
        many => Err(TerraError::selector(format!(
            "unknown {kind}s: {}",
            many.iter().map(|m| format!("{m:?}")).collect::<Vec<_>>().join(", ")
        ))
        .into()),
    }
}

/// The most similar known name, if it is similar enough.
pub fn closest_match(name: &str, known: &[&str]) -> Option<String> {
    known
        .iter()
        .map(|k| (*k, strsim::jaro_winkler(name, k)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(k, _)| k.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FleetFixture;

    fn args() -> SelectorArgs {
        SelectorArgs {
            parallel_workers: 1,
            ..SelectorArgs::default()
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn full_names(selection: &RenderSelection) -> Vec<String> {
        let mut names: Vec<String> = selection.releases.iter().map(Release::full_name).collect();
        names.sort();
        names
    }

    fn selector_message(err: &anyhow::Error) -> String {
        match err.downcast_ref::<TerraError>() {
            Some(TerraError::SelectorError {
                message,
                ..
            }) => message.clone(),
            other => panic!("expected selector error, got {other:?}"),
        }
    }

    #[test]
    fn test_release_across_environments() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                releases: strings(&["datarepo"]),
                ..args()
            },
        )
        .unwrap();

        assert_eq!(full_names(&selection), vec!["datarepo-alpha", "datarepo-prod", "datarepo-staging"]);
        assert!(selection.is_release_scoped);
        assert!(selection.single_chart);
    }

    #[test]
    fn test_all_in_environment() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                positional: Some("ALL".into()),
                environments: strings(&["dev"]),
                ..args()
            },
        )
        .unwrap();

        let names: Vec<&str> = selection.releases.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "agora",
                "buffer",
                "cromwell",
                "externalcreds",
                "leonardo",
                "rawls",
                "sam",
                "workspacemanager"
            ]
        );
        assert!(!selection.is_release_scoped);
        assert!(!selection.single_chart);
    }

    #[test]
    fn test_app_version_rejected_for_multiple_charts() {
        let fleet = FleetFixture::sample();
        let err = select(
            &fleet,
            &SelectorArgs {
                releases: strings(&["leonardo", "cromwell"]),
                app_version: Some("1.0.0".into()),
                ..args()
            },
        )
        .unwrap_err();
        assert!(selector_message(&err).contains("cannot be used with selectors that match multiple charts"));
    }

    #[test]
    fn test_chart_version_allowed_for_single_chart() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                releases: strings(&["leonardo"]),
                chart_version: Some("1.2.3".into()),
                ..args()
            },
        )
        .unwrap();
        assert!(selection.single_chart);
        assert_eq!(selection.releases.len(), 5);
    }

    #[test]
    fn test_stdout_with_output_dir() {
        let fleet = FleetFixture::sample();
        let err = select(
            &fleet,
            &SelectorArgs {
                stdout: true,
                output_dir: Some("/tmp/out".into()),
                ..args()
            },
        )
        .unwrap_err();
        assert_eq!(selector_message(&err), "--stdout cannot be used with --output-dir");
    }

    #[test]
    fn test_stdout_with_parallel_workers() {
        let fleet = FleetFixture::sample();
        let err = select(
            &fleet,
            &SelectorArgs {
                stdout: true,
                parallel_workers: 4,
                ..args()
            },
        )
        .unwrap_err();
        assert!(selector_message(&err).contains("--parallel-workers"));
    }

    #[test]
    fn test_exact_release() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                exact_releases: strings(&["leonardo-dev"]),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(full_names(&selection), vec!["leonardo-dev"]);
        assert!(!selection.is_release_scoped);
    }

    #[test]
    fn test_exact_release_with_all() {
        let fleet = FleetFixture::sample();
        let err = select(
            &fleet,
            &SelectorArgs {
                positional: Some("ALL".into()),
                exact_releases: strings(&["leonardo-dev"]),
                ..args()
            },
        )
        .unwrap_err();
        assert_eq!(selector_message(&err), "--exact-release cannot be used with ALL");
    }

    #[test]
    fn test_exact_release_reaches_dynamic_environment() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                exact_releases: strings(&["sam-fiab-funky"]),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(full_names(&selection), vec!["sam-fiab-funky"]);
    }

    #[test]
    fn test_default_excludes_dynamic() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                releases: strings(&["sam"]),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(
            full_names(&selection),
            vec!["sam-alpha", "sam-dev", "sam-prod", "sam-staging", "sam-swatomation"]
        );
    }

    #[test]
    fn test_lifecycle_selects_dynamic() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                releases: strings(&["sam"]),
                lifecycles: strings(&["dynamic"]),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(full_names(&selection), vec!["sam-fiab-funky", "sam-fiab-nerdy"]);
    }

    #[test]
    fn test_environment_template() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                positional: Some("leonardo".into()),
                templates: strings(&["swatomation"]),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(full_names(&selection), vec!["leonardo-fiab-funky", "leonardo-fiab-nerdy"]);
    }

    #[test]
    fn test_environment_and_cluster_union() {
        let fleet = FleetFixture::sample();
        let selection = select(
            &fleet,
            &SelectorArgs {
                environments: strings(&["prod"]),
                clusters: strings(&["terra-prod"]),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(
            full_names(&selection),
            vec!["datarepo-prod", "leonardo-prod", "sam-prod", "yale-terra-prod"]
        );
    }

    #[test]
    fn test_destination_type_and_base() {
        let fleet = FleetFixture::sample();
        let clusters = select(
            &fleet,
            &SelectorArgs {
                destination_types: strings(&["cluster"]),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(full_names(&clusters), vec!["diskmanager-terra-dev", "yale-terra-dev", "yale-terra-prod"]);

        let bee = select(
            &fleet,
            &SelectorArgs {
                destination_bases: strings(&["bee"]),
                releases: strings(&["leonardo"]),
                ..args()
            },
        )
        .unwrap();
        assert_eq!(
            full_names(&bee),
            vec!["leonardo-fiab-funky", "leonardo-fiab-nerdy", "leonardo-swatomation"]
        );
    }

    #[test]
    fn test_unknown_release_suggests_closest() {
        let fleet = FleetFixture::sample();
        let err = select(
            &fleet,
            &SelectorArgs {
                releases: strings(&["leonard"]),
                ..args()
            },
        )
        .unwrap_err();
        match err.downcast_ref::<TerraError>() {
            Some(TerraError::SelectorError {
                message,
                suggestion,
            }) => {
                assert_eq!(message, "unknown release \"leonard\"");
                assert_eq!(suggestion.as_deref(), Some("leonardo"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unknown_values() {
        let fleet = FleetFixture::sample();
        let cases = [
            SelectorArgs {
                environments: strings(&["nowhere"]),
                ..args()
            },
            SelectorArgs {
                clusters: strings(&["terra-mars"]),
                ..args()
            },
            SelectorArgs {
                destination_types: strings(&["galaxy"]),
                ..args()
            },
            SelectorArgs {
                lifecycles: strings(&["forever"]),
                ..args()
            },
            SelectorArgs {
                templates: strings(&["dev"]),
                ..args()
            },
        ];
        for case in cases {
            let err = select(&fleet, &case).unwrap_err();
            assert!(selector_message(&err).starts_with("unknown"), "{case:?}");
        }
    }

    #[test]
    fn test_mutually_exclusive_flags() {
        let fleet = FleetFixture::sample();
        let positional_and_release = SelectorArgs {
            positional: Some("sam".into()),
            releases: strings(&["leonardo"]),
            ..args()
        };
        assert!(select(&fleet, &positional_and_release).is_err());

        let env_and_template = SelectorArgs {
            environments: strings(&["dev"]),
            templates: strings(&["swatomation"]),
            ..args()
        };
        assert!(select(&fleet, &env_and_template).is_err());

        let chart_dir_and_version = SelectorArgs {
            releases: strings(&["sam"]),
            chart_dir: Some("/charts".into()),
            chart_version: Some("1.0.0".into()),
            ..args()
        };
        assert!(select(&fleet, &chart_dir_and_version).is_err());
    }

    #[test]
    fn test_empty_selection() {
        let fleet = FleetFixture::sample();
        let no_match = SelectorArgs {
            releases: strings(&["datarepo"]),
            environments: strings(&["dev"]),
            ..args()
        };
        let err = select(&fleet, &no_match).unwrap_err();
        assert!(selector_message(&err).starts_with("no releases matched"));

        let allowed = SelectorArgs {
            exit_zero_no_matching: true,
            ..no_match
        };
        assert!(select(&fleet, &allowed).unwrap().is_empty());
    }

    #[test]
    fn test_closest_match_threshold() {
        assert_eq!(closest_match("leonrdo", &["leonardo", "sam"]), Some("leonardo".to_string()));
        assert_eq!(closest_match("xyz", &["leonardo", "sam"]), None);
    }
}
