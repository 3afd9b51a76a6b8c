//! Release filter algebra.
//!
//! A [`Filter`] is a predicate over [`Release`]s built from primitives
//! (name, destination type, destination name, ...) and combined with
//! [`Filter::and`] and [`Filter::or`].

use std::collections::HashSet;

use crate::fleet::{DestinationType, Lifecycle, Release};

/// A predicate over releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// Matches every release
    Any,
    /// Release name is in the set
    Name(HashSet<String>),
    /// Destination is of one of the given types
    DestinationType(HashSet<DestinationType>),
    /// Destination name is in the set
    DestinationName(HashSet<String>),
    /// Destination configuration base is in the set
    DestinationBase(HashSet<String>),
    /// Destination is an environment with one of the given lifecycles
    EnvironmentLifecycle(HashSet<Lifecycle>),
    /// Destination is an environment created from one of the given templates
    EnvironmentTemplate(HashSet<String>),
    /// `<name>-<destination>` is in the set
    ExactFullName(HashSet<String>),
    /// All inner filters match
    And(Vec<Filter>),
    /// At least one inner filter matches
    Or(Vec<Filter>),
}

impl Filter {
    /// Conjunction of `self` and `other`, flattening nested `And`s.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Any, f) | (f, Self::Any) => f,
            (Self::And(mut a), Self::And(b)) => {
                a.extend(b);
                Self::And(a)
            }
            (Self::And(mut a), f) => {
                a.push(f);
                Self::And(a)
            }
            (f, g) => Self::And(vec![f, g]),
        }
    }

    /// Disjunction of `self` and `other`.
    pub fn or(self, other: Self) -> Self {
        match (self, other) {
            (Self::Or(mut a), f) => {
                a.push(f);
                Self::Or(a)
            }
            (f, g) => Self::Or(vec![f, g]),
        }
    }

    /// Releases to clusters, or to static and template environments.
    ///
    /// Dynamic environments are short-lived and only rendered when selected
    /// explicitly.
    pub fn default_destinations() -> Self {
        Self::DestinationType(HashSet::from([DestinationType::Cluster])).or(
            Self::EnvironmentLifecycle(HashSet::from([Lifecycle::Static, Lifecycle::Template])),
        )
    }

    /// Returns `true` if `release` satisfies the filter.
    pub fn matches(&self, release: &Release) -> bool {
        let destination = &release.destination;
        match self {
            Self::Any => true,
            Self::Name(names) => names.contains(&release.name),
            Self::DestinationType(types) => types.contains(&destination.destination_type()),
            Self::DestinationName(names) => names.contains(destination.name()),
            Self::DestinationBase(bases) => bases.contains(destination.base()),
            Self::EnvironmentLifecycle(lifecycles) => {
                destination.as_environment().is_some_and(|e| lifecycles.contains(&e.lifecycle))
            }
            Self::EnvironmentTemplate(templates) => destination
                .as_environment()
                .and_then(|e| e.template.as_ref())
                .is_some_and(|t| templates.contains(t)),
            Self::ExactFullName(names) => names.contains(&release.full_name()),
            Self::And(filters) => filters.iter().all(|f| f.matches(release)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(release)),
        }
    }

    /// Releases in `releases` matching the filter, in order.
    pub fn apply<'a>(&self, releases: &'a [Release]) -> Vec<&'a Release> {
        releases.iter().filter(|r| self.matches(r)).collect()
    }
}
