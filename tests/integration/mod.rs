//! Integration tests for terra
//!
//! Modules:
//! - `fleet_render`: fleet YAML on disk through to rendered output
//! - `local_charts`: development-mode dependency updates across jobs
//! - `argocd`: ArgoCD app and project jobs
//! - `cli`: the `terra` binary's argument validation and error reporting

#[path = "../common/mod.rs"]
mod common;

mod argocd;
mod cli;
mod fleet_render;
mod local_charts;
