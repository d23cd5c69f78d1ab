//! Interactive front-end for HyperShift hosted-cluster infrastructure on AWS
//!
//! Two binaries share this library:
//!
//! - `infra` creates, destroys and lists cloud infrastructures. Each one is
//!   a directory under the configured `infra_dir` holding the artifacts the
//!   `hypershift` CLI produced for it.
//! - `cluster` renders hosted cluster manifests from those artifacts, applies
//!   them with `oc`, fetches kubeconfigs and deletes hosted clusters.
//!
//! All provisioning work is delegated to `hypershift`, `oc` and `git`; this
//! crate composes their command lines, tracks the artifacts on disk and asks
//! the operator for everything else.

pub mod cli;
pub mod commands;
pub mod composer;
pub mod config;
pub mod deps;
pub mod error;
pub mod registry;
pub mod release;
pub mod ui;

#[cfg(test)]
mod test_helpers;
