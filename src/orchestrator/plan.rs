//! Per-package traversal decisions.
//!
//! Whether a package is skipped, passed over on the way to the checkpoint,
//! filtered out or executed depends only on the skip set, the name prefix and
//! the loaded checkpoint; never on how earlier pipelines went. The decisions
//! are therefore computed up front and shared by `regen run` and `regen list`.

use serde::Serialize;
use std::path::Path;

use crate::orchestrator::PackageDirectory;
use crate::skip::SkipSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "decision")]
pub enum Decision {
    /// Listed in the skip set.
    SkipExplicit,
    /// Before the checkpoint; `announce` when the name passes the filter.
    PreCheckpoint { announce: bool },
    /// The checkpoint directory itself. Execution resumes after it.
    Checkpoint { announce: bool },
    /// Name does not start with the package prefix.
    Filtered,
    Run,
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::SkipExplicit => "skip",
            Decision::PreCheckpoint { .. } => "done",
            Decision::Checkpoint { .. } => "checkpoint",
            Decision::Filtered => "filtered",
            Decision::Run => "run",
        }
    }
}

#[derive(Debug, Clone)]
pub struct TraversalPlan {
    pub entries: Vec<(PackageDirectory, Decision)>,
}

impl TraversalPlan {
    /// Whether the loaded checkpoint was met during traversal. Always true
    /// when there was no checkpoint to look for.
    pub fn checkpoint_found(&self, checkpoint: Option<&Path>) -> bool {
        checkpoint.is_none()
            || self
                .entries
                .iter()
                .any(|(_, d)| matches!(d, Decision::Checkpoint { .. }))
    }

    pub fn count(&self, wanted: fn(&Decision) -> bool) -> usize {
        self.entries.iter().filter(|(_, d)| wanted(d)).count()
    }

    pub fn runnable(&self) -> impl Iterator<Item = &PackageDirectory> {
        self.entries
            .iter()
            .filter(|(_, d)| *d == Decision::Run)
            .map(|(p, _)| p)
    }
}

pub fn plan_traversal(
    packages: Vec<PackageDirectory>,
    skip: &SkipSet,
    prefix: &str,
    checkpoint: Option<&Path>,
) -> TraversalPlan {
    let mut resumed = checkpoint.is_none();
    let entries = packages
        .into_iter()
        .map(|package| {
            let decision = if skip.contains(&package) {
                Decision::SkipExplicit
            } else if !resumed {
                let announce = package.matches_prefix(prefix);
                if Some(package.path()) == checkpoint {
                    resumed = true;
                    Decision::Checkpoint { announce }
                } else {
                    Decision::PreCheckpoint { announce }
                }
            } else if !package.matches_prefix(prefix) {
                Decision::Filtered
            } else {
                Decision::Run
            };
            (package, decision)
        })
        .collect();
    TraversalPlan { entries }
}
