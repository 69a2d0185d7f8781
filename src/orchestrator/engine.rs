//! The regeneration loop: walk the plan, run pipelines, stop on first failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

use crate::errors::RegenError;
use crate::orchestrator::{
    CheckpointStore, Decision, PackageDirectory, StepExecutor, StepOutcome, discover_packages,
    normalize_path, plan_traversal,
};
use crate::pipeline::Pipeline;
use crate::skip::SkipSet;
use crate::ui::RegenUI;

/// Result of one package's pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineResult {
    Success,
    /// `step` is the first step that did not succeed; later steps never ran.
    Failure { step: String, outcome: StepOutcome },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every package was visited without a pipeline failure.
    Completed,
    /// A pipeline failed and the traversal stopped there.
    Halted {
        package: PathBuf,
        step: String,
        outcome: StepOutcome,
    },
    /// Ctrl-C stopped the traversal. `package` is the one whose pipeline was
    /// cut short, if any.
    Interrupted { package: Option<PathBuf> },
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub outcome: RunOutcome,
    /// Last package whose full pipeline succeeded (possibly from a prior run).
    pub checkpoint: Option<PathBuf>,
    /// False when a loaded checkpoint never appeared in the tree.
    pub checkpoint_found: bool,
    /// Packages whose pipeline was started, in order.
    pub executed: Vec<PathBuf>,
    pub elapsed: Duration,
    pub checkpoint_saved: bool,
    pub persist_error: Option<String>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcome == RunOutcome::Completed
    }

    /// Packages that passed their pipeline during this run.
    pub fn succeeded(&self) -> usize {
        match self.outcome {
            RunOutcome::Halted { .. } | RunOutcome::Interrupted { package: Some(_) } => {
                self.executed.len().saturating_sub(1)
            }
            RunOutcome::Completed | RunOutcome::Interrupted { package: None } => {
                self.executed.len()
            }
        }
    }
}

pub struct Orchestrator<E: StepExecutor> {
    executor: E,
    pipeline: Pipeline,
    skip: SkipSet,
    prefix: String,
    default_timeout: Duration,
    ui: Arc<RegenUI>,
    interrupt: Option<watch::Receiver<bool>>,
}

impl<E: StepExecutor> Orchestrator<E> {
    pub fn new(executor: E, pipeline: Pipeline, ui: Arc<RegenUI>) -> Self {
        Self {
            executor,
            pipeline,
            skip: SkipSet::new(),
            prefix: crate::regen_config::DEFAULT_PACKAGE_PREFIX.to_string(),
            default_timeout: Duration::from_secs(crate::regen_config::DEFAULT_TIMEOUT_SECS),
            ui,
            interrupt: None,
        }
    }

    pub fn with_skip(mut self, skip: SkipSet) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Stop the run when the channel flips to `true`.
    pub fn with_interrupt(mut self, interrupt: watch::Receiver<bool>) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    /// Discover packages under `root`, resume from the stored checkpoint,
    /// run, and persist the new checkpoint.
    ///
    /// Only discovery errors are returned; step failures end up in the
    /// report, and so does a failure to save the checkpoint.
    pub async fn run(&self, root: &Path, store: &CheckpointStore) -> Result<RunReport, RegenError> {
        let start = Instant::now();
        let packages = discover_packages(&normalize_path(root))?;
        let checkpoint = store.load().map(|cp| normalize_path(&cp));
        if let Some(ref cp) = checkpoint {
            tracing::info!(checkpoint = %cp.display(), "resuming after checkpoint");
        }

        let mut report = self.traverse(packages, checkpoint).await;

        match store.persist(report.checkpoint.as_deref()) {
            Ok(saved) => report.checkpoint_saved = saved,
            Err(e) => {
                tracing::error!(error = %e, "failed to persist checkpoint");
                report.persist_error = Some(e.to_string());
            }
        }
        report.elapsed = start.elapsed();
        self.ui.run_finished(&report, store.path());
        Ok(report)
    }

    /// Walk the packages in order without touching durable storage.
    pub async fn traverse(
        &self,
        packages: Vec<PackageDirectory>,
        checkpoint: Option<PathBuf>,
    ) -> RunReport {
        let start = Instant::now();
        let plan = plan_traversal(packages, &self.skip, &self.prefix, checkpoint.as_deref());
        let checkpoint_found = plan.checkpoint_found(checkpoint.as_deref());

        let mut last_success = checkpoint;
        let mut executed = Vec::new();
        let mut outcome = RunOutcome::Completed;

        for (package, decision) in &plan.entries {
            if self.interrupted() {
                outcome = RunOutcome::Interrupted { package: None };
                break;
            }
            match decision {
                Decision::SkipExplicit => self.ui.skipping_explicit(package.name()),
                Decision::PreCheckpoint { announce } | Decision::Checkpoint { announce } => {
                    if *announce {
                        self.ui.skipping_pre_checkpoint(package.name());
                    }
                }
                Decision::Filtered => self.ui.filtered(package.name()),
                Decision::Run => {
                    executed.push(package.path().to_path_buf());
                    match self.run_pipeline_until_interrupted(package).await {
                        Some(PipelineResult::Success) => {
                            last_success = Some(package.path().to_path_buf());
                        }
                        Some(PipelineResult::Failure {
                            step,
                            outcome: step_outcome,
                        }) => {
                            tracing::warn!(
                                package = %package.path().display(),
                                step = %step,
                                outcome = %step_outcome,
                                "pipeline failed, halting"
                            );
                            outcome = RunOutcome::Halted {
                                package: package.path().to_path_buf(),
                                step,
                                outcome: step_outcome,
                            };
                            break;
                        }
                        None => {
                            outcome = RunOutcome::Interrupted {
                                package: Some(package.path().to_path_buf()),
                            };
                            break;
                        }
                    }
                }
            }
        }

        if !checkpoint_found {
            tracing::warn!("checkpoint was never reached during traversal");
        }

        RunReport {
            outcome,
            checkpoint: last_success,
            checkpoint_found,
            executed,
            elapsed: start.elapsed(),
            checkpoint_saved: false,
            persist_error: None,
        }
    }

    /// Run every step for one package, stopping at the first non-success.
    pub async fn run_pipeline(&self, package: &PackageDirectory) -> PipelineResult {
        for step in self.pipeline.steps() {
            if self.pipeline.is_skipped(&step.name) {
                self.ui.step_skipped(&step.display_args(), package.name());
                continue;
            }
            let outcome = self
                .executor
                .run_step(package, step, step.timeout(self.default_timeout))
                .await;
            if !outcome.is_success() {
                return PipelineResult::Failure {
                    step: step.name.clone(),
                    outcome,
                };
            }
        }
        PipelineResult::Success
    }

    /// `None` when interrupted. Dropping the pipeline future kills the
    /// running step.
    async fn run_pipeline_until_interrupted(
        &self,
        package: &PackageDirectory,
    ) -> Option<PipelineResult> {
        let Some(mut rx) = self.interrupt.clone() else {
            return Some(self.run_pipeline(package).await);
        };
        tokio::select! {
            result = self.run_pipeline(package) => Some(result),
            _ = wait_for_interrupt(&mut rx) => None,
        }
    }

    fn interrupted(&self) -> bool {
        self.interrupt.as_ref().is_some_and(|rx| *rx.borrow())
    }
}

async fn wait_for_interrupt(rx: &mut watch::Receiver<bool>) {
    // A closed channel can never signal; wait forever instead.
    if rx.wait_for(|stop| *stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}
