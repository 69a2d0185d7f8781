//! Package regeneration — `regen run`.

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;

use super::super::{Cli, SelectionArgs};
use super::load_config;
use regen::config::ConfigOverrides;
use regen::orchestrator::{CheckpointStore, Orchestrator, RunOutcome, StepRunner};
use regen::ui::RegenUI;

/// Flags that only `regen run` accepts.
pub struct RunOptions {
    pub timeout_secs: Option<u64>,
    pub skip_steps: Vec<String>,
    pub skip_test: bool,
    pub test_only: bool,
}

pub async fn cmd_run(
    cli: &Cli,
    cwd: &Path,
    root: &Path,
    selection: &SelectionArgs,
    options: RunOptions,
) -> Result<()> {
    let config = load_config(
        cli,
        cwd,
        root,
        selection,
        ConfigOverrides {
            timeout_secs: options.timeout_secs,
            skip_steps: options.skip_steps,
            skip_test: options.skip_test,
            test_only: options.test_only,
            ..Default::default()
        },
    )?;

    let ui = Arc::new(RegenUI::new(config.verbose));
    let store = CheckpointStore::new(config.checkpoint_file.clone());

    // The orchestrator reports unreadable checkpoints; the header only needs a hint.
    let resume_hint = store.try_load().ok().flatten();
    ui.run_started(
        &config.root,
        resume_hint.as_deref(),
        &config.pipeline,
        config.skip.len(),
    );

    let (interrupt_tx, interrupt_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping the running step");
            let _ = interrupt_tx.send(true);
        }
    });

    let orchestrator = Orchestrator::new(
        StepRunner::new(Arc::clone(&ui)),
        config.pipeline.clone(),
        Arc::clone(&ui),
    )
    .with_skip(config.skip.clone())
    .with_prefix(config.package_prefix.clone())
    .with_timeout(config.timeout)
    .with_interrupt(interrupt_rx);

    let report = orchestrator.run(&config.root, &store).await?;

    match report.outcome {
        RunOutcome::Completed => Ok(()),
        RunOutcome::Halted { package, step, .. } => anyhow::bail!(
            "Regeneration halted: step '{}' failed for {}",
            step,
            package.display()
        ),
        RunOutcome::Interrupted { .. } => anyhow::bail!("Regeneration interrupted"),
    }
}
