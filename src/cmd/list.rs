//! Dry run — `regen list`.

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::path::Path;

use super::super::{Cli, SelectionArgs};
use super::load_config;
use regen::config::ConfigOverrides;
use regen::orchestrator::{
    CheckpointStore, Decision, discover_packages, normalize_path, plan_traversal,
};

#[derive(Serialize)]
struct ListEntry<'a> {
    service: &'a str,
    name: &'a str,
    path: String,
    #[serde(flatten)]
    decision: Decision,
}

#[derive(Serialize)]
struct ListReport<'a> {
    root: String,
    checkpoint: Option<String>,
    checkpoint_found: bool,
    steps: Vec<&'a str>,
    packages: Vec<ListEntry<'a>>,
}

pub fn cmd_list(
    cli: &Cli,
    cwd: &Path,
    root: &Path,
    selection: &SelectionArgs,
    json: bool,
) -> Result<()> {
    let config = load_config(cli, cwd, root, selection, ConfigOverrides::default())?;
    let store = CheckpointStore::new(config.checkpoint_file.clone());
    let checkpoint = store.load().map(|cp| normalize_path(&cp));

    let packages = discover_packages(&config.root)?;
    let plan = plan_traversal(
        packages,
        &config.skip,
        &config.package_prefix,
        checkpoint.as_deref(),
    );
    let checkpoint_found = plan.checkpoint_found(checkpoint.as_deref());

    if json {
        let report = ListReport {
            root: config.root.display().to_string(),
            checkpoint: checkpoint.as_ref().map(|p| p.display().to_string()),
            checkpoint_found,
            steps: config.pipeline.step_names(),
            packages: plan
                .entries
                .iter()
                .map(|(package, decision)| ListEntry {
                    service: package.service(),
                    name: package.name(),
                    path: package.path().display().to_string(),
                    decision: *decision,
                })
                .collect(),
        };
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to serialize package list")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!();
    println!("{:<12} {:<24} PACKAGE", "DECISION", "SERVICE");
    for (package, decision) in &plan.entries {
        // Pad before styling so escape codes do not skew the columns.
        let cell = style(format!("{:<12}", decision.label()));
        let cell = match decision {
            Decision::Run => cell.green(),
            Decision::Checkpoint { .. } => cell.yellow(),
            Decision::SkipExplicit => cell.red(),
            Decision::PreCheckpoint { .. } | Decision::Filtered => cell.dim(),
        };
        println!("{} {:<24} {}", cell, package.service(), package.name());
    }

    println!();
    println!(
        "{} to run, {} done, {} skipped, {} filtered",
        plan.count(|d| *d == Decision::Run),
        plan.count(|d| matches!(d, Decision::PreCheckpoint { .. } | Decision::Checkpoint { .. })),
        plan.count(|d| *d == Decision::SkipExplicit),
        plan.count(|d| *d == Decision::Filtered),
    );
    if !checkpoint_found {
        println!(
            "{}",
            style("Checkpoint directory is not in the tree; a run would execute nothing").yellow()
        );
    }
    Ok(())
}
