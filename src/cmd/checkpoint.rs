//! Checkpoint inspection — `regen status` and `regen reset`.

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::path::Path;

use super::super::Cli;
use super::checkpoint_file;
use regen::orchestrator::CheckpointStore;

#[derive(Serialize)]
struct StatusReport {
    checkpoint_file: String,
    exists: bool,
    checkpoint: Option<String>,
}

pub fn cmd_status(cli: &Cli, cwd: &Path, process: Option<&Path>, json: bool) -> Result<()> {
    let store = CheckpointStore::new(checkpoint_file(cli, cwd, process)?);
    let checkpoint = store.try_load()?;

    if json {
        let report = StatusReport {
            checkpoint_file: store.path().display().to_string(),
            exists: store.path().exists(),
            checkpoint: checkpoint.as_ref().map(|p| p.display().to_string()),
        };
        let rendered =
            serde_json::to_string_pretty(&report).context("Failed to serialize status")?;
        println!("{}", rendered);
        return Ok(());
    }

    println!("Checkpoint file: {}", store.path().display());
    match checkpoint {
        Some(cp) => {
            println!("Last regenerated: {}", style(cp.display()).cyan());
            if !cp.is_dir() {
                println!(
                    "{}",
                    style("  (directory no longer exists; the next run would execute nothing)")
                        .yellow()
                );
            }
        }
        None => println!("No checkpoint. The next run starts from the beginning."),
    }
    Ok(())
}

pub fn cmd_reset(cli: &Cli, cwd: &Path, process: Option<&Path>, force: bool) -> Result<()> {
    let store = CheckpointStore::new(checkpoint_file(cli, cwd, process)?);

    if !force {
        anyhow::bail!(
            "Refusing to remove {} without --force",
            store.path().display()
        );
    }

    if store.clear()? {
        println!("Removed checkpoint {}", store.path().display());
    } else {
        println!("No checkpoint at {}", store.path().display());
    }
    Ok(())
}
