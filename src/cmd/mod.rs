//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module          | Commands handled        |
//! |-----------------|-------------------------|
//! | `run`           | `Run`                   |
//! | `list`          | `List`                  |
//! | `checkpoint`    | `Status`, `Reset`       |
//! | `config`        | `Config`                |

pub mod checkpoint;
pub mod config;
pub mod list;
pub mod run;

pub use checkpoint::{cmd_reset, cmd_status};
pub use config::cmd_config;
pub use list::cmd_list;
pub use run::{RunOptions, cmd_run};

use anyhow::Result;
use std::path::Path;

use super::{Cli, SelectionArgs};
use regen::config::{Config, ConfigOverrides};
use regen::regen_config::RegenToml;

/// Resolve regen.toml and layer the selection flags over it.
pub(crate) fn load_config(
    cli: &Cli,
    cwd: &Path,
    root: &Path,
    selection: &SelectionArgs,
    overrides: ConfigOverrides,
) -> Result<Config> {
    let (toml, source) = RegenToml::resolve(cli.config.as_deref(), cwd)?;
    if let Some(source) = &source {
        tracing::debug!(config = %source.display(), "loaded configuration");
    }
    Config::new(
        root.to_path_buf(),
        &toml,
        ConfigOverrides {
            checkpoint_file: selection.process.clone(),
            package_prefix: selection.prefix.clone(),
            skip: selection.skip.clone(),
            skip_file: selection.skip_file.clone(),
            verbose: cli.verbose,
            ..overrides
        },
    )
}

/// Checkpoint file from `--process`, else regen.toml, else the default.
pub(crate) fn checkpoint_file(cli: &Cli, cwd: &Path, process: Option<&Path>) -> Result<std::path::PathBuf> {
    if let Some(path) = process {
        return Ok(path.to_path_buf());
    }
    let (toml, _) = RegenToml::resolve(cli.config.as_deref(), cwd)?;
    Ok(toml.defaults.checkpoint_file)
}
