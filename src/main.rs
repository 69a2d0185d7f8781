use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "regen")]
#[command(
    version,
    about = "Regenerate every management-plane package in an SDK tree, resuming where the last run stopped"
)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to regen.toml. Defaults to ./regen.toml when it exists.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the step pipeline for every package after the checkpoint
    Run {
        /// Root directory of the SDK repository (contains sdk/)
        root: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Timeout of one step in seconds
        #[arg(long)]
        timeout: Option<u64>,

        /// Skip a named step for every package (repeatable)
        #[arg(long = "skip-step", value_name = "STEP")]
        skip_step: Vec<String>,

        /// Skip the test step for each package
        #[arg(long, conflicts_with = "test_only")]
        skip_test: bool,

        /// Run only the test step for each package
        #[arg(long)]
        test_only: bool,
    },
    /// Show what a run would do without executing anything
    List {
        /// Root directory of the SDK repository (contains sdk/)
        root: PathBuf,

        #[command(flatten)]
        selection: SelectionArgs,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the stored checkpoint
    Status {
        /// Checkpoint file
        #[arg(long, value_name = "PATH")]
        process: Option<PathBuf>,

        /// Print machine-readable JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete the stored checkpoint so the next run starts from the beginning
    Reset {
        /// Checkpoint file
        #[arg(long, value_name = "PATH")]
        process: Option<PathBuf>,

        #[arg(long)]
        force: bool,
    },
    /// View, validate or create regen.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

/// Options deciding which packages a run visits.
#[derive(Args, Clone, Debug, Default)]
pub struct SelectionArgs {
    /// Checkpoint file storing the last successfully regenerated package
    #[arg(long, value_name = "PATH")]
    pub process: Option<PathBuf>,

    /// Package to skip, by directory name or full path (repeatable, comma separated)
    #[arg(long, value_name = "PACKAGE", value_delimiter = ',')]
    pub skip: Vec<String>,

    /// File with one package to skip per line
    #[arg(long, value_name = "PATH")]
    pub skip_file: Option<PathBuf>,

    /// Only package directories starting with this prefix are executed
    #[arg(long)]
    pub prefix: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Validate regen.toml and show any warnings
    Validate,
    /// Write a regen.toml with the built-in pipeline spelled out
    Init,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cwd = std::env::current_dir().context("Failed to get current directory")?;

    match &cli.command {
        Commands::Run {
            root,
            selection,
            timeout,
            skip_step,
            skip_test,
            test_only,
        } => {
            let run = cmd::RunOptions {
                timeout_secs: *timeout,
                skip_steps: skip_step.clone(),
                skip_test: *skip_test,
                test_only: *test_only,
            };
            cmd::cmd_run(&cli, &cwd, root, selection, run).await?;
        }
        Commands::List {
            root,
            selection,
            json,
        } => cmd::cmd_list(&cli, &cwd, root, selection, *json)?,
        Commands::Status { process, json } => {
            cmd::cmd_status(&cli, &cwd, process.as_deref(), *json)?
        }
        Commands::Reset { process, force } => {
            cmd::cmd_reset(&cli, &cwd, process.as_deref(), *force)?
        }
        Commands::Config { command } => cmd::cmd_config(&cli, &cwd, command.clone())?,
    }

    Ok(())
}
