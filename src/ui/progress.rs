use crate::orchestrator::{RunOutcome, RunReport, StepOutcome};
use crate::pipeline::Pipeline;
use crate::ui::icons::{BOOKMARK, CHECK, CLOCK, CROSS, FOLDER, SPARKLE, STOP, WARN};
use console::style;
use std::path::Path;
use std::time::Duration;

const RULE: &str = "------------------";

/// Console output for a regeneration run.
///
/// Step output is inherited from the child process, so this type prints plain
/// lines between steps instead of drawing progress bars over the child's
/// output.
pub struct RegenUI {
    verbose: bool,
}

impl RegenUI {
    /// # Arguments
    /// * `verbose`: when `true`, filtered packages and extra run details are
    ///   printed as well
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        println!("{}", msg.as_ref());
    }

    fn banner(&self, msg: impl std::fmt::Display) -> String {
        format!("{}{}{}", RULE, msg, RULE)
    }

    /// Header printed before the first package is visited.
    pub fn run_started(
        &self,
        root: &Path,
        checkpoint: Option<&Path>,
        pipeline: &Pipeline,
        skipped_packages: usize,
    ) {
        self.print_line(format!(
            "{} {} {}",
            FOLDER,
            style("Regenerating").bold(),
            style(root.display()).cyan()
        ));
        let steps: Vec<String> = pipeline
            .steps()
            .iter()
            .map(|step| {
                if pipeline.is_skipped(&step.name) {
                    style(format!("({})", step.name)).dim().to_string()
                } else {
                    step.name.clone()
                }
            })
            .collect();
        let total = pipeline.steps().len();
        let active = pipeline.active_count();
        if active < total {
            self.print_line(format!(
                "   Pipeline: {} ({} of {} steps active)",
                steps.join(" → "),
                active,
                total
            ));
        } else {
            self.print_line(format!("   Pipeline: {}", steps.join(" → ")));
        }
        match checkpoint {
            Some(cp) => self.print_line(format!(
                "   {}Resuming after {}",
                BOOKMARK,
                style(cp.display()).yellow()
            )),
            None => self.print_line("   No checkpoint, starting from the beginning"),
        }
        if skipped_packages > 0 {
            self.print_line(format!("   Skip list: {} entries", skipped_packages));
        }
    }

    pub fn skipping_explicit(&self, package: &str) {
        self.print_line(
            style(self.banner(format!("Ignoring {}", package)))
                .yellow()
                .to_string(),
        );
    }

    pub fn skipping_pre_checkpoint(&self, package: &str) {
        self.print_line(
            style(self.banner(format!("Skipping {}", package)))
                .dim()
                .to_string(),
        );
    }

    pub fn step_started(&self, command: &str, package: &str) {
        self.print_line(self.banner(format!("Starting {} on {}", command, package)));
    }

    pub fn step_skipped(&self, command: &str, package: &str) {
        self.print_line(
            style(self.banner(format!("Skipping {} on {}", command, package)))
                .dim()
                .to_string(),
        );
    }

    /// Finish notice, colored by outcome.
    pub fn step_finished(
        &self,
        command: &str,
        package: &str,
        outcome: StepOutcome,
        elapsed: Duration,
    ) {
        let line = self.banner(format!(
            "{}({:.1}s) {} on {}",
            outcome.label(),
            elapsed.as_secs_f64(),
            command,
            package
        ));
        let styled = match outcome {
            StepOutcome::Success => style(line).green(),
            StepOutcome::Failure { .. } | StepOutcome::TimedOut => style(line).red().bold(),
        };
        self.print_line(styled.to_string());
    }

    /// Summary printed once the checkpoint has been persisted.
    pub fn run_finished(&self, report: &RunReport, checkpoint_file: &Path) {
        self.print_line("");
        self.print_line(format!(
            "{}Finished everything in {:.2} minutes",
            CLOCK,
            report.elapsed.as_secs_f64() / 60.0
        ));

        match &report.outcome {
            RunOutcome::Completed => self.print_line(format!(
                "{}{} ({} package(s) regenerated)",
                CHECK,
                style("Regeneration complete").green().bold(),
                report.succeeded()
            )),
            RunOutcome::Halted {
                package,
                step,
                outcome,
            } => {
                self.print_line(format!(
                    "{}{} at {}",
                    CROSS,
                    style("Regeneration halted").red().bold(),
                    style(package.display()).yellow()
                ));
                self.print_line(format!("   Step '{}' {}", step, outcome));
                self.print_line(format!(
                    "   Fix the failure and rerun; {} package(s) before it will be skipped",
                    report.succeeded()
                ));
            }
            RunOutcome::Interrupted { package } => {
                self.print_line(format!("{}{}", STOP, style("Interrupted").red().bold()));
                if let Some(package) = package {
                    self.print_line(format!("   Stopped during {}", package.display()));
                }
            }
        }

        if !report.checkpoint_found {
            self.print_line(format!(
                "{}{}",
                WARN,
                style("Checkpoint directory was not found in the tree; nothing was executed")
                    .yellow()
            ));
        }

        match (&report.checkpoint, &report.persist_error) {
            (_, Some(err)) => self.print_line(format!(
                "{}{} {}",
                WARN,
                style("Could not save checkpoint:").red(),
                err
            )),
            (Some(cp), None) => self.print_line(format!(
                "{}Checkpoint: {} {}",
                BOOKMARK,
                cp.display(),
                style(format!("({})", checkpoint_file.display())).dim()
            )),
            (None, None) => self.print_line(format!("{}No checkpoint recorded", BOOKMARK)),
        }

        if self.verbose && !report.executed.is_empty() {
            self.print_line(format!("{}Packages visited this run:", SPARKLE));
            for path in &report.executed {
                self.print_line(format!("   {}", style(path.display()).dim()));
            }
        }
    }

    /// Shown in verbose mode for packages excluded by the name prefix.
    pub fn filtered(&self, package: &str) {
        if self.verbose {
            self.print_line(format!("   {}", style(format!("(not a target: {})", package)).dim()));
        }
    }
}
