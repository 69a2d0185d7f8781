use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

use crate::orchestrator::PackageDirectory;
use crate::pipeline::Step;
use crate::ui::RegenUI;

/// How a single step ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    Success,
    /// Exited unsuccessfully. `exit_code` is `None` when the process was killed
    /// by a signal or could not be started.
    Failure { exit_code: Option<i32> },
    /// Ran past its deadline and was killed.
    TimedOut,
}

impl StepOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StepOutcome::Success)
    }

    /// Banner word for the finish notice.
    pub fn label(&self) -> &'static str {
        match self {
            StepOutcome::Success => "Finished",
            StepOutcome::Failure { .. } => "Failed",
            StepOutcome::TimedOut => "KILLING",
        }
    }
}

impl std::fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepOutcome::Success => write!(f, "success"),
            StepOutcome::Failure {
                exit_code: Some(code),
            } => write!(f, "failed (exit {})", code),
            StepOutcome::Failure { exit_code: None } => write!(f, "failed"),
            StepOutcome::TimedOut => write!(f, "timed out"),
        }
    }
}

/// Executes one pipeline step for one package.
///
/// Implementations never return an error: every way a child process can
/// misbehave collapses into a [`StepOutcome`].
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn run_step(
        &self,
        package: &PackageDirectory,
        step: &Step,
        timeout: Duration,
    ) -> StepOutcome;
}

/// Runs steps as real child processes with inherited output.
pub struct StepRunner {
    ui: Arc<RegenUI>,
}

impl StepRunner {
    pub fn new(ui: Arc<RegenUI>) -> Self {
        Self { ui }
    }

    async fn execute(&self, working_dir: &Path, step: &Step, timeout: Duration) -> StepOutcome {
        let mut cmd = Command::new(&step.program);
        cmd.args(&step.args)
            .current_dir(working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        // Own process group so a timeout can take down the whole tree.
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!(
                    program = %step.program,
                    dir = %working_dir.display(),
                    error = %e,
                    "failed to spawn step"
                );
                return StepOutcome::Failure { exit_code: None };
            }
        };
        tracing::debug!(pid = child.id(), step = %step.name, "step spawned");

        let mut group = ProcessGroupGuard::new(child.id());
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                group.disarm();
                if status.success() {
                    StepOutcome::Success
                } else {
                    StepOutcome::Failure {
                        exit_code: status.code(),
                    }
                }
            }
            Ok(Err(e)) => {
                tracing::error!(step = %step.name, error = %e, "failed to wait for step");
                terminate(&mut child, &mut group).await;
                StepOutcome::Failure { exit_code: None }
            }
            Err(_) => {
                tracing::warn!(
                    step = %step.name,
                    timeout_secs = timeout.as_secs_f64(),
                    "step exceeded its timeout, killing"
                );
                terminate(&mut child, &mut group).await;
                StepOutcome::TimedOut
            }
        }
    }
}

#[async_trait]
impl StepExecutor for StepRunner {
    async fn run_step(
        &self,
        package: &PackageDirectory,
        step: &Step,
        timeout: Duration,
    ) -> StepOutcome {
        let command = step.display_args();
        let start = Instant::now();
        self.ui.step_started(&command, package.name());
        let outcome = self.execute(package.path(), step, timeout).await;
        self.ui
            .step_finished(&command, package.name(), outcome, start.elapsed());
        outcome
    }
}

/// Kill the step's process group and reap the direct child.
async fn terminate(child: &mut Child, group: &mut ProcessGroupGuard) {
    group.kill();
    if let Err(e) = child.start_kill() {
        tracing::debug!(error = %e, "child already gone");
    }
    if let Err(e) = child.wait().await {
        tracing::warn!(error = %e, "failed to reap killed step");
    }
}

/// Kills the process group on drop unless disarmed after a normal exit.
///
/// Dropping the step future (e.g. on Ctrl-C) therefore never leaves the
/// step's descendants running.
struct ProcessGroupGuard {
    pgid: Option<u32>,
}

impl ProcessGroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pgid: pid }
    }

    fn disarm(&mut self) {
        self.pgid = None;
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_process_group(pgid);
        }
    }
}

impl Drop for ProcessGroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pgid: u32) {
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        tracing::debug!(pgid, error = %e, "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn runner() -> StepRunner {
        StepRunner::new(Arc::new(RegenUI::new(false)))
    }

    fn sh(name: &str, script: &str) -> Step {
        Step::new(name, "sh", &["-c", script])
    }

    fn package(dir: &Path) -> PackageDirectory {
        PackageDirectory::new(dir.to_path_buf())
    }

    #[tokio::test]
    async fn test_zero_exit_is_success() {
        let dir = tempdir().unwrap();
        let outcome = runner()
            .run_step(&package(dir.path()), &sh("ok", "exit 0"), Duration::from_secs(10))
            .await;
        assert_eq!(outcome, StepOutcome::Success);
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_failure_with_code() {
        let dir = tempdir().unwrap();
        let outcome = runner()
            .run_step(&package(dir.path()), &sh("bad", "exit 3"), Duration::from_secs(10))
            .await;
        assert_eq!(outcome, StepOutcome::Failure { exit_code: Some(3) });
        assert!(!outcome.is_success());
    }

    #[tokio::test]
    async fn test_runs_in_package_directory() {
        let dir = tempdir().unwrap();
        let outcome = runner()
            .run_step(
                &package(dir.path()),
                &sh("touch", "touch marker.txt"),
                Duration::from_secs(10),
            )
            .await;
        assert_eq!(outcome, StepOutcome::Success);
        assert!(dir.path().join("marker.txt").exists());
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let dir = tempdir().unwrap();
        let start = Instant::now();
        let outcome = runner()
            .run_step(
                &package(dir.path()),
                &sh("hang", "sleep 30"),
                Duration::from_millis(200),
            )
            .await;
        assert_eq!(outcome, StepOutcome::TimedOut);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_timeout_kills_grandchildren() {
        let dir = tempdir().unwrap();
        // The background writer would create the file after one second if it
        // survived the kill.
        let script = "(sleep 1; touch survivor.txt) & sleep 30";
        let outcome = runner()
            .run_step(&package(dir.path()), &sh("tree", script), Duration::from_millis(200))
            .await;
        assert_eq!(outcome, StepOutcome::TimedOut);
        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(!dir.path().join("survivor.txt").exists());
    }

    #[tokio::test]
    async fn test_missing_program_is_failure() {
        let dir = tempdir().unwrap();
        let step = Step::new("ghost", "regen-no-such-program-xyz", &[]);
        let outcome = runner()
            .run_step(&package(dir.path()), &step, Duration::from_secs(10))
            .await;
        assert_eq!(outcome, StepOutcome::Failure { exit_code: None });
    }

    #[tokio::test]
    async fn test_missing_working_dir_is_failure() {
        let pkg = PackageDirectory::new(PathBuf::from("/nonexistent/regen/pkg"));
        let outcome = runner()
            .run_step(&pkg, &sh("ok", "exit 0"), Duration::from_secs(10))
            .await;
        assert_eq!(outcome, StepOutcome::Failure { exit_code: None });
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(StepOutcome::Success.label(), "Finished");
        assert_eq!(StepOutcome::Failure { exit_code: Some(1) }.label(), "Failed");
        assert_eq!(StepOutcome::TimedOut.label(), "KILLING");
        assert_eq!(
            StepOutcome::Failure { exit_code: Some(2) }.to_string(),
            "failed (exit 2)"
        );
    }
}
