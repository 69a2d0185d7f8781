//! Step definitions and the per-package pipeline.
//!
//! This module provides:
//! - `Step`: one named external command run inside a package directory
//! - `Pipeline`: the ordered step list plus the set of steps the operator
//!   asked to skip
//! - `default_steps`: restore, code generation, test via `dotnet`

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::errors::RegenError;

/// Name of the step targeted by `--skip-test` and `--test-only`.
pub const TEST_STEP: &str = "test";

/// Program used by the built-in steps when `REGEN_DOTNET` is not set.
pub const DEFAULT_PROGRAM: &str = "dotnet";

/// A single external command in the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Step {
    /// Step name used in banners and skip directives (e.g. "restore")
    pub name: String,
    /// Program to execute
    pub program: String,
    /// Arguments passed to the program
    #[serde(default)]
    pub args: Vec<String>,
    /// Per-step timeout override in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Step {
    pub fn new(name: &str, program: &str, args: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout_secs: None,
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Effective timeout: the step override if present, else the run default.
    pub fn timeout(&self, default: Duration) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(default)
    }

    /// Command line as shown in banners and `config show`.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }

    /// Argument string as printed in step banners ("build /t:GenerateCode").
    pub fn display_args(&self) -> String {
        if self.args.is_empty() {
            self.name.clone()
        } else {
            self.args.join(" ")
        }
    }
}

/// The built-in pipeline: restore, build with code generation, test.
pub fn default_steps() -> Vec<Step> {
    let program = std::env::var("REGEN_DOTNET").unwrap_or_else(|_| DEFAULT_PROGRAM.to_string());
    vec![
        Step::new("restore", &program, &["restore"]),
        Step::new("generate", &program, &["build", "/t:GenerateCode"]),
        Step::new(TEST_STEP, &program, &["test"]),
    ]
}

/// Ordered steps run for every package, with operator skip directives applied.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<Step>,
    skipped: BTreeSet<String>,
}

impl Pipeline {
    /// Build a pipeline, rejecting empty or ambiguous step lists and steps
    /// that would time out immediately.
    pub fn new(steps: Vec<Step>) -> Result<Self, RegenError> {
        if steps.is_empty() {
            return Err(RegenError::EmptyPipeline);
        }
        let mut seen = BTreeSet::new();
        for step in &steps {
            if !seen.insert(step.name.as_str()) {
                return Err(RegenError::DuplicateStep(step.name.clone()));
            }
            if step.timeout_secs == Some(0) {
                return Err(RegenError::InvalidTimeout(format!(
                    "step '{}' has timeout_secs = 0",
                    step.name
                )));
            }
        }
        Ok(Self {
            steps,
            skipped: BTreeSet::new(),
        })
    }

    /// Mark a step as skipped. Unknown names are a configuration error.
    pub fn skip_step(&mut self, name: &str) -> Result<(), RegenError> {
        if !self.steps.iter().any(|s| s.name == name) {
            return Err(RegenError::UnknownStep {
                name: name.to_string(),
                known: self.step_names().join(", "),
            });
        }
        self.skipped.insert(name.to_string());
        Ok(())
    }

    /// `--skip-test`: skip the test step.
    pub fn skip_tests(&mut self) -> Result<(), RegenError> {
        self.skip_step(TEST_STEP)
    }

    /// `--test-only`: skip every step except the test step.
    pub fn test_only(&mut self) -> Result<(), RegenError> {
        let names: Vec<String> = self
            .steps
            .iter()
            .filter(|s| s.name != TEST_STEP)
            .map(|s| s.name.clone())
            .collect();
        if names.len() == self.steps.len() {
            return Err(RegenError::UnknownStep {
                name: TEST_STEP.to_string(),
                known: self.step_names().join(", "),
            });
        }
        for name in names {
            self.skipped.insert(name);
        }
        Ok(())
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn is_skipped(&self, name: &str) -> bool {
        self.skipped.contains(name)
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name.as_str()).collect()
    }

    /// Number of steps that will actually execute per package.
    pub fn active_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| !self.skipped.contains(&s.name))
            .count()
    }
}
