pub mod checkpoint;
pub mod engine;
pub mod plan;
pub mod runner;
pub mod traversal;

pub use checkpoint::CheckpointStore;
pub use engine::{Orchestrator, PipelineResult, RunOutcome, RunReport};
pub use plan::{Decision, TraversalPlan, plan_traversal};
pub use runner::{StepExecutor, StepOutcome, StepRunner};
pub use traversal::{PackageDirectory, SDK_DIR, discover_packages, normalize_path};
