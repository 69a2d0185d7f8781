pub mod config;
pub mod errors;
pub mod orchestrator;
pub mod pipeline;
pub mod regen_config;
pub mod skip;
pub mod ui;
