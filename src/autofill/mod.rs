pub mod orchestrator;
pub mod run_summary;
