//! Pipeline components: stage workers, shared context, orchestration, error handling.

pub mod context;
pub mod error_handler;
pub mod orchestrator;
pub mod stage;

pub use context::{PipelineContext, PipelineHandles, StageGroup, create_pipeline_context};
pub use error_handler::check_for_first_error_or_skipped_items;
pub use orchestrator::{run_pipeline, shutdown_pipeline, spawn_collector, start_pipeline};
pub use stage::{Stage, Transform, spawn_stage_workers};
