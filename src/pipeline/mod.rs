pub mod controller;
pub mod state;

pub use controller::IdentificationPipeline;
pub use state::{PipelineRun, RunStatus};
