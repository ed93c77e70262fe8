//! Race orchestration: the service holding the active race and the
//! background runners feeding it.

mod runner;
mod service;

pub use runner::{PipelineRunner, RunnerHandle};
pub use service::{RaceService, ServiceSettings, StartRequest, SubmitOutcome};
