//! The autonomous solving pipeline.
//!
//! A [`SolvingPipeline`] takes one puzzle part from an empty workspace to a
//! verified answer, reporting every stage transition through a
//! [`StageReporter`]. The race core treats it as opaque.

mod claude;
mod headless;
mod prompts;
mod workspace;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::race::{AgentResult, Part, StageEvent};
use crate::source::PuzzleSource;

pub use claude::{ClaudePipeline, MAX_SUBMISSION_ATTEMPTS};
pub use headless::{AgentExecutor, ClaudeResponse, HeadlessAgent, ResultType};
pub use workspace::Workspace;

/// Which solving strategy the pipeline runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Strategy {
    /// Translate, plan, critique, revise, code, test, submit.
    #[default]
    #[serde(rename = "multi-agent", alias = "default")]
    MultiAgent,
    /// A single solve pass followed by the submission loop.
    #[serde(rename = "one-shot", alias = "fast")]
    OneShot,
}

impl Strategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Strategy::MultiAgent => "multi-agent",
            Strategy::OneShot => "one-shot",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives stage transitions, in emission order.
pub trait StageReporter: Send + Sync {
    fn report(&self, event: StageEvent);
}

/// Everything a pipeline run needs for one part.
#[derive(Clone)]
pub struct PipelineJob {
    pub year: u16,
    pub day: u8,
    pub part: Part,
    pub strategy: Strategy,
    /// Root of all race workspaces; the run uses a per-part subdirectory.
    pub workspace_root: PathBuf,
    /// Answer known ahead of time. When set, answers are verified locally
    /// instead of being submitted.
    pub known_answer: Option<String>,
    pub source: Arc<dyn PuzzleSource>,
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for PipelineJob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineJob")
            .field("year", &self.year)
            .field("day", &self.day)
            .field("part", &self.part)
            .field("strategy", &self.strategy)
            .field("workspace_root", &self.workspace_root)
            .field("known_answer", &self.known_answer.is_some())
            .finish()
    }
}

impl PipelineJob {
    /// Fail with `Cancelled` once the race has been reset.
    pub fn ensure_live(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
pub trait SolvingPipeline: Send + Sync {
    /// Run the pipeline to completion.
    ///
    /// `Ok` carries the run's verdict, solved or not. `Err` is reserved for
    /// environment failures the pipeline could not turn into a verdict.
    async fn run(&self, job: PipelineJob, reporter: Arc<dyn StageReporter>) -> Result<AgentResult>;
}

/// Read the `Success`/`Failure` verdict on the last line of stage output.
pub fn parse_stage_verdict(output: &str) -> Result<bool> {
    let last = output.trim().lines().last().unwrap_or("").trim();
    if last.eq_ignore_ascii_case("success") {
        Ok(true)
    } else if last.eq_ignore_ascii_case("failure") {
        Ok(false)
    } else {
        Err(Error::AgentExecutionFailed(
            "agent response must end with either 'Success' or 'Failure'".to_string(),
        ))
    }
}
