//! Background execution of one pipeline run.
//!
//! A runner owns one spawned task per part. It is the only writer of that
//! part's agent state, and every write goes through
//! [`RaceService::publish`](super::RaceService) with the generation the
//! runner was launched for, so a runner outliving a reset cannot touch the
//! next session.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::pipeline::{PipelineJob, SolvingPipeline, StageReporter};
use crate::race::{AgentResult, Generation, Part, StageEvent};
use crate::{rlog, rlog_debug, rlog_error};

use super::RaceService;

/// Forwards stage events from a pipeline run into the owning session.
struct RunnerReporter {
    service: RaceService,
    generation: Generation,
    part: Part,
}

impl StageReporter for RunnerReporter {
    fn report(&self, event: StageEvent) {
        rlog_debug!(
            "[{}] part {} stage={} attempt={} {}",
            self.generation,
            self.part,
            event.stage,
            event.attempt,
            event.message
        );
        let part = self.part;
        self.service
            .publish(self.generation, move |session| {
                session.on_agent_stage_change(part, event)
            });
    }
}

/// Handle to a launched runner.
pub struct RunnerHandle {
    part: Part,
    generation: Generation,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl RunnerHandle {
    pub fn part(&self) -> Part {
        self.part
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Stop the run. The pipeline task is aborted and nothing more is
    /// published.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Map a pipeline error to the failure the agent is shown.
fn failure(err: Error) -> AgentResult {
    AgentResult::failed(format!("Solver error: {err}"))
}

pub struct PipelineRunner {
    service: RaceService,
    pipeline: Arc<dyn SolvingPipeline>,
}

impl PipelineRunner {
    pub fn new(service: RaceService, pipeline: Arc<dyn SolvingPipeline>) -> Self {
        Self { service, pipeline }
    }

    /// Spawn the run and return immediately.
    pub fn spawn(self, job: PipelineJob, generation: Generation) -> RunnerHandle {
        let part = job.part;
        let cancel = job.cancel.clone();
        let cancel_clone = cancel.clone();

        rlog!(
            "[{}] Runner start: {}/{} part {} ({})",
            generation,
            job.year,
            job.day,
            part,
            job.strategy
        );

        let task = tokio::spawn(async move {
            let reporter = Arc::new(RunnerReporter {
                service: self.service.clone(),
                generation,
                part,
            });
            let pipeline = self.pipeline.clone();
            let mut run = tokio::spawn(async move { pipeline.run(job, reporter).await });

            let joined = tokio::select! {
                _ = cancel_clone.cancelled() => {
                    // Dropping the aborted future kills any agent process.
                    run.abort();
                    rlog_debug!("[{}] Runner for part {} cancelled", generation, part);
                    return;
                }
                joined = &mut run => joined,
            };

            let result = match joined {
                Ok(Ok(result)) => result,
                Ok(Err(Error::Cancelled)) => {
                    rlog_debug!("[{}] Part {} pipeline stopped by reset", generation, part);
                    return;
                }
                Ok(Err(err)) => {
                    rlog_error!("[{}] Part {} pipeline failed: {}", generation, part, err);
                    failure(err)
                }
                Err(join_err) => {
                    rlog_error!("[{}] Part {} pipeline task died: {}", generation, part, join_err);
                    failure(Error::TaskJoin(join_err.to_string()))
                }
            };

            rlog!(
                "[{}] Runner end: part {} success={} message={}",
                generation,
                part,
                result.success,
                result.message
            );
            self.service.finish_agent(generation, part, result).await;
        });

        RunnerHandle {
            part,
            generation,
            cancel,
            task,
        }
    }
}
