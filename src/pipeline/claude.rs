//! The agent-driven pipeline: multi-agent and one-shot strategies over a
//! headless agent executor.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::race::{AgentResult, Stage, StageEvent};
use crate::source::{classify, compare_with_known, Verdict};
use crate::{rlog, rlog_debug, rlog_warn};

use super::headless::{AgentExecutor, HeadlessAgent};
use super::prompts::{self, CodingFeedback};
use super::workspace::Workspace;
use super::{parse_stage_verdict, PipelineJob, SolvingPipeline, StageReporter, Strategy};

/// Answers checked per part before the run gives up.
pub const MAX_SUBMISSION_ATTEMPTS: u32 = 3;

/// Pause before resubmitting after the source could not be reached.
const SUBMIT_RETRY_DELAY: Duration = Duration::from_secs(5);

pub struct ClaudePipeline {
    executor: Arc<dyn AgentExecutor>,
}

impl ClaudePipeline {
    pub fn new(executor: Arc<dyn AgentExecutor>) -> Self {
        Self { executor }
    }

    /// Headless agent built from the configured command and stage timeout.
    pub fn from_config(config: &Config) -> Result<Self> {
        let agent =
            HeadlessAgent::from_command(config.effective_command())?.with_timeout(config.stage_timeout());
        Ok(Self::new(Arc::new(agent)))
    }
}

#[async_trait]
impl SolvingPipeline for ClaudePipeline {
    async fn run(&self, job: PipelineJob, reporter: Arc<dyn StageReporter>) -> Result<AgentResult> {
        rlog!(
            "Pipeline start: {}/{} part {} strategy={}",
            job.year,
            job.day,
            job.part,
            job.strategy
        );
        let puzzle = job.source.fetch_puzzle(job.year, job.day, job.part).await?;
        let input = job.source.fetch_input(job.year, job.day).await?;
        let workspace = Workspace::prepare(
            &job.workspace_root,
            job.year,
            job.day,
            job.part,
            &puzzle.markdown,
            &input,
        )
        .await?;

        let run = Run {
            job: &job,
            reporter: reporter.as_ref(),
            executor: self.executor.as_ref(),
            workspace,
        };
        let result = match job.strategy {
            Strategy::MultiAgent => run.multi_agent().await,
            Strategy::OneShot => run.one_shot().await,
        };
        rlog!("Pipeline end: part {} result={:?}", job.part, result);
        result
    }
}

/// One pipeline run over one prepared workspace.
struct Run<'a> {
    job: &'a PipelineJob,
    reporter: &'a dyn StageReporter,
    executor: &'a dyn AgentExecutor,
    workspace: Workspace,
}

impl Run<'_> {
    fn report(&self, stage: Stage, message: impl Into<String>, attempt: u32) {
        self.reporter
            .report(StageEvent::new(stage, message).with_attempt(attempt));
    }

    /// Execute one agent stage. Reset is honored before every stage.
    async fn stage(&self, prompt: String) -> Result<String> {
        self.job.ensure_live()?;
        self.executor
            .execute(&prompt, self.workspace.dir())
            .await?
            .into_output()
    }

    async fn multi_agent(&self) -> Result<AgentResult> {
        self.report(Stage::Translation, "Translating problem description...", 1);
        self.stage(prompts::translation(self.job.part)).await?;

        self.report(Stage::Planning, "Creating implementation plan...", 1);
        self.stage(prompts::planning(false)).await?;

        self.report(Stage::Critique, "Reviewing and critiquing plan...", 1);
        self.stage(prompts::critique()).await?;

        self.report(Stage::Revision, "Revising plan based on critique...", 1);
        self.stage(prompts::planning(true)).await?;

        self.report(Stage::Coding, "Writing initial solution...", 1);
        self.stage(prompts::coding(CodingFeedback::Initial)).await?;

        self.test_loop().await?;
        self.submission_loop().await
    }

    /// Test and fix until the tests pass. Unbounded; only reset stops it.
    async fn test_loop(&self) -> Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.report(
                Stage::Testing,
                format!("Running tests (attempt {attempt})..."),
                attempt,
            );
            if parse_stage_verdict(&self.stage(prompts::testing()).await?)? {
                return Ok(());
            }
            self.report(
                Stage::Coding,
                format!("Adjusting code based on test feedback (attempt {attempt})..."),
                attempt,
            );
            self.stage(prompts::coding(CodingFeedback::TestFailures))
                .await?;
        }
    }

    async fn one_shot(&self) -> Result<AgentResult> {
        self.report(Stage::Coding, "Running one-shot solver...", 1);
        let solved = parse_stage_verdict(&self.stage(prompts::one_shot(self.job.part, false)).await?)?;
        if !solved {
            return Ok(AgentResult::failed("One-shot solver could not find a solution"));
        }
        if let Some(answer) = self.workspace.read_answer().await? {
            self.report(Stage::Coding, format!("Solution found: {answer}"), 1);
        }
        self.submission_loop().await
    }

    /// Feed a rejected answer back into the solving stages.
    async fn resolve(&self, attempt: u32) -> Result<()> {
        match self.job.strategy {
            Strategy::MultiAgent => {
                self.report(
                    Stage::Coding,
                    "Adjusting code based on submission feedback...",
                    attempt,
                );
                self.stage(prompts::coding(CodingFeedback::SubmissionRejected))
                    .await?;
                self.test_loop().await
            }
            Strategy::OneShot => {
                self.report(
                    Stage::Coding,
                    "Re-solving based on submission feedback...",
                    attempt,
                );
                let output = self.stage(prompts::one_shot(self.job.part, true)).await?;
                match parse_stage_verdict(&output) {
                    Ok(true) => {
                        let answer = self.workspace.read_answer().await?.unwrap_or_default();
                        self.report(Stage::Coding, format!("New solution found: {answer}"), attempt);
                    }
                    Ok(false) => self.report(
                        Stage::Coding,
                        "Re-solve attempt did not produce a solution",
                        attempt,
                    ),
                    Err(e) => rlog_warn!("One-shot re-solve output unreadable: {}", e),
                }
                Ok(())
            }
        }
    }

    async fn submission_loop(&self) -> Result<AgentResult> {
        let part = self.job.part;
        let practice = self.job.known_answer.is_some();
        let mut last_error = None;

        for attempt in 1..=MAX_SUBMISSION_ATTEMPTS {
            self.job.ensure_live()?;
            let action = if practice {
                "Verifying answer locally"
            } else {
                "Submitting answer"
            };
            self.report(
                Stage::Submitting,
                format!("{action} (attempt {attempt}/{MAX_SUBMISSION_ATTEMPTS})..."),
                attempt,
            );

            let Some(answer) = self.workspace.read_answer().await? else {
                return Ok(AgentResult::failed("answer.txt not found"));
            };

            let verdict = match self.check(&answer).await {
                Ok(verdict) => verdict,
                // The answer was never judged: count the attempt, keep the answer.
                Err(e @ (Error::Http(_) | Error::PuzzleFetchFailed(_) | Error::Timeout(_))) => {
                    rlog_warn!("Part {} attempt {} submission failed: {}", part, attempt, e);
                    self.report(
                        Stage::Submitting,
                        format!("Submission failed: {e} (attempt {attempt}/{MAX_SUBMISSION_ATTEMPTS})"),
                        attempt,
                    );
                    last_error = Some(e);
                    if attempt < MAX_SUBMISSION_ATTEMPTS {
                        tokio::time::sleep(SUBMIT_RETRY_DELAY).await;
                    }
                    continue;
                }
                Err(e) => return Err(e),
            };
            rlog_debug!("Part {} attempt {} answer={} verdict={:?}", part, attempt, answer, verdict);
            if verdict.is_correct() {
                let suffix = if practice { " (practice mode)" } else { "" };
                return Ok(AgentResult::solved(
                    answer,
                    format!("Part {part} solved correctly!{suffix}"),
                ));
            }

            let hint = verdict
                .hint()
                .map(|h| format!(" (hint: {h})"))
                .unwrap_or_default();
            self.report(
                Stage::Submitting,
                format!(
                    "Answer {answer} rejected{hint} (attempt {attempt}/{MAX_SUBMISSION_ATTEMPTS})"
                ),
                attempt,
            );
            let message = verdict.message();
            self.workspace
                .write_submission_issues(&answer, &message, verdict.hint())
                .await?;
            last_error = Some(Error::SubmissionRejected {
                message,
                hint: verdict.hint().map(str::to_string),
            });

            if attempt < MAX_SUBMISSION_ATTEMPTS {
                self.resolve(attempt).await?;
            }
        }

        let reason = last_error.map(|e| format!(": {e}")).unwrap_or_default();
        Ok(AgentResult::failed(format!(
            "Part {part} failed after {MAX_SUBMISSION_ATTEMPTS} attempts{reason}"
        )))
    }

    /// Verify locally against a known answer, or submit to the source.
    async fn check(&self, answer: &str) -> Result<Verdict> {
        let job = self.job;
        if let Some(known) = &job.known_answer {
            return Ok(compare_with_known(answer, known));
        }

        let response = job
            .source
            .submit_answer(job.year, job.day, job.part, answer)
            .await?;
        self.workspace
            .write_submission_result(response.status_code, &response.message)
            .await?;

        let verdict = classify(&response.message);
        if verdict == Verdict::AlreadyCompleted {
            // Someone solved it on this account meanwhile; compare with the
            // answer the site now shows.
            let status = job.source.fetch_completion_status(job.year, job.day).await?;
            if let Some(known) = status.answer(job.part) {
                return Ok(compare_with_known(answer, known));
            }
        }
        Ok(verdict)
    }
}
