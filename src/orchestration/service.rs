//! The process-wide race service.
//!
//! Lifecycle: `Idle --start--> Active(session) --reset--> Idle`. A session
//! that finishes stays active (and pollable) until the next reset. All race
//! state sits behind one `std::sync::Mutex` that is never held across an
//! `.await`; network calls and pipeline runs happen outside it and publish
//! their results afterwards, tagged with the session generation.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineJob, SolvingPipeline, Strategy};
use crate::race::{
    AgentResult, CompetitorStatus, Generation, Part, RaceSession, RaceSnapshot, RaceStatus,
    SessionParams,
};
use crate::source::{
    classify, compare_with_known, final_day, PuzzleSource, SourceConnector, Verdict, FIRST_YEAR,
};
use crate::{rlog, rlog_debug, rlog_warn};

use super::runner::{PipelineRunner, RunnerHandle};

#[derive(Debug, Clone, Default)]
pub struct StartRequest {
    pub year: u16,
    pub day: u8,
    /// Puzzle-site session token. Blank falls back to the service default.
    pub session: Option<String>,
    /// `None` uses the service's configured strategy.
    pub strategy: Option<Strategy>,
}

/// Result of a human submission that reached a verdict.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitOutcome {
    pub correct: bool,
    pub message: String,
    pub hint: Option<String>,
    pub rate_limited: bool,
}

impl SubmitOutcome {
    fn from_verdict(verdict: &Verdict) -> Self {
        Self {
            correct: verdict.is_correct(),
            message: verdict.message(),
            hint: verdict.hint().map(str::to_string),
            rate_limited: *verdict == Verdict::RateLimited,
        }
    }
}

/// Settings fixed for the lifetime of a service.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub workspace_root: PathBuf,
    pub strategy: Strategy,
    /// Used when a start request carries no session token.
    pub default_session: Option<String>,
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            workspace_root: config.workspace_dir()?,
            strategy: config.strategy(),
            default_session: Config::env_session(),
        })
    }
}

struct ActiveRace {
    session: RaceSession,
    source: Arc<dyn PuzzleSource>,
    cancel: CancellationToken,
    runners: Vec<RunnerHandle>,
}

#[derive(Default)]
struct ServiceState {
    /// Generation of the most recently started session.
    generation: Generation,
    active: Option<ActiveRace>,
}

struct ServiceInner {
    state: Mutex<ServiceState>,
    /// Serializes starts, which await the network before taking `state`.
    start_gate: tokio::sync::Mutex<()>,
    connector: Arc<dyn SourceConnector>,
    pipeline: Arc<dyn SolvingPipeline>,
    settings: ServiceSettings,
}

/// Holds at most one active race. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct RaceService {
    inner: Arc<ServiceInner>,
}

impl RaceService {
    pub fn new(
        connector: Arc<dyn SourceConnector>,
        pipeline: Arc<dyn SolvingPipeline>,
        settings: ServiceSettings,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                state: Mutex::new(ServiceState::default()),
                start_gate: tokio::sync::Mutex::new(()),
                connector,
                pipeline,
                settings,
            }),
        }
    }

    pub fn has_default_session(&self) -> bool {
        self.inner.settings.default_session.is_some()
    }

    pub fn default_strategy(&self) -> Strategy {
        self.inner.settings.strategy
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        // A panic while holding the lock leaves plain data behind; keep serving.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start a race for (year, day).
    ///
    /// Fetches the puzzle before any state changes, then opens the session
    /// and launches the part-1 runner in the background.
    pub async fn start_race(&self, request: StartRequest) -> Result<RaceSnapshot> {
        validate_puzzle(request.year, request.day)?;
        let token = request
            .session
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| self.inner.settings.default_session.clone())
            .ok_or(Error::MissingSession)?;
        let strategy = request.strategy.unwrap_or(self.inner.settings.strategy);
        let (year, day) = (request.year, request.day);

        let _gate = self.inner.start_gate.lock().await;
        if self.state().active.is_some() {
            return Err(Error::AlreadyRacing);
        }

        let source = self.inner.connector.connect(&token)?;
        let part1 = source
            .fetch_puzzle(year, day, Part::One)
            .await
            .map_err(fetch_failed)?;

        let completion = match source.fetch_completion_status(year, day).await {
            Ok(status) => status,
            Err(e) => {
                rlog_warn!("Completion status for {}/{} unavailable: {}", year, day, e);
                Default::default()
            }
        };
        let part2_text = if completion.part2_available() {
            match source.fetch_puzzle(year, day, Part::Two).await {
                Ok(text) => Some(text.markdown),
                Err(e) => {
                    rlog_warn!("Part 2 prefetch for {}/{} failed: {}", year, day, e);
                    None
                }
            }
        } else {
            None
        };

        let params = SessionParams {
            year,
            day,
            strategy,
            puzzle_title: part1.title,
            part1_text: part1.markdown,
            input_url: source.input_url(year, day),
            practice_mode: completion.part1_complete,
            part1_answer: completion.part1_answer.clone(),
            part2_answer: completion.part2_answer.clone(),
            part2_text,
            single_part: completion.single_part,
        };

        let cancel = CancellationToken::new();
        let (generation, snapshot, job) = {
            let mut state = self.state();
            let generation = state.generation.next();
            state.generation = generation;

            let mut session = RaceSession::new(generation, params);
            session.on_agent_launched(Part::One);
            let job = self.job(&session, &source, &cancel, Part::One);
            let snapshot = session.snapshot();
            rlog!(
                "[{}] Race start: {}/{} \"{}\" race={} strategy={} practice={}",
                generation,
                year,
                day,
                session.puzzle_title(),
                session.id().short(),
                strategy,
                session.practice_mode()
            );
            state.active = Some(ActiveRace {
                session,
                source,
                cancel,
                runners: Vec::new(),
            });
            (generation, snapshot, job)
        };

        self.launch(generation, job);
        Ok(snapshot)
    }

    /// Snapshot for pollers. Retries a part-2 unlock that an earlier fetch
    /// left unfinished before reading the state.
    pub async fn poll_status(&self) -> Result<RaceSnapshot> {
        self.retry_part2_unlock().await;
        self.get_status()
    }

    /// Current snapshot. Only ever waits on the state lock.
    pub fn get_status(&self) -> Result<RaceSnapshot> {
        self.state()
            .active
            .as_ref()
            .map(|race| race.session.snapshot())
            .ok_or(Error::NoActiveRace)
    }

    /// Check a human answer for `part`.
    ///
    /// The finish time is taken when the request arrives, before the
    /// answer is verified.
    pub async fn submit_answer(&self, part: Part, answer: &str) -> Result<SubmitOutcome> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::Validation("answer must not be empty".to_string()));
        }
        if part == Part::Two {
            self.retry_part2_unlock().await;
        }

        let (generation, elapsed, known, source, year, day) = {
            let state = self.state();
            let race = state.active.as_ref().ok_or(Error::NoActiveRace)?;
            let session = &race.session;
            if !session.is_unlocked(part) {
                return Err(Error::PartNotUnlocked(part));
            }
            let part_state = session.part(part);
            if part_state.human().status == CompetitorStatus::Completed {
                return Err(Error::AlreadySolved(part));
            }
            (
                session.generation(),
                session.elapsed_seconds(),
                part_state.correct_answer().map(str::to_string),
                race.source.clone(),
                session.year(),
                session.day(),
            )
        };

        let verdict = match known {
            Some(known) => compare_with_known(answer, &known),
            None => {
                let response = source.submit_answer(year, day, part, answer).await?;
                let verdict = classify(&response.message);
                if verdict == Verdict::AlreadyCompleted {
                    let status = source.fetch_completion_status(year, day).await?;
                    match status.answer(part) {
                        Some(known) => compare_with_known(answer, known),
                        None => verdict,
                    }
                } else {
                    verdict
                }
            }
        };
        rlog_debug!(
            "[{}] Human part {} answer={} verdict={:?} at {:.3}s",
            generation,
            part,
            answer,
            verdict,
            elapsed
        );

        if verdict.is_correct() {
            self.publish(generation, |session| {
                session.on_human_solved(part, answer, elapsed)
            })
            .ok_or(Error::NoActiveRace)??;
            rlog!("[{}] Human solved part {} at {:.3}s", generation, part, elapsed);
            if part == Part::One {
                self.check_part2_unlock(generation).await;
            }
        }

        Ok(SubmitOutcome::from_verdict(&verdict))
    }

    /// Discard the active session and stop its runners. Safe to call with
    /// no race.
    pub fn reset_race(&self) {
        let active = self.state().active.take();
        match active {
            Some(race) => {
                race.cancel.cancel();
                for runner in &race.runners {
                    rlog_debug!("[{}] Stopping part {} runner", runner.generation(), runner.part());
                    runner.shutdown();
                }
                rlog!(
                    "[{}] Race reset: {}/{} ({} runner(s) stopped)",
                    race.session.generation(),
                    race.session.year(),
                    race.session.day(),
                    race.runners.len()
                );
            }
            None => rlog_debug!("Reset with no active race"),
        }
    }

    /// Apply `update` to the session if it still belongs to `generation`.
    ///
    /// Returns `None`, and changes nothing, for a stale generation.
    pub(crate) fn publish<T>(
        &self,
        generation: Generation,
        update: impl FnOnce(&mut RaceSession) -> T,
    ) -> Option<T> {
        let mut state = self.state();
        let Some(race) = state
            .active
            .as_mut()
            .filter(|race| race.session.generation() == generation)
        else {
            rlog_debug!("[{}] Dropped stale publish", generation);
            return None;
        };

        let was_racing = race.session.is_racing();
        let out = update(&mut race.session);
        if was_racing && race.session.status() == RaceStatus::Finished {
            let s = &race.session;
            rlog!(
                "[{}] Race finished after {:.3}s: part1={:?} part2={:?}",
                generation,
                s.elapsed_seconds(),
                s.part(Part::One).winner(),
                s.part(Part::Two).winner()
            );
        }
        Some(out)
    }

    /// Record the end of a runner's pipeline run.
    pub(crate) async fn finish_agent(&self, generation: Generation, part: Part, result: AgentResult) {
        let success = result.success;
        let applied = self.publish(generation, |session| session.on_agent_finished(part, result));
        if applied == Some(true) && part == Part::One && success {
            self.check_part2_unlock(generation).await;
        }
    }

    /// Make part 2 available and launch its runner once.
    ///
    /// Queries the source only while part-2 text is still unknown. The
    /// launch itself is claimed under the lock, so concurrent callers
    /// start at most one part-2 runner.
    pub async fn check_part2_unlock(&self, generation: Generation) {
        let (source, year, day, need_fetch) = {
            let state = self.state();
            let Some(race) = state
                .active
                .as_ref()
                .filter(|race| race.session.generation() == generation)
            else {
                return;
            };
            if !race.session.wants_part2() {
                return;
            }
            (
                race.source.clone(),
                race.session.year(),
                race.session.day(),
                !race.session.part2_fetched(),
            )
        };

        if need_fetch {
            match source.fetch_completion_status(year, day).await {
                Ok(status) if status.single_part => {
                    rlog!("[{}] {}/{} has a single part", generation, year, day);
                    self.publish(generation, |session| session.mark_single_part());
                    return;
                }
                Ok(status) if status.part2_available() => {
                    match source.fetch_puzzle(year, day, Part::Two).await {
                        Ok(text) => {
                            rlog!("[{}] Part 2 unlocked", generation);
                            self.publish(generation, |session| {
                                session.record_part2_text(text.markdown)
                            });
                        }
                        Err(e) => rlog_warn!("[{}] Part 2 fetch failed: {}", generation, e),
                    }
                }
                Ok(_) => rlog_debug!("[{}] Part 2 not available yet", generation),
                Err(e) => rlog_warn!("[{}] Completion status failed: {}", generation, e),
            }
        }

        let job = {
            let mut state = self.state();
            let Some(race) = state
                .active
                .as_mut()
                .filter(|race| race.session.generation() == generation)
            else {
                return;
            };
            if !race.session.claim_part2_launch() {
                return;
            }
            self.job(&race.session, &race.source, &race.cancel, Part::Two)
        };
        self.launch(generation, job);
    }

    /// Rerun the unlock check when part 1 was completed but part 2 was never
    /// fetched, e.g. after a failed fetch.
    async fn retry_part2_unlock(&self) {
        let generation = {
            let state = self.state();
            match state.active.as_ref() {
                Some(race) if race.session.part2_stalled() => race.session.generation(),
                _ => return,
            }
        };
        rlog_debug!("[{}] Retrying part 2 unlock", generation);
        self.check_part2_unlock(generation).await;
    }

    fn job(
        &self,
        session: &RaceSession,
        source: &Arc<dyn PuzzleSource>,
        cancel: &CancellationToken,
        part: Part,
    ) -> PipelineJob {
        PipelineJob {
            year: session.year(),
            day: session.day(),
            part,
            strategy: session.strategy(),
            workspace_root: self.inner.settings.workspace_root.clone(),
            known_answer: session.part(part).correct_answer().map(str::to_string),
            source: source.clone(),
            cancel: cancel.child_token(),
        }
    }

    fn launch(&self, generation: Generation, job: PipelineJob) {
        let handle =
            PipelineRunner::new(self.clone(), self.inner.pipeline.clone()).spawn(job, generation);
        let mut state = self.state();
        match state
            .active
            .as_mut()
            .filter(|race| race.session.generation() == generation)
        {
            Some(race) => {
                race.runners.retain(|runner| !runner.is_finished());
                race.runners.push(handle);
            }
            // Reset won the race against the launch.
            None => handle.shutdown(),
        }
    }
}

fn validate_puzzle(year: u16, day: u8) -> Result<()> {
    if year < FIRST_YEAR {
        return Err(Error::Validation(format!(
            "year must be {FIRST_YEAR} or later, got {year}"
        )));
    }
    let last = final_day(year);
    if !(1..=last).contains(&day) {
        return Err(Error::Validation(format!(
            "day must be between 1 and {last} for {year}, got {day}"
        )));
    }
    Ok(())
}

/// Transport failures while fetching the puzzle surface as fetch failures.
fn fetch_failed(err: Error) -> Error {
    match err {
        Error::Http(e) => Error::PuzzleFetchFailed(e.to_string()),
        other => other,
    }
}
