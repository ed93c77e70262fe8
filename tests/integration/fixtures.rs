//! Test fixtures for integration tests.
//!
//! Provides:
//! - `FakeSource`: a scriptable puzzle site
//! - `GatedPipeline`: a pipeline whose runs advance only when the test says so
//! - helpers to build a service and to wait for background work

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use aoc_race::orchestration::{RaceService, ServiceSettings, StartRequest};
use aoc_race::pipeline::{PipelineJob, SolvingPipeline, StageReporter, Strategy};
use aoc_race::race::{AgentResult, Part, RaceSnapshot, StageEvent};
use aoc_race::source::{
    compare_with_known, final_day, CompletionStatus, PuzzleSource, PuzzleText, SourceConnector,
    SubmissionResponse, Verdict,
};
use aoc_race::{Error, Result};

pub const YEAR: u16 = 2023;
pub const SESSION: &str = "test-session";

#[derive(Default)]
struct SiteState {
    completion: CompletionStatus,
    submissions: Vec<(Part, String)>,
}

/// A puzzle site for one day with fixed correct answers.
///
/// A correct part-1 submission unlocks part 2 the way the real site does.
pub struct FakeSource {
    day: u8,
    answers: [String; 2],
    locked: bool,
    /// Part-2 page fetches still to fail with a gateway error.
    part2_outages: AtomicU32,
    part2_fetches: AtomicU32,
    state: Mutex<SiteState>,
}

impl FakeSource {
    pub fn new(day: u8) -> Self {
        Self {
            day,
            answers: ["142".to_string(), "281".to_string()],
            locked: false,
            part2_outages: AtomicU32::new(0),
            part2_fetches: AtomicU32::new(0),
            state: Mutex::new(SiteState {
                completion: CompletionStatus {
                    available_parts: 1,
                    single_part: day == final_day(YEAR),
                    ..Default::default()
                },
                submissions: Vec::new(),
            }),
        }
    }

    /// A day that has not been released yet.
    pub fn locked(day: u8) -> Self {
        Self {
            locked: true,
            ..Self::new(day)
        }
    }

    /// The account solved part 1 (and part 2 with `both`) before the race.
    pub fn solved_on_account(self, both: bool) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            let c = &mut state.completion;
            c.part1_complete = true;
            c.part1_answer = Some(self.answers[0].clone());
            c.available_parts = 2;
            if both {
                c.part2_complete = true;
                c.part2_answer = Some(self.answers[1].clone());
            }
        }
        self
    }

    /// Fail the next `count` part-2 page fetches.
    pub fn failing_part2_fetches(self, count: u32) -> Self {
        self.part2_outages.store(count, Ordering::SeqCst);
        self
    }

    /// Part-2 page fetches attempted so far, failed ones included.
    pub fn part2_fetches(&self) -> u32 {
        self.part2_fetches.load(Ordering::SeqCst)
    }

    pub fn answer(&self, part: Part) -> &str {
        &self.answers[usize::from(part.number() - 1)]
    }

    /// Make part 2 visible, as if part 1 had been solved elsewhere.
    pub fn unlock_part2(&self) {
        let mut state = self.state.lock().unwrap();
        if !state.completion.single_part {
            state.completion.available_parts = 2;
        }
    }

    pub fn submissions(&self) -> Vec<(Part, String)> {
        self.state.lock().unwrap().submissions.clone()
    }
}

#[async_trait]
impl PuzzleSource for FakeSource {
    async fn fetch_puzzle(&self, year: u16, day: u8, part: Part) -> Result<PuzzleText> {
        let available = self.state.lock().unwrap().completion.available_parts;
        if self.locked || day != self.day || part.number() > available {
            return Err(Error::PartLocked { year, day, part });
        }
        if part == Part::Two {
            self.part2_fetches.fetch_add(1, Ordering::SeqCst);
            let outage = self
                .part2_outages
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if outage.is_ok() {
                return Err(Error::PuzzleFetchFailed("HTTP 502".to_string()));
            }
        }
        Ok(PuzzleText {
            title: format!("Day {day}: Trebuchet?!"),
            markdown: format!("## Part {part}\n\nCalibrate the trebuchet."),
        })
    }

    async fn fetch_input(&self, _year: u16, _day: u8) -> Result<String> {
        Ok("1abc2\npqr3stu8vwx\n".to_string())
    }

    async fn submit_answer(
        &self,
        _year: u16,
        _day: u8,
        part: Part,
        answer: &str,
    ) -> Result<SubmissionResponse> {
        let mut state = self.state.lock().unwrap();
        state.submissions.push((part, answer.to_string()));
        let message = match compare_with_known(answer, self.answer(part)) {
            Verdict::Correct => {
                let c = &mut state.completion;
                match part {
                    Part::One => {
                        c.part1_complete = true;
                        c.part1_answer = Some(answer.to_string());
                        if !c.single_part {
                            c.available_parts = 2;
                        }
                    }
                    Part::Two => {
                        c.part2_complete = true;
                        c.part2_answer = Some(answer.to_string());
                    }
                }
                "That's the right answer! You are one gold star closer.".to_string()
            }
            verdict => format!(
                "That's not the right answer; your answer is {}.",
                verdict.hint().unwrap_or("wrong")
            ),
        };
        Ok(SubmissionResponse {
            status_code: 200,
            message,
        })
    }

    async fn fetch_completion_status(&self, _year: u16, _day: u8) -> Result<CompletionStatus> {
        Ok(self.state.lock().unwrap().completion.clone())
    }

    fn input_url(&self, year: u16, day: u8) -> String {
        format!("https://puzzles.test/{year}/day/{day}/input")
    }
}

/// Hands out one shared `FakeSource` and records the session tokens used.
pub struct FakeConnector {
    source: Arc<FakeSource>,
    sessions: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(source: Arc<FakeSource>) -> Self {
        Self {
            source,
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn sessions(&self) -> Vec<String> {
        self.sessions.lock().unwrap().clone()
    }
}

impl SourceConnector for FakeConnector {
    fn connect(&self, session: &str) -> Result<Arc<dyn PuzzleSource>> {
        self.sessions.lock().unwrap().push(session.to_string());
        Ok(self.source.clone())
    }
}

/// What a gated run does next.
pub enum Gate {
    Stage(StageEvent),
    Finish(AgentResult),
    Fail(Error),
}

struct Lane {
    tx: mpsc::UnboundedSender<Gate>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<Gate>>,
}

impl Lane {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

/// A pipeline driven step by step from the test.
///
/// Each part has its own lane of gate actions. Actions sent before the run
/// launches are queued.
pub struct GatedPipeline {
    lanes: HashMap<Part, Lane>,
    jobs: Mutex<Vec<PipelineJob>>,
}

impl GatedPipeline {
    pub fn new() -> Self {
        Self {
            lanes: HashMap::from([(Part::One, Lane::new()), (Part::Two, Lane::new())]),
            jobs: Mutex::new(Vec::new()),
        }
    }

    pub fn send(&self, part: Part, gate: Gate) {
        let _ = self.lanes[&part].tx.send(gate);
    }

    pub fn stage(&self, part: Part, event: StageEvent) {
        self.send(part, Gate::Stage(event));
    }

    pub fn solve(&self, part: Part, answer: &str) {
        self.send(
            part,
            Gate::Finish(AgentResult::solved(answer, format!("Part {part} solved correctly!"))),
        );
    }

    /// Every job launched so far, in launch order.
    pub fn jobs(&self) -> Vec<PipelineJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn launched_parts(&self) -> Vec<Part> {
        self.jobs().iter().map(|job| job.part).collect()
    }
}

#[async_trait]
impl SolvingPipeline for GatedPipeline {
    async fn run(&self, job: PipelineJob, reporter: Arc<dyn StageReporter>) -> Result<AgentResult> {
        let part = job.part;
        self.jobs.lock().unwrap().push(job);
        let mut rx = self.lanes[&part].rx.lock().await;
        loop {
            match rx.recv().await {
                Some(Gate::Stage(event)) => reporter.report(event),
                Some(Gate::Finish(result)) => return Ok(result),
                Some(Gate::Fail(err)) => return Err(err),
                None => return Err(Error::Cancelled),
            }
        }
    }
}

/// A service wired to fakes, with its workspace directory.
pub struct Harness {
    pub service: RaceService,
    pub source: Arc<FakeSource>,
    pub connector: Arc<FakeConnector>,
    pub pipeline: Arc<GatedPipeline>,
    pub workspace: TempDir,
}

impl Harness {
    pub fn new(source: FakeSource) -> Self {
        Self::with_default_session(source, None)
    }

    pub fn with_default_session(source: FakeSource, session: Option<&str>) -> Self {
        let source = Arc::new(source);
        let connector = Arc::new(FakeConnector::new(source.clone()));
        let pipeline = Arc::new(GatedPipeline::new());
        let workspace = TempDir::new().expect("Failed to create temp directory");
        let service = RaceService::new(
            connector.clone(),
            pipeline.clone(),
            ServiceSettings {
                workspace_root: workspace.path().to_path_buf(),
                strategy: Strategy::MultiAgent,
                default_session: session.map(str::to_string),
            },
        );
        Self {
            service,
            source,
            connector,
            pipeline,
            workspace,
        }
    }

    pub fn start_request(&self, day: u8) -> StartRequest {
        StartRequest {
            year: YEAR,
            day,
            session: Some(SESSION.to_string()),
            strategy: None,
        }
    }

    pub async fn start(&self, day: u8) -> RaceSnapshot {
        self.service
            .start_race(self.start_request(day))
            .await
            .expect("race should start")
    }

    pub fn status(&self) -> RaceSnapshot {
        self.service.get_status().expect("race should be active")
    }

    /// Yield until `check` holds for the current status.
    pub async fn wait_for(&self, what: &str, check: impl Fn(&RaceSnapshot) -> bool) -> RaceSnapshot {
        for _ in 0..1_000 {
            if let Ok(status) = self.service.get_status() {
                if check(&status) {
                    return status;
                }
            }
            tokio::task::yield_now().await;
        }
        panic!("timed out waiting for {what}");
    }

    /// Yield until `count` pipeline runs have launched.
    pub async fn wait_for_launches(&self, count: usize) {
        for _ in 0..1_000 {
            if self.pipeline.jobs().len() >= count {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("timed out waiting for {count} pipeline launch(es)");
    }
}

/// Let spawned tasks run to their next suspension point.
pub async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}
