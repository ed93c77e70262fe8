//! The race aggregate: one puzzle day, two parts, two competitors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::pipeline::Strategy;

use super::part::{AgentResult, Part, PartState, StageEvent};
use super::snapshot::RaceSnapshot;

/// Unique identifier for a race, used in logs and snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RaceId(pub Uuid);

impl RaceId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// First 8 characters of the UUID.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for RaceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RaceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Session generation token.
///
/// Strictly increasing across sessions of one service. Runners carry the
/// generation they were launched for; publishes with any other generation
/// are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceStatus {
    Racing,
    Finished,
}

/// Everything needed to open a session, gathered before the lock is taken.
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub year: u16,
    pub day: u8,
    pub strategy: Strategy,
    pub puzzle_title: String,
    pub part1_text: String,
    pub input_url: String,
    pub practice_mode: bool,
    pub part1_answer: Option<String>,
    pub part2_answer: Option<String>,
    /// Part-2 text already known at start (the account solved part 1 before).
    pub part2_text: Option<String>,
    pub single_part: bool,
}

/// Round to whole milliseconds so equal clocks compare equal.
fn millis_f64(elapsed: std::time::Duration) -> f64 {
    elapsed.as_millis() as f64 / 1000.0
}

#[derive(Debug)]
pub struct RaceSession {
    id: RaceId,
    generation: Generation,
    year: u16,
    day: u8,
    strategy: Strategy,
    started_at: DateTime<Utc>,
    clock: Instant,
    puzzle_title: String,
    part1_text: String,
    /// Visible to the human; only set after they solve part 1.
    part2_text: Option<String>,
    /// Fetched from the source but not yet revealed.
    part2_fetched: Option<String>,
    part2_launched: bool,
    input_url: String,
    status: RaceStatus,
    practice_mode: bool,
    single_part: bool,
    part1: PartState,
    part2: PartState,
}

impl RaceSession {
    pub fn new(generation: Generation, params: SessionParams) -> Self {
        let mut part1 = PartState::new();
        let mut part2 = PartState::new();
        if let Some(answer) = &params.part1_answer {
            part1.learn_answer(answer);
        }
        if let Some(answer) = &params.part2_answer {
            part2.learn_answer(answer);
        }

        Self {
            id: RaceId::new(),
            generation,
            year: params.year,
            day: params.day,
            strategy: params.strategy,
            started_at: Utc::now(),
            clock: Instant::now(),
            puzzle_title: params.puzzle_title,
            part1_text: params.part1_text,
            part2_text: None,
            part2_fetched: params.part2_text,
            part2_launched: false,
            input_url: params.input_url,
            status: RaceStatus::Racing,
            practice_mode: params.practice_mode,
            single_part: params.single_part,
            part1,
            part2,
        }
    }

    pub fn id(&self) -> RaceId {
        self.id
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn is_racing(&self) -> bool {
        self.status == RaceStatus::Racing
    }

    pub fn practice_mode(&self) -> bool {
        self.practice_mode
    }

    pub fn puzzle_title(&self) -> &str {
        &self.puzzle_title
    }

    pub fn part1_text(&self) -> &str {
        &self.part1_text
    }

    pub fn part2_text(&self) -> Option<&str> {
        self.part2_text.as_deref()
    }

    pub fn input_url(&self) -> &str {
        &self.input_url
    }

    /// Seconds since the race started, at millisecond resolution.
    pub fn elapsed_seconds(&self) -> f64 {
        millis_f64(self.clock.elapsed())
    }

    pub fn part(&self, part: Part) -> &PartState {
        match part {
            Part::One => &self.part1,
            Part::Two => &self.part2,
        }
    }

    fn part_mut(&mut self, part: Part) -> &mut PartState {
        match part {
            Part::One => &mut self.part1,
            Part::Two => &mut self.part2,
        }
    }

    /// Part 1 is always open; part 2 once its text is visible to the human.
    pub fn is_unlocked(&self, part: Part) -> bool {
        match part {
            Part::One => true,
            Part::Two => self.part2_text.is_some(),
        }
    }

    /// Whether an unlock query against the source could still change anything.
    pub fn wants_part2(&self) -> bool {
        !self.single_part && (self.part2_fetched.is_none() || !self.part2_launched)
    }

    pub fn part2_fetched(&self) -> bool {
        self.part2_fetched.is_some()
    }

    /// Part 1 is completed by someone but part-2 text never arrived.
    pub fn part2_stalled(&self) -> bool {
        use super::CompetitorStatus::Completed;
        !self.single_part
            && self.part2_fetched.is_none()
            && (self.part1.human().status == Completed || self.part1.agent().status == Completed)
    }

    pub fn on_agent_launched(&mut self, part: Part) {
        self.part_mut(part).on_agent_launched();
    }

    pub fn on_agent_stage_change(&mut self, part: Part, event: StageEvent) -> bool {
        let elapsed = self.elapsed_seconds();
        self.part_mut(part).on_agent_stage_change(event, elapsed)
    }

    pub fn on_agent_finished(&mut self, part: Part, result: AgentResult) -> bool {
        let elapsed = self.elapsed_seconds();
        let success = result.success;
        let applied = self.part_mut(part).on_agent_finished(result, elapsed);
        if applied && part == Part::One && !success {
            self.part2
                .on_agent_forfeit("Agent did not solve part 1, so it cannot attempt part 2");
        }
        self.refresh_status();
        applied
    }

    /// Record a verified correct human answer at `elapsed` seconds.
    pub fn on_human_solved(&mut self, part: Part, answer: &str, elapsed: f64) -> Result<()> {
        if !self.is_unlocked(part) {
            return Err(Error::PartNotUnlocked(part));
        }
        self.part_mut(part).on_human_solved(part, answer, elapsed)?;
        if part == Part::One {
            self.reveal_part2();
        }
        self.refresh_status();
        Ok(())
    }

    /// Store part-2 text reported available by the source.
    pub fn record_part2_text(&mut self, text: String) {
        if self.part2_fetched.is_none() {
            self.part2_fetched = Some(text);
        }
        self.reveal_part2();
    }

    /// The source reports that this day has no second part.
    pub fn mark_single_part(&mut self) {
        self.single_part = true;
        self.refresh_status();
    }

    /// Claim the single part-2 pipeline launch.
    ///
    /// Succeeds once, and only after the agent completed part 1 and part-2
    /// text has been fetched.
    pub fn claim_part2_launch(&mut self) -> bool {
        let ready = self.part1.agent().status == super::CompetitorStatus::Completed
            && self.part2_fetched.is_some()
            && !self.single_part;
        if !ready || self.part2_launched {
            return false;
        }
        self.part2_launched = true;
        self.part2.on_agent_launched();
        true
    }

    fn reveal_part2(&mut self) {
        if self.part2_text.is_none()
            && self.part1.human().status == super::CompetitorStatus::Completed
        {
            self.part2_text = self.part2_fetched.clone();
        }
    }

    fn refresh_status(&mut self) {
        if self.status == RaceStatus::Finished {
            return;
        }
        let finished = self.part2.winner().is_some()
            || (self.single_part && self.part2_text.is_none() && self.part1.winner().is_some());
        if finished {
            self.status = RaceStatus::Finished;
        }
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot::capture(self)
    }
}
