//! Per-part race state: one human and one agent competitor plus the winner.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::Stage;

/// Most recent activity entries kept per part.
pub const ACTIVITY_LOG_CAPACITY: usize = 10;

/// Upper bound on the agent's latest message, in characters.
pub const MAX_MESSAGE_CHARS: usize = 500;

/// One half of a daily puzzle. Serialized as the number `1` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Part {
    One,
    Two,
}

impl Part {
    pub fn number(self) -> u8 {
        match self {
            Part::One => 1,
            Part::Two => 2,
        }
    }
}

impl TryFrom<u8> for Part {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Part::One),
            2 => Ok(Part::Two),
            other => Err(Error::InvalidPart(other)),
        }
    }
}

impl From<Part> for u8 {
    fn from(part: Part) -> u8 {
        part.number()
    }
}

impl std::fmt::Display for Part {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompetitorStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

impl CompetitorStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, CompetitorStatus::Completed | CompetitorStatus::Failed)
    }
}

impl std::fmt::Display for CompetitorStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompetitorStatus::Pending => write!(f, "pending"),
            CompetitorStatus::Running => write!(f, "running"),
            CompetitorStatus::Completed => write!(f, "completed"),
            CompetitorStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Winner {
    Human,
    Agent,
    Tie,
}

/// Progress of a single competitor on a single part.
///
/// `stage`, `latest_message` and `attempt` are only written for the agent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompetitorState {
    pub status: CompetitorStatus,
    /// Seconds since race start; set once, on completion.
    pub finish_time: Option<f64>,
    pub answer: Option<String>,
    pub stage: Option<Stage>,
    pub latest_message: Option<String>,
    pub attempt: u32,
}

impl CompetitorState {
    fn completed_at(&self) -> Option<f64> {
        match self.status {
            CompetitorStatus::Completed => self.finish_time,
            _ => None,
        }
    }
}

/// A stage transition reported by a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageEvent {
    pub stage: Stage,
    pub message: String,
    pub attempt: u32,
}

impl StageEvent {
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
            attempt: 1,
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }
}

/// Final result of a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentResult {
    pub success: bool,
    pub answer: Option<String>,
    pub message: String,
}

impl AgentResult {
    pub fn solved(answer: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            answer: Some(answer.into()),
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            answer: None,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActivityEntry {
    /// Seconds since race start when the event was published.
    pub elapsed: f64,
    pub stage: Stage,
    pub message: String,
}

/// Ring of the most recent agent activity messages.
#[derive(Debug, Clone, Default)]
pub struct ActivityLog {
    entries: VecDeque<ActivityEntry>,
}

impl ActivityLog {
    pub fn push(&mut self, entry: ActivityEntry) {
        if self.entries.len() == ACTIVITY_LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivityEntry> {
        self.entries.iter()
    }
}

fn bounded(message: &str) -> String {
    match message.char_indices().nth(MAX_MESSAGE_CHARS) {
        Some((idx, _)) => format!("{}...", &message[..idx]),
        None => message.to_string(),
    }
}

/// State of one part: both competitors, the winner, and the agent's activity.
#[derive(Debug, Clone, Default)]
pub struct PartState {
    human: CompetitorState,
    agent: CompetitorState,
    winner: Option<Winner>,
    correct_answer: Option<String>,
    activity: ActivityLog,
}

impl PartState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn human(&self) -> &CompetitorState {
        &self.human
    }

    pub fn agent(&self) -> &CompetitorState {
        &self.agent
    }

    pub fn winner(&self) -> Option<Winner> {
        self.winner
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.activity
    }

    pub fn correct_answer(&self) -> Option<&str> {
        self.correct_answer.as_deref()
    }

    /// Record a known correct answer. The first known answer wins.
    pub fn learn_answer(&mut self, answer: &str) {
        let answer = answer.trim();
        if self.correct_answer.is_none() && !answer.is_empty() {
            self.correct_answer = Some(answer.to_string());
        }
    }

    /// Mark the agent as running when its pipeline launches.
    pub fn on_agent_launched(&mut self) {
        if self.agent.status == CompetitorStatus::Pending {
            self.agent.status = CompetitorStatus::Running;
        }
    }

    /// Apply a stage transition. Returns false when the event was dropped
    /// because the agent side is already terminal.
    pub fn on_agent_stage_change(&mut self, event: StageEvent, elapsed: f64) -> bool {
        if self.agent.status.is_terminal() {
            return false;
        }
        let message = bounded(&event.message);
        self.agent.status = CompetitorStatus::Running;
        self.agent.stage = Some(event.stage);
        self.agent.attempt = event.attempt;
        self.agent.latest_message = Some(message.clone());
        self.activity.push(ActivityEntry {
            elapsed,
            stage: event.stage,
            message,
        });
        true
    }

    /// Apply the end of a pipeline run. Returns false if the agent was
    /// already terminal.
    pub fn on_agent_finished(&mut self, result: AgentResult, finish_time: f64) -> bool {
        if self.agent.status.is_terminal() {
            return false;
        }
        self.agent.latest_message = Some(bounded(&result.message));
        if result.success {
            self.agent.status = CompetitorStatus::Completed;
            self.agent.finish_time = Some(finish_time);
            if let Some(answer) = &result.answer {
                self.learn_answer(answer);
            }
        } else {
            self.agent.status = CompetitorStatus::Failed;
        }
        self.agent.answer = result.answer;
        self.evaluate_winner();
        true
    }

    /// Fail an agent that never launched, e.g. part 2 after the agent lost
    /// part 1. No effect once the agent is running or terminal.
    pub fn on_agent_forfeit(&mut self, message: &str) -> bool {
        if self.agent.status != CompetitorStatus::Pending {
            return false;
        }
        self.agent.status = CompetitorStatus::Failed;
        self.agent.latest_message = Some(bounded(message));
        self.evaluate_winner();
        true
    }

    /// Record the human's first correct answer for this part.
    pub fn on_human_solved(&mut self, part: Part, answer: &str, elapsed: f64) -> Result<()> {
        if self.human.status == CompetitorStatus::Completed {
            return Err(Error::AlreadySolved(part));
        }
        self.human.status = CompetitorStatus::Completed;
        self.human.finish_time = Some(elapsed);
        self.human.answer = Some(answer.trim().to_string());
        self.learn_answer(answer);
        self.evaluate_winner();
        Ok(())
    }

    /// Decide the winner once both competitors are terminal.
    ///
    /// Idempotent: after the winner is set it is returned unchanged.
    pub fn evaluate_winner(&mut self) -> Option<Winner> {
        if self.winner.is_some() {
            return self.winner;
        }
        if !(self.human.status.is_terminal() && self.agent.status.is_terminal()) {
            return None;
        }
        self.winner = match (self.human.completed_at(), self.agent.completed_at()) {
            (Some(h), Some(a)) if h < a => Some(Winner::Human),
            (Some(h), Some(a)) if a < h => Some(Winner::Agent),
            (Some(_), Some(_)) => Some(Winner::Tie),
            (Some(_), None) => Some(Winner::Human),
            (None, Some(_)) => Some(Winner::Agent),
            (None, None) => None,
        };
        self.winner
    }
}
