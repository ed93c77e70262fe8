//! Read-consistent copies of a race, handed out to pollers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pipeline::Strategy;

use super::part::{ActivityEntry, CompetitorStatus, Part, PartState, Winner};
use super::session::{Generation, RaceId, RaceSession, RaceStatus};
use super::stage::{compute_progress, Stage};

#[derive(Debug, Clone, Serialize)]
pub struct HumanSnapshot {
    pub status: CompetitorStatus,
    pub finish_time: Option<f64>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSnapshot {
    pub status: CompetitorStatus,
    pub stage: Option<Stage>,
    pub progress: u8,
    pub attempt: u32,
    pub finish_time: Option<f64>,
    pub answer: Option<String>,
    pub latest_message: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartSnapshot {
    pub human: HumanSnapshot,
    pub agent: AgentSnapshot,
    pub winner: Option<Winner>,
    pub activity: Vec<ActivityEntry>,
}

impl PartSnapshot {
    fn capture(part: &PartState) -> Self {
        let human = part.human();
        let agent = part.agent();
        Self {
            human: HumanSnapshot {
                status: human.status,
                finish_time: human.finish_time,
                answer: human.answer.clone(),
            },
            agent: AgentSnapshot {
                status: agent.status,
                stage: agent.stage,
                progress: compute_progress(
                    agent.stage,
                    agent.status == CompetitorStatus::Completed,
                ),
                attempt: agent.attempt,
                finish_time: agent.finish_time,
                answer: agent.answer.clone(),
                latest_message: agent.latest_message.clone(),
            },
            winner: part.winner(),
            activity: part.activity().iter().cloned().collect(),
        }
    }
}

/// Full race status as served by the status endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct RaceSnapshot {
    pub race_id: RaceId,
    pub generation: Generation,
    pub status: RaceStatus,
    pub year: u16,
    pub day: u8,
    pub strategy: Strategy,
    pub practice_mode: bool,
    pub started_at: DateTime<Utc>,
    pub elapsed_seconds: f64,
    pub puzzle_title: String,
    pub puzzle_part1: String,
    pub puzzle_part2: Option<String>,
    pub input_url: String,
    pub part1: PartSnapshot,
    pub part2: PartSnapshot,
    pub latest_stage: Option<Stage>,
    pub latest_message: Option<String>,
}

impl RaceSnapshot {
    pub(crate) fn capture(session: &RaceSession) -> Self {
        // The part-2 agent is the freshest source once it has started.
        let active = if session.part(Part::Two).agent().status == CompetitorStatus::Pending {
            session.part(Part::One)
        } else {
            session.part(Part::Two)
        };

        Self {
            race_id: session.id(),
            generation: session.generation(),
            status: session.status(),
            year: session.year(),
            day: session.day(),
            strategy: session.strategy(),
            practice_mode: session.practice_mode(),
            started_at: session.started_at(),
            elapsed_seconds: session.elapsed_seconds(),
            puzzle_title: session.puzzle_title().to_string(),
            puzzle_part1: session.part1_text().to_string(),
            puzzle_part2: session.part2_text().map(str::to_string),
            input_url: session.input_url().to_string(),
            part1: PartSnapshot::capture(session.part(Part::One)),
            part2: PartSnapshot::capture(session.part(Part::Two)),
            latest_stage: active.agent().stage,
            latest_message: active.agent().latest_message.clone(),
        }
    }

    pub fn part(&self, part: Part) -> &PartSnapshot {
        match part {
            Part::One => &self.part1,
            Part::Two => &self.part2,
        }
    }
}
