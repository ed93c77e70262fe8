//! Pipeline stages and the stage progress model.

use serde::{Deserialize, Serialize};

/// Stages of the solving pipeline, in execution order.
///
/// The derived ordering is the pipeline order; progress relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Translation,
    Planning,
    Critique,
    Revision,
    Coding,
    Testing,
    Submitting,
}

/// Percentage weight per stage, in pipeline order. Sums to 100.
pub const STAGE_WEIGHTS: [(Stage, u8); 7] = [
    (Stage::Translation, 10),
    (Stage::Planning, 15),
    (Stage::Critique, 10),
    (Stage::Revision, 10),
    (Stage::Coding, 25),
    (Stage::Testing, 20),
    (Stage::Submitting, 10),
];

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Translation,
        Stage::Planning,
        Stage::Critique,
        Stage::Revision,
        Stage::Coding,
        Stage::Testing,
        Stage::Submitting,
    ];

    pub fn weight(self) -> u8 {
        STAGE_WEIGHTS
            .iter()
            .find(|(stage, _)| *stage == self)
            .map(|(_, w)| *w)
            .unwrap_or(0)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Translation => "translation",
            Stage::Planning => "planning",
            Stage::Critique => "critique",
            Stage::Revision => "revision",
            Stage::Coding => "coding",
            Stage::Testing => "testing",
            Stage::Submitting => "submitting",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map the agent's current stage to a 0..=100 progress value.
///
/// Completed is always 100. Otherwise every earlier stage counts in full and
/// the current stage counts for half its weight.
pub fn compute_progress(current: Option<Stage>, is_completed: bool) -> u8 {
    if is_completed {
        return 100;
    }
    let Some(current) = current else {
        return 0;
    };

    let before: u8 = STAGE_WEIGHTS
        .iter()
        .take_while(|(stage, _)| *stage < current)
        .map(|(_, w)| *w)
        .sum();
    before + current.weight() / 2
}
