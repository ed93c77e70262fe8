//! Puzzle source: puzzle text, inputs, answer submission and completion
//! status for a (year, day, part).

mod aoc;
pub mod html;
pub mod verdict;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::race::Part;

pub use aoc::{AocClient, AocConnector};
pub use verdict::{classify, compare_with_known, Verdict};

/// First event year of the puzzle site.
pub const FIRST_YEAR: u16 = 2015;

/// Last puzzle day of an event. Events before 2025 ran 25 days, later ones 12.
pub fn final_day(year: u16) -> u8 {
    if year >= 2025 {
        12
    } else {
        25
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuzzleText {
    pub title: String,
    pub markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResponse {
    pub status_code: u16,
    /// Main text of the response page.
    pub message: String,
}

/// Account-specific state of one puzzle day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionStatus {
    pub part1_complete: bool,
    pub part2_complete: bool,
    pub part1_answer: Option<String>,
    pub part2_answer: Option<String>,
    /// Puzzle parts currently visible to the account (0 to 2).
    pub available_parts: u8,
    /// The day has no second part.
    pub single_part: bool,
}

impl CompletionStatus {
    pub fn answer(&self, part: Part) -> Option<&str> {
        match part {
            Part::One => self.part1_answer.as_deref(),
            Part::Two => self.part2_answer.as_deref(),
        }
    }

    pub fn part2_available(&self) -> bool {
        !self.single_part && self.available_parts >= 2
    }
}

#[async_trait]
pub trait PuzzleSource: Send + Sync {
    /// Puzzle text for one part. `PartLocked` when the part is not visible.
    async fn fetch_puzzle(&self, year: u16, day: u8, part: Part) -> Result<PuzzleText>;

    async fn fetch_input(&self, year: u16, day: u8) -> Result<String>;

    async fn submit_answer(
        &self,
        year: u16,
        day: u8,
        part: Part,
        answer: &str,
    ) -> Result<SubmissionResponse>;

    async fn fetch_completion_status(&self, year: u16, day: u8) -> Result<CompletionStatus>;

    fn input_url(&self, year: u16, day: u8) -> String;
}

/// Opens a [`PuzzleSource`] bound to one account session.
pub trait SourceConnector: Send + Sync {
    fn connect(&self, session: &str) -> Result<Arc<dyn PuzzleSource>>;
}
