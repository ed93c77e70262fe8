use thiserror::Error;

use crate::race::Part;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("A race is already in progress. Reset first.")]
    AlreadyRacing,

    #[error("No race in progress")]
    NoActiveRace,

    #[error("Failed to fetch puzzle: {0}")]
    PuzzleFetchFailed(String),

    #[error("Puzzle {year} day {day} part {part} is not available yet")]
    PartLocked { year: u16, day: u8, part: Part },

    #[error("Part {0} is not unlocked yet")]
    PartNotUnlocked(Part),

    #[error("You already completed part {0}")]
    AlreadySolved(Part),

    #[error("Agent execution failed: {0}")]
    AgentExecutionFailed(String),

    #[error("Submission rejected: {message}")]
    SubmissionRejected {
        message: String,
        hint: Option<String>,
    },

    #[error("Puzzle session token required (pass aoc_session or set AOC_SESSION)")]
    MissingSession,

    #[error("Invalid part: {0}. Must be 1 or 2.")]
    InvalidPart(u8),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Claude binary not found in PATH")]
    ClaudeBinaryNotFound,

    #[error("No home directory")]
    NoHomeDir,

    #[error("Operation timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("Cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, Error>;
