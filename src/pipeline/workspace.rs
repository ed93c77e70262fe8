//! Per-part working directories for pipeline runs.
//!
//! Layout: `<root>/<year>/day_<day>/part_<part>/`. Part 2 receives copies of
//! the part 1 artifacts under a `part_1_` prefix.

use std::path::{Path, PathBuf};

use tokio::fs;

use crate::error::Result;
use crate::race::Part;
use crate::rlog_debug;

/// Part 1 files carried into the part 2 workspace.
const CARRIED_ARTIFACTS: [&str; 4] = ["answer.txt", "problem.md", "solution.py", "puzzle.md"];

#[derive(Debug, Clone)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    pub fn part_dir(root: &Path, year: u16, day: u8, part: Part) -> PathBuf {
        root.join(year.to_string())
            .join(format!("day_{day}"))
            .join(format!("part_{}", part.number()))
    }

    /// Create the part directory and write the puzzle and input files.
    pub async fn prepare(
        root: &Path,
        year: u16,
        day: u8,
        part: Part,
        puzzle_markdown: &str,
        input: &str,
    ) -> Result<Self> {
        let dir = Self::part_dir(root, year, day, part);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join("puzzle.md"), puzzle_markdown).await?;
        fs::write(dir.join("input.md"), input).await?;

        if part == Part::Two {
            let part1 = Self::part_dir(root, year, day, Part::One);
            for name in CARRIED_ARTIFACTS {
                let from = part1.join(name);
                if fs::try_exists(&from).await? {
                    fs::copy(&from, dir.join(format!("part_1_{name}"))).await?;
                }
            }
        }

        rlog_debug!("Workspace prepared at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The trimmed contents of `answer.txt`, if it exists and is not blank.
    pub async fn read_answer(&self) -> Result<Option<String>> {
        let path = self.dir.join("answer.txt");
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        let answer = fs::read_to_string(path).await?.trim().to_string();
        Ok((!answer.is_empty()).then_some(answer))
    }

    pub async fn write_submission_result(&self, status_code: u16, message: &str) -> Result<()> {
        let content = format!(
            "# Submission Result\n\n**Status Code**: {status_code}\n\n**Response Message**:\n{message}\n"
        );
        fs::write(self.dir.join("submission_result.md"), content).await?;
        Ok(())
    }

    /// Feedback for the next solve attempt. Never contains the known answer.
    pub async fn write_submission_issues(
        &self,
        answer: &str,
        message: &str,
        hint: Option<&str>,
    ) -> Result<()> {
        let hint_text = hint
            .map(|h| format!("\n\n**Hint**: Your answer is **{h}**."))
            .unwrap_or_default();
        let content = format!(
            "# Submission Result\n\n\
             **Status**: Incorrect\n\n\
             **Your Answer**: {answer}\n\n\
             **Message**: {message}{hint_text}\n\n\
             ## Suggestions\n\n\
             - Re-read the puzzle and check the solution logic\n\
             - Look for off-by-one errors and unhandled edge cases\n\
             - Make sure the solution works on the full input, not just the examples\n"
        );
        fs::write(self.dir.join("submission_issues.md"), content).await?;
        Ok(())
    }
}
